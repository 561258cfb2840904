//! Network probes.
//!
//! Everything the orchestrator learns about a host comes through the
//! [`ScanProbes`] trait. [`NmapProbes`] runs the nmap binary; tests substitute
//! in-memory fakes.

mod nmap;
mod xml;

use async_trait::async_trait;
use log::debug;

use crate::config::{IOT_PORTS, IOT_VENDORS};
use crate::error_handling::ProbeError;
use crate::models::{DiscoveredHost, OpenPort, OsMatch, VulnScan};

pub use nmap::NmapProbes;

/// Host-level scan primitives.
#[async_trait]
pub trait ScanProbes: Send + Sync {
    /// Ping sweep of `subnet` (CIDR or single address).
    async fn discover(&self, subnet: &str) -> Result<Vec<DiscoveredHost>, ProbeError>;

    /// Service-detecting scan of `port_range` (`"1-1000"`, `"23,80"`).
    async fn scan_ports(&self, ip: &str, port_range: &str) -> Result<Vec<OpenPort>, ProbeError>;

    /// OS fingerprint candidates, best first.
    async fn os_fingerprint(&self, ip: &str) -> Result<Vec<OsMatch>, ProbeError>;

    /// Runs the vulnerability script category; failures land in `VulnScan::error`.
    async fn run_vuln_scripts(&self, ip: &str) -> VulnScan;

    /// Human-readable service detection output for a single port.
    async fn service_banner(&self, ip: &str, port: u16) -> Result<String, ProbeError>;
}

/// Comma-separated IoT port list for a targeted scan.
pub fn iot_port_list() -> String {
    IOT_PORTS
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns true if the MAC vendor is a known IoT manufacturer.
pub fn is_iot_vendor(vendor: Option<&str>) -> bool {
    vendor.is_some_and(|v| IOT_VENDORS.iter().any(|known| v.contains(known)))
}

/// IoT classification: vendor match first, else any IoT-typical port open.
///
/// A failed port scan classifies the host as not IoT.
pub async fn is_iot(host: &DiscoveredHost, probes: &dyn ScanProbes) -> bool {
    if is_iot_vendor(host.vendor.as_deref()) {
        return true;
    }
    match probes.scan_ports(&host.ip, &iot_port_list()).await {
        Ok(ports) => !ports.is_empty(),
        Err(e) => {
            debug!("IoT port check for {} failed: {}", host.ip, e);
            false
        }
    }
}
