//! Phase result payloads.
//!
//! These serialize to the JSON appended to the scan log and returned by the
//! trigger server. Per-host failures appear inline as `error` / `db_error`.

use serde::Serialize;

use crate::models::{OpenPort, OsMatch, VersionInfo, VulnScan};
use crate::storage::CveDetails;

/// Results of a per-host phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport<T> {
    pub results: Vec<T>,
    /// Set when cancellation stopped the phase before every host ran.
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverReport {
    pub subnet: String,
    pub alive_hosts: Vec<String>,
    pub iot_hosts: Vec<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortsHostResult {
    pub ip: String,
    pub open_ports: Vec<OpenPort>,
    pub suspicious: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionCveSummary {
    pub max_cvss: f64,
    pub detected_services_count: usize,
    pub vuln_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionCveHostResult {
    pub ip: String,
    pub timestamp: String,
    pub version_info: Option<VersionInfo>,
    pub vuln_scan: VulnScan,
    pub cve_results: CveDetails,
    pub max_cvss: f64,
    pub summary: VersionCveSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OsHostResult {
    pub ip: String,
    pub os_fingerprint: Vec<OsMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_error: Option<String>,
}

/// Everything one full pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub discover: DiscoverReport,
    pub ports: PhaseReport<PortsHostResult>,
    pub version_cve: PhaseReport<VersionCveHostResult>,
    pub os: PhaseReport<OsHostResult>,
    pub elapsed_seconds: f64,
}

impl PipelineReport {
    /// Host results that carry a probe or persistence error.
    pub fn failed_hosts(&self) -> usize {
        let ports = self
            .ports
            .results
            .iter()
            .filter(|r| r.error.is_some() || r.db_error.is_some())
            .count();
        let version = self
            .version_cve
            .results
            .iter()
            .filter(|r| r.vuln_scan.error.is_some() || r.db_error.is_some())
            .count();
        let os = self
            .os
            .results
            .iter()
            .filter(|r| r.error.is_some() || r.db_error.is_some())
            .count();
        ports + version + os
    }

    pub fn cancelled(&self) -> bool {
        self.discover.cancelled || self.ports.cancelled || self.version_cve.cancelled || self.os.cancelled
    }
}
