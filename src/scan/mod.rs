//! Scan orchestration.
//!
//! [`Orchestrator`] runs the four phases (discover, ports, version+CVE, OS)
//! over the working set of a [`ScanSession`]; [`run_pipeline`] chains them.

mod orchestrator;
mod pipeline;
mod report;
mod session;

pub use orchestrator::{cve_keywords, Orchestrator, ScanSettings};
pub use pipeline::run_pipeline;
pub use report::{
    DiscoverReport, OsHostResult, PhaseReport, PipelineReport, PortsHostResult,
    VersionCveHostResult, VersionCveSummary,
};
pub use session::{ScanSession, WorkingSet};

use crate::config::DEFAULT_SUBNET;

/// Target for discovery: an explicit subnet, else the /24 around `ip`, else
/// the default subnet. Blank inputs count as absent.
pub fn subnet_for(ip: Option<&str>, subnet: Option<&str>) -> String {
    let present = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    if let Some(subnet) = present(subnet) {
        return subnet;
    }
    match present(ip) {
        Some(ip) if ip.contains('/') => ip,
        Some(ip) => format!("{ip}/24"),
        None => DEFAULT_SUBNET.to_string(),
    }
}
