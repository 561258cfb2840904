//! Full scan: every phase, in order, on a fresh session.

use std::time::Instant;

use log::info;
use tokio_util::sync::CancellationToken;

use super::orchestrator::Orchestrator;
use super::report::PipelineReport;
use super::session::ScanSession;

/// Runs Discover, Ports, Version+CVE and OS against `subnet`.
///
/// Once `cancel` fires, the running phase stops starting hosts and the
/// remaining phases return empty, cancelled reports.
pub async fn run_pipeline(orchestrator: &Orchestrator, subnet: &str, cancel: &CancellationToken) -> PipelineReport {
    let start = Instant::now();
    let session = ScanSession::new();

    let discover = orchestrator.discover(&session, subnet, cancel).await;
    let ports = orchestrator.ports(&session, cancel).await;
    let version_cve = orchestrator.version_cve(&session, cancel).await;
    let os = orchestrator.os(&session, cancel).await;

    let report = PipelineReport {
        discover,
        ports,
        version_cve,
        os,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };
    info!(
        "Scan of {} finished in {:.1}s: {} IoT hosts, {} host failures{}",
        subnet,
        report.elapsed_seconds,
        report.discover.iot_hosts.len(),
        report.failed_hosts(),
        if report.cancelled() { " (cancelled)" } else { "" }
    );
    report
}
