//! nmap-backed probes.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;

use crate::config::{BANNER_SCAN_TIMEOUT, NMAP_BINARY, NMAP_TIMEOUT_SECS};
use crate::error_handling::ProbeError;
use crate::models::{DiscoveredHost, OpenPort, OsMatch, VulnScan};

use super::xml::{parse_report, NmapRun};
use super::ScanProbes;

/// Runs the nmap binary and parses its XML report.
///
/// Every invocation is bounded by `timeout`; the child is killed when the
/// deadline passes or the future is dropped.
#[derive(Debug, Clone)]
pub struct NmapProbes {
    binary: PathBuf,
    timeout: Duration,
}

impl Default for NmapProbes {
    fn default() -> Self {
        Self::new(NMAP_BINARY, Duration::from_secs(NMAP_TIMEOUT_SECS))
    }
}

impl NmapProbes {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String, ProbeError> {
        debug!("Running {} {}", self.binary.display(), args.join(" "));
        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ProbeError::Timeout {
                secs: timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(ProbeError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_xml(&self, args: &[&str]) -> Result<NmapRun, ProbeError> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["-oX", "-"]);
        let stdout = self.run(&full, self.timeout).await?;
        parse_report(&stdout)
    }
}

#[async_trait]
impl ScanProbes for NmapProbes {
    async fn discover(&self, subnet: &str) -> Result<Vec<DiscoveredHost>, ProbeError> {
        let report = self.run_xml(&["-sn", subnet]).await?;
        Ok(report.discovered_hosts())
    }

    async fn scan_ports(&self, ip: &str, port_range: &str) -> Result<Vec<OpenPort>, ProbeError> {
        let report = self.run_xml(&["-sV", "-p", port_range, ip]).await?;
        Ok(report.open_ports(ip))
    }

    async fn os_fingerprint(&self, ip: &str) -> Result<Vec<OsMatch>, ProbeError> {
        let report = self.run_xml(&["-O", ip]).await?;
        Ok(report.os_matches(ip))
    }

    async fn run_vuln_scripts(&self, ip: &str) -> VulnScan {
        match self.run_xml(&["--script", "vuln", ip]).await {
            Ok(report) => VulnScan {
                ip: ip.to_string(),
                vulnerabilities: report.script_findings(ip),
                error: None,
            },
            Err(e) => {
                warn!("Vulnerability scripts failed for {}: {}", ip, e);
                VulnScan::failed(ip, e.to_string())
            }
        }
    }

    async fn service_banner(&self, ip: &str, port: u16) -> Result<String, ProbeError> {
        let port = port.to_string();
        self.run(&["-sV", "-p", &port, ip], BANNER_SCAN_TIMEOUT.min(self.timeout))
            .await
    }
}
