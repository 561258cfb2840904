//! Scan phases.
//!
//! Each phase walks the IoT hosts of a [`ScanSession`], records one
//! `*_single` scan result per host plus one aggregate result, and merges the
//! sub-document it owns into the device record. Nothing here returns an error:
//! probe and persistence failures end up inline in the host results.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::config::{CVE_MAX_RESULTS, DEFAULT_MAX_CONCURRENCY, DEFAULT_PORT_RANGE};
use crate::cve::{enrich_lookups, fetch_cves, CveLookup, VulnDatabase};
use crate::models::{NetworkInfo, OpenPort, ScanType, VersionInfo, VulnScan};
use crate::probes::{is_iot, ScanProbes};
use crate::risk::exposes_high_risk_port;
use crate::storage::{
    append_scan_result, save_cve_records, upsert_device, CveDetails, DevicePatch, PortsPatch,
    VersionPatch,
};
use crate::version::VersionDetector;

use super::report::{
    DiscoverReport, OsHostResult, PhaseReport, PortsHostResult, VersionCveHostResult,
    VersionCveSummary,
};
use super::session::{ScanSession, WorkingSet};

/// Tunables shared by all phases.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub port_range: String,
    pub cve_max_results: usize,
    /// Hosts in flight per phase; values below 1 are treated as 1.
    pub max_concurrency: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            port_range: DEFAULT_PORT_RANGE.to_string(),
            cve_max_results: CVE_MAX_RESULTS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Runs the scan phases against shared probes, CVE source and stores.
pub struct Orchestrator {
    probes: Arc<dyn ScanProbes>,
    vuln_db: Arc<dyn VulnDatabase>,
    detector: VersionDetector,
    pool: Arc<SqlitePool>,
    settings: ScanSettings,
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Distinct non-empty CVE lookup keywords for a host, sorted.
///
/// Each finding contributes its script id, or its protocol if the id is
/// empty; the detected product and vendor are added as they are.
pub fn cve_keywords(vuln_scan: &VulnScan, version_info: Option<&VersionInfo>) -> BTreeSet<String> {
    let from_findings = vuln_scan.vulnerabilities.iter().map(|f| {
        if f.script.trim().is_empty() {
            f.protocol.as_str()
        } else {
            f.script.as_str()
        }
    });
    let from_version = version_info
        .into_iter()
        .flat_map(|v| std::iter::once(v.product.as_str()).chain(v.vendor.as_deref()));

    from_findings
        .chain(from_version)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

impl Orchestrator {
    pub fn new(
        probes: Arc<dyn ScanProbes>,
        vuln_db: Arc<dyn VulnDatabase>,
        detector: VersionDetector,
        pool: Arc<SqlitePool>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            probes,
            vuln_db,
            detector,
            pool,
            settings,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Runs `f` over `items` in order with bounded fan-out.
    ///
    /// Cancellation is checked before each item starts. Returns the finished
    /// results and whether cancellation cut the list short.
    async fn for_each_host<I, T, F, Fut>(&self, items: Vec<I>, cancel: &CancellationToken, f: F) -> (Vec<T>, bool)
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = T>,
    {
        let total = items.len();
        let results: Vec<T> = stream::iter(items)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(f)
            .buffered(self.settings.max_concurrency.max(1))
            .collect()
            .await;
        let cancelled = results.len() < total;
        (results, cancelled)
    }

    /// Appends to the scan log; a failure is logged and otherwise ignored.
    async fn record<T: Serialize>(&self, scan_type: ScanType, payload: &T) {
        let value = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                warn!("Could not encode {} scan result: {}", scan_type, e);
                return;
            }
        };
        if let Err(e) = append_scan_result(&self.pool, scan_type, &value).await {
            warn!("Failed to append {} scan result: {}", scan_type, e);
        }
    }

    async fn upsert(&self, patch: DevicePatch) -> Option<String> {
        let ip = patch.ip().to_string();
        match upsert_device(&self.pool, patch).await {
            Ok(_) => None,
            Err(e) => {
                warn!("Device upsert for {} failed: {}", ip, e);
                Some(e.to_string())
            }
        }
    }

    /// Ping sweep of `subnet`, then IoT classification of every alive host.
    ///
    /// Replaces the session's working set, even when the sweep fails.
    pub async fn discover(&self, session: &ScanSession, subnet: &str, cancel: &CancellationToken) -> DiscoverReport {
        if cancel.is_cancelled() {
            return DiscoverReport {
                subnet: subnet.to_string(),
                alive_hosts: Vec::new(),
                iot_hosts: Vec::new(),
                timestamp: now_rfc3339(),
                error: None,
                cancelled: true,
            };
        }

        info!("Discovering hosts on {}", subnet);
        let (alive, error) = match self.probes.discover(subnet).await {
            Ok(hosts) => (hosts, None),
            Err(e) => {
                warn!("Discovery of {} failed: {}", subnet, e);
                (Vec::new(), Some(e.to_string()))
            }
        };

        let probes = self.probes.as_ref();
        let (classified, cancelled) = self
            .for_each_host(alive.clone(), cancel, |host| async move {
                let iot = is_iot(&host, probes).await;
                debug!("{} IoT: {}", host.ip, iot);
                iot.then_some(host)
            })
            .await;
        let iot: Vec<_> = classified.into_iter().flatten().collect();

        let report = DiscoverReport {
            subnet: subnet.to_string(),
            alive_hosts: alive.iter().map(|h| h.ip.clone()).collect(),
            iot_hosts: iot.iter().map(|h| h.ip.clone()).collect(),
            timestamp: now_rfc3339(),
            error,
            cancelled,
        };

        session
            .replace(WorkingSet {
                subnet: Some(subnet.to_string()),
                alive_hosts: alive,
                iot_hosts: iot,
            })
            .await;

        info!(
            "Discovery of {}: {} alive, {} IoT",
            subnet,
            report.alive_hosts.len(),
            report.iot_hosts.len()
        );
        self.record(ScanType::Discover, &json!({"subnet": subnet, "result": &report}))
            .await;
        report
    }

    /// Service scan of every IoT host; replaces each device's ports.
    pub async fn ports(&self, session: &ScanSession, cancel: &CancellationToken) -> PhaseReport<PortsHostResult> {
        let targets = session.iot_targets().await;
        info!("Port scan of {} IoT hosts", targets.len());
        let (results, cancelled) = self
            .for_each_host(targets, cancel, |host| self.ports_for_host(host))
            .await;

        let failed = results.iter().filter(|r| r.error.is_some()).count();
        info!("Port scan finished: {} hosts, {} failed", results.len(), failed);
        self.record(ScanType::Ports, &json!({"result": &results})).await;
        PhaseReport { results, cancelled }
    }

    async fn ports_for_host(&self, host: NetworkInfo) -> PortsHostResult {
        debug!("Scanning ports {} on {}", self.settings.port_range, host.ip);
        let (open_ports, error) = match self.probes.scan_ports(&host.ip, &self.settings.port_range).await {
            Ok(ports) => (ports, None),
            Err(e) => {
                warn!("Port scan of {} failed: {}", host.ip, e);
                (Vec::new(), Some(e.to_string()))
            }
        };
        let suspicious = exposes_high_risk_port(&open_ports);
        let mut result = PortsHostResult {
            ip: host.ip.clone(),
            open_ports,
            suspicious,
            error,
            db_error: None,
        };
        self.record(ScanType::PortsSingle, &result).await;

        // A failed scan says nothing about the ports; keep what is stored.
        if result.error.is_none() {
            let patch = DevicePatch {
                ports: Some(PortsPatch::Replace(result.open_ports.clone())),
                suspicious,
                ..DevicePatch::new(host)
            };
            result.db_error = self.upsert(patch).await;
        }
        result
    }

    /// Version detection, vulnerability scripts and CVE correlation.
    pub async fn version_cve(
        &self,
        session: &ScanSession,
        cancel: &CancellationToken,
    ) -> PhaseReport<VersionCveHostResult> {
        let targets = session.iot_targets().await;
        info!("Version and CVE scan of {} IoT hosts", targets.len());
        let (results, cancelled) = self
            .for_each_host(targets, cancel, |host| self.version_cve_for_host(host))
            .await;

        let vulnerable = results.iter().filter(|r| r.max_cvss >= 7.0).count();
        info!(
            "Version and CVE scan finished: {} hosts, {} with high or critical CVEs",
            results.len(),
            vulnerable
        );
        self.record(ScanType::VersionCve, &json!({"result": &results})).await;
        PhaseReport { results, cancelled }
    }

    async fn version_cve_for_host(&self, host: NetworkInfo) -> VersionCveHostResult {
        debug!("Detecting versions on {}", host.ip);
        let version_info = self.detector.detect_any(&host.ip).await;
        let vuln_scan = self.probes.run_vuln_scripts(&host.ip).await;
        let keywords = cve_keywords(&vuln_scan, version_info.as_ref());

        let mut cve_results = CveDetails::new();
        let mut max_cvss = 0.0_f64;
        for keyword in &keywords {
            let lookups = fetch_cves(self.vuln_db.as_ref(), keyword, self.settings.cve_max_results).await;
            let (enriched, keyword_max) = enrich_lookups(lookups);
            max_cvss = max_cvss.max(keyword_max);
            cve_results.insert(keyword.clone(), enriched);
        }

        let summary = VersionCveSummary {
            max_cvss,
            detected_services_count: keywords.len(),
            vuln_count: vuln_scan.vulnerabilities.len(),
        };
        let mut result = VersionCveHostResult {
            ip: host.ip.clone(),
            timestamp: now_rfc3339(),
            version_info,
            vuln_scan,
            cve_results,
            max_cvss,
            summary,
            db_error: None,
        };
        self.record(ScanType::VersionCveSingle, &result).await;

        if !result.cve_results.is_empty() {
            if let Err(e) = save_cve_records(&self.pool, &host.ip, &result.cve_results).await {
                warn!("Failed to save CVE records for {}: {}", host.ip, e);
            }
        }

        let probed_ports = result
            .vuln_scan
            .vulnerabilities
            .iter()
            .map(|f| OpenPort {
                protocol: f.protocol.clone(),
                ..OpenPort::tcp(f.port)
            })
            .collect();
        // Every lookup failing says nothing about the device; keep the stored CVE details.
        let lookups_failed = !result.cve_results.is_empty()
            && result.cve_results.values().flatten().all(CveLookup::is_error);
        let version = if lookups_failed {
            warn!("All CVE lookups for {} failed; keeping stored CVE details", host.ip);
            None
        } else {
            Some(VersionPatch {
                firmware: result.version_info.as_ref().map(|v| v.version.clone()),
                cve_details: result.cve_results.clone(),
            })
        };
        let patch = DevicePatch {
            ports: Some(PortsPatch::Merge(probed_ports)),
            version,
            ..DevicePatch::new(host)
        };
        result.db_error = self.upsert(patch).await;
        result
    }

    /// OS fingerprinting; writes only the device's OS sub-document.
    pub async fn os(&self, session: &ScanSession, cancel: &CancellationToken) -> PhaseReport<OsHostResult> {
        let targets = session.iot_targets().await;
        info!("OS fingerprinting of {} IoT hosts", targets.len());
        let (results, cancelled) = self
            .for_each_host(targets, cancel, |host| self.os_for_host(host))
            .await;

        info!("OS fingerprinting finished: {} hosts", results.len());
        self.record(ScanType::Os, &json!({"result": &results})).await;
        PhaseReport { results, cancelled }
    }

    async fn os_for_host(&self, host: NetworkInfo) -> OsHostResult {
        debug!("Fingerprinting OS of {}", host.ip);
        let (os_fingerprint, error) = match self.probes.os_fingerprint(&host.ip).await {
            Ok(matches) => (matches, None),
            Err(e) => {
                warn!("OS fingerprint of {} failed: {}", host.ip, e);
                (Vec::new(), Some(e.to_string()))
            }
        };
        let mut result = OsHostResult {
            ip: host.ip.clone(),
            os_fingerprint,
            error,
            db_error: None,
        };
        self.record(ScanType::OsSingle, &result).await;

        if result.error.is_none() {
            let patch = DevicePatch {
                os_fingerprint: Some(result.os_fingerprint.clone()),
                ..DevicePatch::new(host)
            };
            result.db_error = self.upsert(patch).await;
        }
        result
    }
}
