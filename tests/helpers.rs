// Shared test helpers: in-memory stores and scripted network fakes.
//
// Every test file that needs them declares `mod helpers;`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use iot_scan::cve::VulnDatabase;
use iot_scan::error_handling::{CveError, ProbeError};
use iot_scan::models::{DiscoveredHost, OpenPort, OsMatch, VulnFinding, VulnScan};
use iot_scan::probes::ScanProbes;
use iot_scan::run_migrations;
use iot_scan::scan::{Orchestrator, ScanSettings};
use iot_scan::version::VersionDetector;

/// Creates a migrated in-memory database.
///
/// One connection only: each `sqlite::memory:` connection is a separate database.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Scripted network. Anything not configured is absent or empty.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeNetwork {
    pub subnets: HashMap<String, Vec<DiscoveredHost>>,
    pub ports: HashMap<String, Vec<OpenPort>>,
    pub failing_ports: HashSet<String>,
    pub banners: HashMap<String, String>,
    pub os: HashMap<String, Vec<OsMatch>>,
    pub findings: HashMap<String, Vec<VulnFinding>>,
}

#[allow(dead_code)]
impl FakeNetwork {
    pub fn with_subnet(mut self, subnet: &str, hosts: Vec<DiscoveredHost>) -> Self {
        self.subnets.insert(subnet.to_string(), hosts);
        self
    }

    pub fn with_ports(mut self, ip: &str, ports: &[u16]) -> Self {
        self.ports
            .insert(ip.to_string(), ports.iter().copied().map(OpenPort::tcp).collect());
        self
    }

    pub fn with_failing_ports(mut self, ip: &str) -> Self {
        self.failing_ports.insert(ip.to_string());
        self
    }

    pub fn with_banner(mut self, ip: &str, banner: &str) -> Self {
        self.banners.insert(ip.to_string(), banner.to_string());
        self
    }

    pub fn with_os(mut self, ip: &str, name: &str, accuracy: u8) -> Self {
        self.os.insert(
            ip.to_string(),
            vec![OsMatch {
                name: name.to_string(),
                accuracy,
                os_class: Vec::new(),
            }],
        );
        self
    }
}

#[async_trait]
impl ScanProbes for FakeNetwork {
    async fn discover(&self, subnet: &str) -> Result<Vec<DiscoveredHost>, ProbeError> {
        Ok(self.subnets.get(subnet).cloned().unwrap_or_default())
    }

    async fn scan_ports(&self, ip: &str, _port_range: &str) -> Result<Vec<OpenPort>, ProbeError> {
        if self.failing_ports.contains(ip) {
            return Err(ProbeError::Exit {
                code: Some(1),
                stderr: format!("host {ip} dropped probes"),
            });
        }
        Ok(self.ports.get(ip).cloned().unwrap_or_default())
    }

    async fn os_fingerprint(&self, ip: &str) -> Result<Vec<OsMatch>, ProbeError> {
        Ok(self.os.get(ip).cloned().unwrap_or_default())
    }

    async fn run_vuln_scripts(&self, ip: &str) -> VulnScan {
        VulnScan {
            ip: ip.to_string(),
            vulnerabilities: self.findings.get(ip).cloned().unwrap_or_default(),
            error: None,
        }
    }

    async fn service_banner(&self, ip: &str, _port: u16) -> Result<String, ProbeError> {
        self.banners
            .get(ip)
            .cloned()
            .ok_or_else(|| ProbeError::Parse(format!("no banner for {ip}")))
    }
}

/// Keyword to CVE records, in NVD `cve` object shape.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeCveDatabase {
    pub records: HashMap<String, Vec<Value>>,
    pub failing: HashSet<String>,
}

#[allow(dead_code)]
impl FakeCveDatabase {
    pub fn with_cve(mut self, keyword: &str, id: &str, base_score: f64) -> Self {
        self.records.entry(keyword.to_string()).or_default().push(json!({
            "id": id,
            "descriptions": [{"lang": "en", "value": format!("{keyword} flaw")}],
            "metrics": {"cvssMetricV31": [{"cvssData": {"baseScore": base_score}}]},
            "references": []
        }));
        self
    }

    pub fn with_failure(mut self, keyword: &str) -> Self {
        self.failing.insert(keyword.to_string());
        self
    }
}

#[async_trait]
impl VulnDatabase for FakeCveDatabase {
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<Value>, CveError> {
        if self.failing.contains(keyword) {
            return Err(CveError::Unavailable(format!("lookup of {keyword} refused")));
        }
        let mut records = self.records.get(keyword).cloned().unwrap_or_default();
        records.truncate(limit);
        Ok(records)
    }
}

/// Wires an orchestrator over the fakes and a fresh in-memory database.
///
/// HTTP version probes use a tight timeout so unreachable test addresses fail fast.
#[allow(dead_code)]
pub async fn orchestrator(network: FakeNetwork, cves: FakeCveDatabase) -> Arc<Orchestrator> {
    orchestrator_with_pool(network, cves, Arc::new(create_test_pool().await))
}

/// Same wiring over an existing pool, for scans that revisit stored devices.
#[allow(dead_code)]
pub fn orchestrator_with_pool(
    network: FakeNetwork,
    cves: FakeCveDatabase,
    pool: Arc<SqlitePool>,
) -> Arc<Orchestrator> {
    let probes: Arc<dyn ScanProbes> = Arc::new(network);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .connect_timeout(Duration::from_millis(50))
        .build()
        .expect("Failed to create HTTP client");
    let detector = VersionDetector::new(Arc::new(client), Arc::clone(&probes));
    let settings = ScanSettings {
        max_concurrency: 4,
        ..ScanSettings::default()
    };
    Arc::new(Orchestrator::new(
        probes,
        Arc::new(cves),
        detector,
        pool,
        settings,
    ))
}

/// An IoT host by vendor, so classification needs no port probe.
#[allow(dead_code)]
pub fn iot_host(ip: &str) -> DiscoveredHost {
    DiscoveredHost {
        mac: Some("00:11:22:33:44:55".to_string()),
        vendor: Some("Huawei Technologies".to_string()),
        ..DiscoveredHost::new(ip)
    }
}
