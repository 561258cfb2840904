//! Version detection.
//!
//! Infers vendor/product/version for a service by trying, in order:
//! - a version string on one of the status pages
//! - the HTTP `Server` header of the root page
//! - a single-port banner scan through the scan probes
//!
//! Every step fails soft; a detector that finds nothing returns `None`.

mod parse;

use std::net::IpAddr;
use std::sync::Arc;

use log::debug;

use crate::config::{STATUS_ENDPOINTS, VERSION_CANDIDATE_PORTS};
use crate::models::VersionInfo;
use crate::probes::ScanProbes;

pub use parse::{
    parse_banner, parse_body_version, parse_server_header, BANNER_PRODUCT, BODY_PRODUCT,
    HEADER_PRODUCT,
};

/// Staged version detector.
///
/// The HTTP client should carry the short version-probe timeout.
#[derive(Clone)]
pub struct VersionDetector {
    client: Arc<reqwest::Client>,
    probes: Arc<dyn ScanProbes>,
}

impl VersionDetector {
    pub fn new(client: Arc<reqwest::Client>, probes: Arc<dyn ScanProbes>) -> Self {
        Self { client, probes }
    }

    /// Runs the three strategies against `host:port`.
    pub async fn detect_version(&self, host: &str, port: u16) -> Option<VersionInfo> {
        if let Some(info) = self.from_status_pages(host, port).await {
            debug!("{}:{} version from status page: {}", host, port, info.version);
            return Some(info);
        }
        if let Some(info) = self.from_server_header(host, port).await {
            debug!("{}:{} version from Server header: {}", host, port, info.version);
            return Some(info);
        }
        let info = self.from_banner(host, port).await;
        if let Some(info) = &info {
            debug!("{}:{} version from banner: {}", host, port, info.version);
        }
        info
    }

    /// Tries the standard candidate ports (80, then 443).
    pub async fn detect_any(&self, host: &str) -> Option<VersionInfo> {
        self.detect_over(host, &VERSION_CANDIDATE_PORTS).await
    }

    /// Tries each port in order and keeps the first hit.
    pub async fn detect_over(&self, host: &str, ports: &[u16]) -> Option<VersionInfo> {
        for &port in ports {
            if let Some(info) = self.detect_version(host, port).await {
                return Some(info);
            }
        }
        None
    }

    async fn from_status_pages(&self, host: &str, port: u16) -> Option<VersionInfo> {
        for endpoint in STATUS_ENDPOINTS {
            let url = format!("{}{endpoint}", base_url(host, port));
            let response = match self.client.get(&url).send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    debug!("{} returned {}", url, r.status());
                    continue;
                }
                Err(e) => {
                    debug!("{} unreachable: {}", url, e);
                    continue;
                }
            };
            let Ok(body) = response.text().await else {
                continue;
            };
            if let Some(info) = parse_body_version(&body) {
                return Some(info);
            }
        }
        None
    }

    async fn from_server_header(&self, host: &str, port: u16) -> Option<VersionInfo> {
        let url = base_url(host, port);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| debug!("{} unreachable: {}", url, e))
            .ok()?;
        let server = response.headers().get(reqwest::header::SERVER)?.to_str().ok()?;
        parse_server_header(server)
    }

    async fn from_banner(&self, host: &str, port: u16) -> Option<VersionInfo> {
        match self.probes.service_banner(host, port).await {
            Ok(output) => parse_banner(&output),
            Err(e) => {
                debug!("Banner scan of {}:{} failed: {}", host, port, e);
                None
            }
        }
    }
}

/// `http://host:port` with IPv6 literals bracketed.
fn base_url(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(addr)) => format!("http://[{addr}]:{port}"),
        _ => format!("http://{host}:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ProbeError;
    use crate::models::{DiscoveredHost, OpenPort, OsMatch, VulnScan};
    use async_trait::async_trait;
    use httptest::{matchers::*, responders::*, Expectation, Server, ServerBuilder};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Probe that only answers banner scans, recording the ports asked for.
    #[derive(Default)]
    struct BannerProbe {
        banner: Option<String>,
        asked: Mutex<Vec<u16>>,
    }

    #[async_trait]
    impl ScanProbes for BannerProbe {
        async fn discover(&self, _subnet: &str) -> Result<Vec<DiscoveredHost>, ProbeError> {
            Ok(Vec::new())
        }

        async fn scan_ports(&self, _ip: &str, _range: &str) -> Result<Vec<OpenPort>, ProbeError> {
            Ok(Vec::new())
        }

        async fn os_fingerprint(&self, _ip: &str) -> Result<Vec<OsMatch>, ProbeError> {
            Ok(Vec::new())
        }

        async fn run_vuln_scripts(&self, ip: &str) -> VulnScan {
            VulnScan::failed(ip, "unused")
        }

        async fn service_banner(&self, _ip: &str, port: u16) -> Result<String, ProbeError> {
            self.asked.lock().unwrap().push(port);
            self.banner
                .clone()
                .ok_or(ProbeError::Timeout { secs: 15 })
        }
    }

    fn detector(probe: Arc<BannerProbe>) -> VersionDetector {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .expect("Failed to create HTTP client");
        VersionDetector::new(Arc::new(client), probe)
    }

    fn host_port(server: &Server) -> (String, u16) {
        let addr = server.addr();
        (addr.ip().to_string(), addr.port())
    }

    #[tokio::test]
    async fn test_status_page_wins() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/status"))
                .respond_with(status_code(200).body("Firmware: 4.2.0")),
        );

        let probe = Arc::new(BannerProbe::default());
        let (host, port) = host_port(&server);
        let info = detector(probe.clone()).detect_version(&host, port).await.unwrap();
        assert_eq!(info.product, "UnknownDevice");
        assert_eq!(info.version, "4.2.0");
        assert!(probe.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_later_status_page_after_404() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/status"))
                .respond_with(status_code(404)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/about"))
                .respond_with(status_code(200).body("<td>Version 1.7b</td>")),
        );

        let (host, port) = host_port(&server);
        let info = detector(Arc::new(BannerProbe::default()))
            .detect_version(&host, port)
            .await
            .unwrap();
        assert_eq!(info.version, "1.7b");
    }

    #[tokio::test]
    async fn test_server_header_fallback() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method(eq("GET")))
                .times(..)
                .respond_with(status_code(404).insert_header("Server", "lighttpd/1.4.59")),
        );

        let (host, port) = host_port(&server);
        let info = detector(Arc::new(BannerProbe::default()))
            .detect_version(&host, port)
            .await
            .unwrap();
        assert_eq!(info.vendor.as_deref(), Some("lighttpd"));
        assert_eq!(info.product, "Webserver");
        assert_eq!(info.version, "1.4.59");
    }

    #[tokio::test]
    async fn test_banner_fallback_when_http_silent() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method(eq("GET")))
                .times(..)
                .respond_with(status_code(200).body("welcome")),
        );

        let probe = Arc::new(BannerProbe {
            banner: Some("8080/tcp open http Boa 0.94.14rc21".to_string()),
            ..Default::default()
        });
        let (host, port) = host_port(&server);
        let info = detector(probe.clone()).detect_version(&host, port).await.unwrap();
        assert_eq!(info.vendor.as_deref(), Some("Boa"));
        assert_eq!(info.product, "Service");
        assert_eq!(*probe.asked.lock().unwrap(), vec![port]);
    }

    #[tokio::test]
    async fn test_nothing_found_is_none() {
        // Nothing listens on port 9; every HTTP step fails to connect.
        let probe = Arc::new(BannerProbe::default());
        let result = detector(probe.clone()).detect_version("127.0.0.1", 9).await;
        assert!(result.is_none());
        assert_eq!(*probe.asked.lock().unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn test_detect_over_tries_ports_in_order() {
        let probe = Arc::new(BannerProbe::default());
        let result = detector(probe.clone()).detect_over("127.0.0.1", &[9, 7]).await;
        assert!(result.is_none());
        assert_eq!(*probe.asked.lock().unwrap(), vec![9, 7]);
    }

    #[test]
    fn test_base_url_brackets_ipv6_only() {
        assert_eq!(base_url("::1", 8080), "http://[::1]:8080");
        assert_eq!(base_url("fe80::1c2:3ff:fe44:5566", 80), "http://[fe80::1c2:3ff:fe44:5566]:80");
        assert_eq!(base_url("192.0.2.5", 80), "http://192.0.2.5:80");
        assert_eq!(base_url("camera.local", 8443), "http://camera.local:8443");
    }

    #[tokio::test]
    async fn test_status_page_over_ipv6_loopback() {
        // Hosts without an IPv6 loopback cannot bind [::1]; nothing to check there.
        let Ok(server) = ServerBuilder::new()
            .bind_addr("[::1]:0".parse().unwrap())
            .run()
        else {
            return;
        };
        server.expect(
            Expectation::matching(request::method_path("GET", "/status"))
                .respond_with(status_code(200).body("Firmware: 2.0.1")),
        );

        let probe = Arc::new(BannerProbe::default());
        let (host, port) = host_port(&server);
        assert_eq!(host, "::1");
        let info = detector(probe.clone()).detect_version(&host, port).await.unwrap();
        assert_eq!(info.version, "2.0.1");
        assert!(probe.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_header_over_ipv6_loopback() {
        let Ok(server) = ServerBuilder::new()
            .bind_addr("[::1]:0".parse().unwrap())
            .run()
        else {
            return;
        };
        server.expect(
            Expectation::matching(request::method(eq("GET")))
                .times(..)
                .respond_with(status_code(404).insert_header("Server", "lighttpd/1.4.59")),
        );

        let (host, port) = host_port(&server);
        let info = detector(Arc::new(BannerProbe::default()))
            .detect_version(&host, port)
            .await
            .unwrap();
        assert_eq!(info.version, "1.4.59");
    }
}
