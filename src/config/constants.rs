//! Configuration constants.
//!
//! This module defines the constants used throughout the scanner: probe targets,
//! heuristic tables, timeouts and defaults.

use std::time::Duration;

/// Default SQLite database path.
pub const DB_PATH: &str = "./iot_scan.db";

/// Subnet scanned when the caller provides neither an IP nor a subnet.
pub const DEFAULT_SUBNET: &str = "192.168.1.0/24";

/// Port range used by the Ports phase.
pub const DEFAULT_PORT_RANGE: &str = "1-1000";

// IoT classification heuristic
/// MAC vendor substrings that mark a host as IoT/DER hardware.
pub const IOT_VENDORS: [&str; 5] = ["Huawei", "Sungrow", "Growatt", "SolarEdge", "Siemens"];
/// Ports typical of IoT/DER devices (telnet, HTTP(S), Modbus, MQTT).
pub const IOT_PORTS: [u16; 5] = [23, 80, 443, 502, 1883];

/// Ports whose exposure marks a device as suspicious (SSH, telnet, RDP, SMB, VNC).
pub const HIGH_RISK_PORTS: [u16; 5] = [22, 23, 3389, 445, 5900];

// Version detection
/// Status endpoints probed for a firmware/version string, in order.
pub const STATUS_ENDPOINTS: [&str; 3] = ["/status", "/about", "/info"];
/// Ports tried by the Version+CVE phase, in order.
pub const VERSION_CANDIDATE_PORTS: [u16; 2] = [80, 443];
/// Per-request timeout for version detection HTTP probes.
pub const VERSION_HTTP_TIMEOUT_SECS: u64 = 3;
/// Timeout for the single-port banner scan fallback.
pub const BANNER_SCAN_TIMEOUT: Duration = Duration::from_secs(15);

// Vulnerability database
/// NVD CVE API 2.0 endpoint.
pub const NVD_BASE_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";
/// Request timeout for NVD queries.
pub const NVD_TIMEOUT_SECS: u64 = 10;
/// Maximum CVEs requested per keyword by the Version+CVE phase.
pub const CVE_MAX_RESULTS: usize = 8;

// Scan tool
/// Default nmap binary (resolved through `PATH`).
pub const NMAP_BINARY: &str = "nmap";
/// Upper bound on a single nmap invocation.
/// Full `-sV` sweeps of 1000 ports against slow embedded devices routinely take minutes.
pub const NMAP_TIMEOUT_SECS: u64 = 300;

/// Hosts processed concurrently within one phase (1 = sequential).
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

/// Default bind port for the trigger server.
pub const DEFAULT_SERVER_PORT: u16 = 3000;
