//! Shared scan data types.
//!
//! These are the shapes exchanged between the scan probes, the version detector,
//! the orchestrator and storage. All of them serialize to the JSON stored in the
//! scan result log.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// A host that answered discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredHost {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// MAC vendor as resolved by the scan tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

impl DiscoveredHost {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            mac: None,
            vendor: None,
        }
    }
}

/// An open port with its detected service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPort {
    pub port: u16,
    pub protocol: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub version: String,
}

impl OpenPort {
    /// A TCP port with no service information.
    pub fn tcp(port: u16) -> Self {
        Self {
            port,
            protocol: "tcp".to_string(),
            service: String::new(),
            product: String::new(),
            version: String::new(),
        }
    }
}

/// One OS candidate reported by fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsMatch {
    pub name: String,
    /// Confidence, 0-100.
    pub accuracy: u8,
    #[serde(default)]
    pub os_class: Vec<OsClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OsClass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<u8>,
}

/// Output of one vulnerability script against one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnFinding {
    pub port: u16,
    pub protocol: String,
    pub script: String,
    pub output: String,
}

/// Result of running the vulnerability scripts against a host.
///
/// A failed run still produces a value: `error` carries the reason and
/// `vulnerabilities` holds whatever was collected (usually nothing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnScan {
    pub ip: String,
    #[serde(default)]
    pub vulnerabilities: Vec<VulnFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VulnScan {
    pub fn failed(ip: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            vulnerabilities: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Vendor/product/version inferred for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub vendor: Option<String>,
    pub product: String,
    pub version: String,
}

/// Network identity of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

impl NetworkInfo {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            mac: None,
        }
    }
}

/// Kind of record in the scan result log.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanType {
    Discover,
    Ports,
    PortsSingle,
    VersionCve,
    VersionCveSingle,
    Os,
    OsSingle,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}
