//! Device risk scoring.
//!
//! Pure functions combining the worst CVSS score, the port exposure and the
//! suspicious-service heuristic into a bounded score and a status label.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

use crate::config::HIGH_RISK_PORTS;
use crate::models::OpenPort;

/// Points added when a device exposes a high-risk service.
const SUSPICIOUS_PENALTY: i64 = 15;
/// Points per distinct open port.
const PORT_WEIGHT: i64 = 2;
const MAX_RISK: i64 = 100;

/// Device status derived from severity and risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
pub enum DeviceStatus {
    #[serde(rename = "Active")]
    #[strum(serialize = "Active")]
    Active,
    #[serde(rename = "At Risk")]
    #[strum(serialize = "At Risk")]
    AtRisk,
    #[serde(rename = "Vulnerable - High")]
    #[strum(serialize = "Vulnerable - High")]
    VulnerableHigh,
    #[serde(rename = "Vulnerable - Critical")]
    #[strum(serialize = "Vulnerable - Critical")]
    VulnerableCritical,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Active => "Active",
            DeviceStatus::AtRisk => "At Risk",
            DeviceStatus::VulnerableHigh => "Vulnerable - High",
            DeviceStatus::VulnerableCritical => "Vulnerable - Critical",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the 0-100 risk score.
///
/// `round(max_cvss * 10) + open_port_count * 2 + (15 if suspicious)`, clamped.
/// A missing or non-finite `max_cvss` counts as 0.0.
pub fn risk_score(max_cvss: Option<f64>, open_port_count: usize, suspicious: bool) -> u8 {
    let cvss = max_cvss.filter(|c| c.is_finite()).unwrap_or(0.0);
    // Float-to-int `as` saturates, so absurd scores cannot overflow.
    let base = (cvss * 10.0).round() as i64;
    let ports = i64::try_from(open_port_count)
        .unwrap_or(i64::MAX)
        .saturating_mul(PORT_WEIGHT);
    let penalty = if suspicious { SUSPICIOUS_PENALTY } else { 0 };

    let score = base.saturating_add(ports).saturating_add(penalty);
    score.clamp(0, MAX_RISK) as u8
}

/// Derives the status label, checking severity before the aggregate score.
pub fn device_status(max_cvss: f64, risk_score: u8) -> DeviceStatus {
    if max_cvss >= 9.0 {
        DeviceStatus::VulnerableCritical
    } else if max_cvss >= 7.0 {
        DeviceStatus::VulnerableHigh
    } else if risk_score >= 50 {
        DeviceStatus::AtRisk
    } else {
        DeviceStatus::Active
    }
}

/// Returns true if any port is a high-risk service.
pub fn exposes_high_risk_port(ports: &[OpenPort]) -> bool {
    ports.iter().any(|p| HIGH_RISK_PORTS.contains(&p.port))
}

/// Suspicious flag: a high-risk port forces `true` whatever the caller said.
pub fn is_suspicious(ports: &[OpenPort], caller_flag: bool) -> bool {
    exposes_high_risk_port(ports) || caller_flag
}

/// Number of distinct port numbers (a port open on tcp and udp counts once).
pub fn distinct_port_count(ports: &[OpenPort]) -> usize {
    ports.iter().map(|p| p.port).collect::<HashSet<_>>().len()
}
