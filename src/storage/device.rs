//! Device store.
//!
//! One row per IP. A scan phase hands over a [`DevicePatch`] carrying only the
//! sub-documents it owns; the patch is merged into the stored record and every
//! derived field is recomputed from the merged result.

use std::collections::BTreeMap;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::cve::CveLookup;
use crate::error_handling::DatabaseError;
use crate::models::{NetworkInfo, OpenPort, OsMatch};
use crate::risk::{device_status, distinct_port_count, is_suspicious, risk_score, DeviceStatus};

/// CVE details keyed by the lookup keyword.
pub type CveDetails = BTreeMap<String, Vec<CveLookup>>;

/// Aggregate of the CVE details attached to a device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CveSummary {
    pub max_cvss: f64,
    /// Entries carrying a CVE id; error markers are not counted.
    pub vuln_count: usize,
    pub details: CveDetails,
}

impl CveSummary {
    pub fn from_details(details: CveDetails) -> Self {
        let entries = details.values().flatten().filter_map(CveLookup::entry);
        let (mut max_cvss, mut vuln_count) = (0.0_f64, 0);
        for entry in entries {
            if !entry.id.is_empty() {
                vuln_count += 1;
            }
            if let Some(score) = entry.cvss.filter(|s| s.is_finite()) {
                max_cvss = max_cvss.max(score);
            }
        }
        Self {
            max_cvss,
            vuln_count,
            details,
        }
    }
}

/// Stored device record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub network_info: NetworkInfo,
    pub firmware: Option<String>,
    pub open_ports: Vec<OpenPort>,
    pub cve_summary: CveSummary,
    pub risk_score: u8,
    pub status: DeviceStatus,
    pub suspicious: bool,
    pub os_fingerprint: Vec<OsMatch>,
    /// First insert, milliseconds since the Unix epoch. Never rewritten.
    pub created_at_ms: i64,
    pub last_scan_ms: i64,
}

/// How a patch changes the ports sub-document.
#[derive(Debug, Clone, PartialEq)]
pub enum PortsPatch {
    /// Authoritative port scan: the stored list is replaced.
    Replace(Vec<OpenPort>),
    /// Partial view: adds `(port, protocol)` pairs not stored yet.
    Merge(Vec<OpenPort>),
}

/// Firmware and CVE details, written together by the Version+CVE phase.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VersionPatch {
    pub firmware: Option<String>,
    pub cve_details: CveDetails,
}

/// Partial device update. `None` sub-documents are left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePatch {
    pub network: NetworkInfo,
    pub ports: Option<PortsPatch>,
    pub version: Option<VersionPatch>,
    pub os_fingerprint: Option<Vec<OsMatch>>,
    /// Caller's suspicious flag; a high-risk open port overrides `false`.
    pub suspicious: bool,
}

impl DevicePatch {
    /// A patch that only refreshes the network identity.
    pub fn new(network: NetworkInfo) -> Self {
        Self {
            network,
            ports: None,
            version: None,
            os_fingerprint: None,
            suspicious: false,
        }
    }

    pub fn ip(&self) -> &str {
        &self.network.ip
    }
}

/// Applies `patch` on top of `existing` and recomputes the derived fields.
pub fn merge_device(existing: Option<Device>, patch: DevicePatch, now_ms: i64) -> Device {
    let created_at_ms = existing.as_ref().map_or(now_ms, |d| d.created_at_ms);
    let (old_mac, old_firmware, old_ports, old_details, old_os) = match existing {
        Some(d) => (
            d.network_info.mac,
            d.firmware,
            d.open_ports,
            d.cve_summary.details,
            d.os_fingerprint,
        ),
        None => (None, None, Vec::new(), CveDetails::new(), Vec::new()),
    };

    let network_info = NetworkInfo {
        ip: patch.network.ip,
        mac: patch.network.mac.or(old_mac),
    };

    let open_ports = match patch.ports {
        None => old_ports,
        Some(PortsPatch::Replace(ports)) => ports,
        Some(PortsPatch::Merge(ports)) => {
            let mut merged = old_ports;
            for port in ports {
                let known = merged
                    .iter()
                    .any(|p| p.port == port.port && p.protocol == port.protocol);
                if !known {
                    merged.push(port);
                }
            }
            merged
        }
    };

    let (firmware, details) = match patch.version {
        Some(v) => (v.firmware, v.cve_details),
        None => (old_firmware, old_details),
    };
    let os_fingerprint = patch.os_fingerprint.unwrap_or(old_os);

    let cve_summary = CveSummary::from_details(details);
    let suspicious = is_suspicious(&open_ports, patch.suspicious);
    let risk = risk_score(
        Some(cve_summary.max_cvss),
        distinct_port_count(&open_ports),
        suspicious,
    );
    let status = device_status(cve_summary.max_cvss, risk);

    Device {
        network_info,
        firmware,
        open_ports,
        cve_summary,
        risk_score: risk,
        status,
        suspicious,
        os_fingerprint,
        created_at_ms,
        last_scan_ms: now_ms,
    }
}

const SELECT_DEVICE: &str = "SELECT ip, mac, firmware, open_ports, cve_details, max_cvss, vuln_count,
        risk_score, status, suspicious, os_fingerprint, created_at_ms, last_scan_ms
     FROM devices";

fn row_to_device(row: &SqliteRow) -> Result<Device, DatabaseError> {
    let status: String = row.try_get("status")?;
    let status = DeviceStatus::from_str(&status).map_err(|_| DatabaseError::InvalidValue {
        column: "status",
        value: status.clone(),
    })?;
    let details: CveDetails = serde_json::from_str(row.try_get::<&str, _>("cve_details")?)?;
    let vuln_count: i64 = row.try_get("vuln_count")?;
    let risk: i64 = row.try_get("risk_score")?;

    Ok(Device {
        network_info: NetworkInfo {
            ip: row.try_get("ip")?,
            mac: row.try_get("mac")?,
        },
        firmware: row.try_get("firmware")?,
        open_ports: serde_json::from_str(row.try_get::<&str, _>("open_ports")?)?,
        cve_summary: CveSummary {
            max_cvss: row.try_get("max_cvss")?,
            vuln_count: usize::try_from(vuln_count).unwrap_or_default(),
            details,
        },
        risk_score: u8::try_from(risk.clamp(0, 100)).unwrap_or_default(),
        status,
        suspicious: row.try_get("suspicious")?,
        os_fingerprint: serde_json::from_str(row.try_get::<&str, _>("os_fingerprint")?)?,
        created_at_ms: row.try_get("created_at_ms")?,
        last_scan_ms: row.try_get("last_scan_ms")?,
    })
}

/// Merges `patch` into the stored device for its IP, creating it if needed.
///
/// The read-merge-write runs in one transaction. The transaction opens with the
/// insert so the write lock is held before the current row is read.
pub async fn upsert_device(pool: &SqlitePool, patch: DevicePatch) -> Result<Device, DatabaseError> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO devices (ip, created_at_ms, last_scan_ms) VALUES (?, ?, ?)
         ON CONFLICT(ip) DO NOTHING",
    )
    .bind(patch.ip())
    .bind(now_ms)
    .bind(now_ms)
    .execute(&mut *tx)
    .await?;

    let existing = if inserted.rows_affected() == 1 {
        None
    } else {
        let row = sqlx::query(&format!("{SELECT_DEVICE} WHERE ip = ?"))
            .bind(patch.ip())
            .fetch_one(&mut *tx)
            .await?;
        Some(row_to_device(&row)?)
    };

    let device = merge_device(existing, patch, now_ms);

    sqlx::query(
        "UPDATE devices SET
             mac = ?, firmware = ?, open_ports = ?, cve_details = ?, max_cvss = ?,
             vuln_count = ?, risk_score = ?, status = ?, suspicious = ?,
             os_fingerprint = ?, last_scan_ms = ?
         WHERE ip = ?",
    )
    .bind(device.network_info.mac.as_deref())
    .bind(device.firmware.as_deref())
    .bind(serde_json::to_string(&device.open_ports)?)
    .bind(serde_json::to_string(&device.cve_summary.details)?)
    .bind(device.cve_summary.max_cvss)
    .bind(device.cve_summary.vuln_count as i64)
    .bind(i64::from(device.risk_score))
    .bind(device.status.as_str())
    .bind(device.suspicious)
    .bind(serde_json::to_string(&device.os_fingerprint)?)
    .bind(device.last_scan_ms)
    .bind(&device.network_info.ip)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    debug!(
        "Upserted device {} (risk {}, {})",
        device.network_info.ip, device.risk_score, device.status
    );
    Ok(device)
}

pub async fn find_device_by_ip(pool: &SqlitePool, ip: &str) -> Result<Option<Device>, DatabaseError> {
    let row = sqlx::query(&format!("{SELECT_DEVICE} WHERE ip = ?"))
        .bind(ip)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_device).transpose()
}

/// All devices, riskiest first.
pub async fn list_devices(pool: &SqlitePool) -> Result<Vec<Device>, DatabaseError> {
    let rows = sqlx::query(&format!("{SELECT_DEVICE} ORDER BY risk_score DESC, ip ASC"))
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_device).collect()
}
