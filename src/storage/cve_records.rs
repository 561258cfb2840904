//! Append-only CVE lookup history, one row per (ip, keyword) per save.

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::cve::CveLookup;
use crate::error_handling::DatabaseError;

use super::device::CveDetails;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CveRecord {
    pub id: i64,
    pub ip: String,
    /// Keyword the lookup was made with.
    pub service: String,
    pub cves: Vec<CveLookup>,
    pub observed_at_ms: i64,
}

/// Stores one row per keyword in `results`. Returns the number of rows written.
pub async fn save_cve_records(
    pool: &SqlitePool,
    ip: &str,
    results: &CveDetails,
) -> Result<usize, DatabaseError> {
    let observed_at_ms = chrono::Utc::now().timestamp_millis();
    let mut tx = pool.begin().await?;
    for (service, cves) in results {
        sqlx::query(
            "INSERT INTO cve_records (ip, service, cves, observed_at_ms) VALUES (?, ?, ?, ?)",
        )
        .bind(ip)
        .bind(service)
        .bind(serde_json::to_string(cves)?)
        .bind(observed_at_ms)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(results.len())
}

pub async fn cve_records_by_ip(pool: &SqlitePool, ip: &str) -> Result<Vec<CveRecord>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT id, ip, service, cves, observed_at_ms FROM cve_records
         WHERE ip = ? ORDER BY observed_at_ms DESC, id DESC",
    )
    .bind(ip)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_record).collect()
}

pub async fn cve_records_by_service(
    pool: &SqlitePool,
    service: &str,
) -> Result<Vec<CveRecord>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT id, ip, service, cves, observed_at_ms FROM cve_records
         WHERE service = ? ORDER BY observed_at_ms DESC, id DESC",
    )
    .bind(service)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_record).collect()
}

fn row_to_record(row: &SqliteRow) -> Result<CveRecord, DatabaseError> {
    Ok(CveRecord {
        id: row.try_get("id")?,
        ip: row.try_get("ip")?,
        service: row.try_get("service")?,
        cves: serde_json::from_str(row.try_get::<&str, _>("cves")?)?,
        observed_at_ms: row.try_get("observed_at_ms")?,
    })
}
