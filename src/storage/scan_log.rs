//! Append-only scan result log.

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::ScanType;

/// One stored phase result. `data` is returned exactly as appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub id: i64,
    pub scan_type: ScanType,
    pub data: Value,
    pub observed_at_ms: i64,
}

/// Appends a record and returns its id.
pub async fn append_scan_result(
    pool: &SqlitePool,
    scan_type: ScanType,
    data: &Value,
) -> Result<i64, DatabaseError> {
    let observed_at_ms = chrono::Utc::now().timestamp_millis();
    let id = sqlx::query(
        "INSERT INTO scan_results (scan_type, data, observed_at_ms) VALUES (?, ?, ?)
         RETURNING id",
    )
    .bind(scan_type.as_str())
    .bind(serde_json::to_string(data)?)
    .bind(observed_at_ms)
    .fetch_one(pool)
    .await?
    .get::<i64, _>(0);
    Ok(id)
}

/// Stored results, newest first, optionally restricted to one type.
pub async fn query_scan_results(
    pool: &SqlitePool,
    scan_type: Option<ScanType>,
) -> Result<Vec<ScanResult>, DatabaseError> {
    let rows = match scan_type {
        Some(scan_type) => {
            sqlx::query(
                "SELECT id, scan_type, data, observed_at_ms FROM scan_results
                 WHERE scan_type = ?
                 ORDER BY observed_at_ms DESC, id DESC",
            )
            .bind(scan_type.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT id, scan_type, data, observed_at_ms FROM scan_results
                 ORDER BY observed_at_ms DESC, id DESC",
            )
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter()
        .map(|row| -> Result<ScanResult, DatabaseError> {
            let kind: String = row.try_get("scan_type")?;
            let scan_type = ScanType::from_str(&kind).map_err(|_| DatabaseError::InvalidValue {
                column: "scan_type",
                value: kind.clone(),
            })?;
            Ok(ScanResult {
                id: row.try_get("id")?,
                scan_type,
                data: serde_json::from_str(row.try_get::<&str, _>("data")?)?,
                observed_at_ms: row.try_get("observed_at_ms")?,
            })
        })
        .collect()
}
