//! Read-only handlers over the stores.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::models::ScanType;
use crate::storage::{
    cve_records_by_ip, cve_records_by_service, find_device_by_ip, list_devices,
    query_scan_results, CveRecord, Device, ScanResult,
};

use super::super::types::{ApiError, CvesQuery, ScansQuery, ServerState};

pub async fn scans_handler(
    State(state): State<ServerState>,
    Query(query): Query<ScansQuery>,
) -> Result<Json<Vec<ScanResult>>, ApiError> {
    let scan_type = query
        .scan_type
        .filter(|t| !t.is_empty())
        .map(|t| {
            ScanType::from_str(&t)
                .map_err(|_| ApiError::BadRequest(format!("unknown scan type '{t}'")))
        })
        .transpose()?;
    let results = query_scan_results(state.orchestrator.pool(), scan_type).await?;
    Ok(Json(results))
}

pub async fn devices_handler(State(state): State<ServerState>) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(list_devices(state.orchestrator.pool()).await?))
}

pub async fn device_handler(
    State(state): State<ServerState>,
    Path(ip): Path<String>,
) -> Result<Json<Device>, ApiError> {
    find_device_by_ip(state.orchestrator.pool(), &ip)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no device with ip {ip}")))
}

pub async fn cves_by_ip_handler(
    State(state): State<ServerState>,
    Path(ip): Path<String>,
) -> Result<Json<Vec<CveRecord>>, ApiError> {
    Ok(Json(cve_records_by_ip(state.orchestrator.pool(), &ip).await?))
}

pub async fn cves_by_service_handler(
    State(state): State<ServerState>,
    Query(query): Query<CvesQuery>,
) -> Result<Json<Vec<CveRecord>>, ApiError> {
    let service = query
        .service
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'service' query parameter".to_string()))?;
    Ok(Json(cve_records_by_service(state.orchestrator.pool(), &service).await?))
}
