//! Phase trigger handlers. Each runs one phase to completion and returns its
//! report with 200, whatever failed inside.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;

use crate::scan::{
    subnet_for, DiscoverReport, OsHostResult, PhaseReport, PortsHostResult, VersionCveHostResult,
};

use super::super::types::{DiscoverParams, ServerState};

async fn run_discover(state: &ServerState, params: DiscoverParams) -> Json<DiscoverReport> {
    let subnet = subnet_for(params.ip.as_deref(), params.subnet.as_deref());
    let report = state
        .orchestrator
        .discover(&state.session, &subnet, &state.shutdown)
        .await;
    Json(report)
}

pub async fn discover_get(
    State(state): State<ServerState>,
    Query(params): Query<DiscoverParams>,
) -> Json<DiscoverReport> {
    run_discover(&state, params).await
}

/// Missing, malformed or non-object bodies fall back to the default subnet.
pub async fn discover_post(State(state): State<ServerState>, body: Bytes) -> Json<DiscoverReport> {
    let params = serde_json::from_slice(&body).unwrap_or_default();
    run_discover(&state, params).await
}

pub async fn ports_handler(State(state): State<ServerState>) -> Json<PhaseReport<PortsHostResult>> {
    Json(state.orchestrator.ports(&state.session, &state.shutdown).await)
}

pub async fn version_handler(
    State(state): State<ServerState>,
) -> Json<PhaseReport<VersionCveHostResult>> {
    Json(state.orchestrator.version_cve(&state.session, &state.shutdown).await)
}

pub async fn os_handler(State(state): State<ServerState>) -> Json<PhaseReport<OsHostResult>> {
    Json(state.orchestrator.os(&state.session, &state.shutdown).await)
}
