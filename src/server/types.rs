//! Trigger server state, query parameters and error responses.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error_handling::DatabaseError;
use crate::scan::{Orchestrator, ScanSession};

/// Shared state for the trigger server.
///
/// All scan routes work on the one `session`; `shutdown` doubles as the
/// cancellation token handed to running phases.
#[derive(Clone)]
pub struct ServerState {
    pub orchestrator: Arc<Orchestrator>,
    pub session: ScanSession,
    pub shutdown: CancellationToken,
}

impl ServerState {
    pub fn new(orchestrator: Arc<Orchestrator>, shutdown: CancellationToken) -> Self {
        Self {
            orchestrator,
            session: ScanSession::new(),
            shutdown,
        }
    }
}

/// `?ip=` on GET, `{"ip": ...}` on POST.
#[derive(Debug, Default, Deserialize)]
pub struct DiscoverParams {
    pub ip: Option<String>,
    pub subnet: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScansQuery {
    #[serde(rename = "type")]
    pub scan_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CvesQuery {
    pub service: Option<String>,
}

/// Errors of the read routes. Scan routes never fail.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(e) => {
                log::error!("Request failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
