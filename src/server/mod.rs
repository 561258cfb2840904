//! HTTP trigger server.
//!
//! Scan routes run one phase each against a shared session:
//! - `GET|POST /api/scan/discover` - host discovery (`ip` selects the subnet)
//! - `GET /api/scan/ports` - port scan of the IoT hosts
//! - `GET /api/scan/version` - version detection and CVE correlation
//! - `GET /api/scan/os` - OS fingerprinting
//!
//! Read routes serve the stores:
//! - `GET /api/scans?type=` - scan log, newest first
//! - `GET /api/devices`, `GET /api/devices/{ip}` - device records
//! - `GET /api/cves/{ip}`, `GET /api/cves?service=` - saved CVE lookups

mod handlers;
mod types;

use axum::routing::get;
use axum::Router;

use handlers::{
    cves_by_ip_handler, cves_by_service_handler, device_handler, devices_handler, discover_get,
    discover_post, os_handler, ports_handler, scans_handler, version_handler,
};
pub use types::{ApiError, ServerState};

/// Builds the router without binding it.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/scan/discover", get(discover_get).post(discover_post))
        .route("/api/scan/ports", get(ports_handler))
        .route("/api/scan/version", get(version_handler))
        .route("/api/scan/os", get(os_handler))
        .route("/api/scans", get(scans_handler))
        .route("/api/devices", get(devices_handler))
        .route("/api/devices/{ip}", get(device_handler))
        .route("/api/cves", get(cves_by_service_handler))
        .route("/api/cves/{ip}", get(cves_by_ip_handler))
        .with_state(state)
}

/// Serves the trigger API until `state.shutdown` is cancelled.
pub async fn start_server(bind: &str, port: u16, state: ServerState) -> Result<(), anyhow::Error> {
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind server to {}:{}: {}", bind, port, e))?;

    log::info!("Server listening on http://{}:{}/", bind, port);
    log::info!("  - Scans: http://{}:{}/api/scan/{{discover,ports,version,os}}", bind, port);
    log::info!("  - Devices: http://{}:{}/api/devices", bind, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
