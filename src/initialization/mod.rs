//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger
//! - HTTP clients (version probes and the NVD API)
//! - Database connection pool
//! - The scan orchestrator wired from a [`Config`]

mod client;
mod logger;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use crate::config::Config;
use crate::cve::NvdClient;
use crate::probes::{NmapProbes, ScanProbes};
use crate::scan::{Orchestrator, ScanSettings};
use crate::storage::init_db_pool_with_path;
use crate::version::VersionDetector;

// Re-export public API
pub use client::{init_nvd_client, init_probe_client};
pub use logger::init_logger_with;

/// Builds an orchestrator backed by nmap, the NVD API and the SQLite file in
/// `config.db_path`.
pub async fn init_orchestrator(config: &Config) -> Result<Arc<Orchestrator>> {
    let pool = init_db_pool_with_path(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;

    let probes: Arc<dyn ScanProbes> = Arc::new(NmapProbes::new(
        config.nmap_path.clone(),
        Duration::from_secs(config.nmap_timeout_seconds),
    ));

    let probe_client = init_probe_client(config).context("Failed to create probe HTTP client")?;
    let detector = VersionDetector::new(probe_client, Arc::clone(&probes));

    let nvd_client = init_nvd_client().context("Failed to create NVD HTTP client")?;
    let vuln_db = NvdClient::new(nvd_client, config.nvd_url.clone()).with_api_key(config.nvd_api_key.clone());

    let settings = ScanSettings {
        port_range: config.port_range.clone(),
        cve_max_results: config.cve_max_results,
        max_concurrency: config.max_concurrency,
    };
    info!(
        "Scanner ready (nmap: {}, concurrency: {}, ports: {})",
        config.nmap_path.display(),
        settings.max_concurrency,
        settings.port_range
    );

    Ok(Arc::new(Orchestrator::new(
        probes,
        Arc::new(vuln_db),
        detector,
        pool,
        settings,
    )))
}
