//! HTTP client initialization.
//!
//! Two clients with different deadlines: a short one for probing device web
//! servers and a longer one for the vulnerability database.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{Config, NVD_TIMEOUT_SECS};

const USER_AGENT: &str = concat!("iot_scan/", env!("CARGO_PKG_VERSION"));

/// Client for version detection probes; every request shares the short
/// configured deadline.
pub fn init_probe_client(config: &Config) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let timeout = Duration::from_secs(config.http_timeout_seconds);
    let client = ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(Arc::new(client))
}

/// Client for the NVD CVE API.
pub fn init_nvd_client() -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(NVD_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(Arc::new(client))
}
