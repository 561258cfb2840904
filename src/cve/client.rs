//! Vulnerability database client.
//!
//! The orchestrator depends on the [`VulnDatabase`] trait; [`NvdClient`] is the
//! production implementation backed by the NVD CVE API 2.0.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use serde_json::Value;

use crate::error_handling::CveError;

use super::extract::normalize_cve;
use super::types::{CveLookup, NvdResponse};

/// Read-only keyword lookup over a vulnerability database.
#[async_trait]
pub trait VulnDatabase: Send + Sync {
    /// Returns at most `limit` raw CVE records matching `keyword`.
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<Value>, CveError>;
}

/// NVD CVE API 2.0 client.
pub struct NvdClient {
    client: Arc<reqwest::Client>,
    base_url: String,
    api_key: Option<String>,
}

impl NvdClient {
    pub fn new(client: Arc<reqwest::Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Sends `key` in the `apiKey` header on every request.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }
}

#[async_trait]
impl VulnDatabase for NvdClient {
    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<Value>, CveError> {
        let limit = limit.to_string();
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("keywordSearch", keyword), ("resultsPerPage", limit.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("apiKey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CveError::Unavailable(format!("rate limited by NVD ({status})")));
        }
        let response = response.error_for_status()?;
        let page: NvdResponse = response.json().await?;
        Ok(page.vulnerabilities.into_iter().map(|item| item.cve).collect())
    }
}

/// Looks up `keyword` and normalizes every returned record.
///
/// Never fails: a transport or HTTP error becomes a single
/// [`CveLookup::Error`] element. Zero matches is an empty list.
pub async fn fetch_cves(db: &dyn VulnDatabase, keyword: &str, max_results: usize) -> Vec<CveLookup> {
    match db.search(keyword, max_results).await {
        Ok(records) => {
            debug!("CVE lookup for '{}' returned {} records", keyword, records.len());
            records
                .into_iter()
                .map(|raw| CveLookup::Entry(normalize_cve(raw)))
                .collect()
        }
        Err(e) => {
            warn!("CVE lookup for '{}' failed: {}", keyword, e);
            vec![CveLookup::error(e.to_string())]
        }
    }
}
