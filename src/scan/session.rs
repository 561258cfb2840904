//! Working set shared by the phases of one scan session.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::models::{DiscoveredHost, NetworkInfo};

/// Hosts found by the last discovery of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkingSet {
    pub subnet: Option<String>,
    pub alive_hosts: Vec<DiscoveredHost>,
    pub iot_hosts: Vec<DiscoveredHost>,
}

/// Cloneable handle to a working set.
///
/// Discovery replaces the whole set; the other phases read a snapshot of the
/// IoT hosts, so a concurrent discovery never changes a running phase's hosts.
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    inner: Arc<RwLock<WorkingSet>>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose IoT list is `hosts`, without running discovery.
    pub fn with_iot_hosts(hosts: Vec<DiscoveredHost>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(WorkingSet {
                subnet: None,
                alive_hosts: hosts.clone(),
                iot_hosts: hosts,
            })),
        }
    }

    pub async fn replace(&self, working_set: WorkingSet) {
        *self.inner.write().await = working_set;
    }

    pub async fn snapshot(&self) -> WorkingSet {
        self.inner.read().await.clone()
    }

    /// Network identity of every IoT host, in discovery order.
    pub async fn iot_targets(&self) -> Vec<NetworkInfo> {
        self.inner
            .read()
            .await
            .iot_hosts
            .iter()
            .map(|h| NetworkInfo {
                ip: h.ip.clone(),
                mac: h.mac.clone(),
            })
            .collect()
    }
}
