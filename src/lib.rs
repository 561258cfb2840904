//! iot_scan library: IoT device discovery, CVE correlation and risk scoring
//!
//! A scan runs in phases over the IoT hosts of a subnet: host discovery,
//! port scanning, version detection with CVE correlation, and OS
//! fingerprinting. Each phase appends its results to a scan log and merges
//! what it learned into one device record per IP.
//!
//! # Example
//!
//! ```no_run
//! use iot_scan::{init_orchestrator, run_pipeline, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     db_path: std::path::PathBuf::from("iot.db"),
//!     max_concurrency: 8,
//!     ..Default::default()
//! };
//!
//! let orchestrator = init_orchestrator(&config).await?;
//! let report = run_pipeline(&orchestrator, "192.168.1.0/24", &CancellationToken::new()).await;
//! println!("{} IoT hosts, {} failed", report.discover.iot_hosts.len(), report.failed_hosts());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! Probing shells out to `nmap`, which has to be installed. OS fingerprinting
//! and some discovery modes need root.

pub mod config;
pub mod cve;
pub mod error_handling;
pub mod initialization;
pub mod models;
pub mod probes;
pub mod risk;
pub mod scan;
pub mod server;
pub mod storage;
pub mod version;

// Re-export public API
pub use config::{Command, Config, LogFormat, LogLevel, Opt};
pub use initialization::init_orchestrator;
pub use scan::{run_pipeline, subnet_for, Orchestrator, PipelineReport, ScanSession};
pub use server::{start_server, ServerState};
pub use storage::{run_migrations, Device};
