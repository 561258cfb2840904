//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::constants::{
    CVE_MAX_RESULTS, DB_PATH, DEFAULT_MAX_CONCURRENCY, DEFAULT_PORT_RANGE, DEFAULT_SERVER_PORT,
    NMAP_BINARY, NMAP_TIMEOUT_SECS, NVD_BASE_URL, VERSION_HTTP_TIMEOUT_SECS,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use iot_scan::Config;
///
/// let config = Config {
///     max_concurrency: 4,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// nmap binary used for all scan probes
    pub nmap_path: PathBuf,

    /// Upper bound for one nmap invocation, in seconds
    pub nmap_timeout_seconds: u64,

    /// Per-request timeout for version detection HTTP probes, in seconds
    pub http_timeout_seconds: u64,

    /// Vulnerability database endpoint
    pub nvd_url: String,

    /// Optional NVD API key (raises the public rate limit)
    pub nvd_api_key: Option<String>,

    /// CVEs requested per keyword
    pub cve_max_results: usize,

    /// Hosts processed concurrently within one phase
    pub max_concurrency: usize,

    /// Port range scanned by the Ports phase
    pub port_range: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_PATH),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            nmap_path: PathBuf::from(NMAP_BINARY),
            nmap_timeout_seconds: NMAP_TIMEOUT_SECS,
            http_timeout_seconds: VERSION_HTTP_TIMEOUT_SECS,
            nvd_url: NVD_BASE_URL.to_string(),
            nvd_api_key: None,
            cve_max_results: CVE_MAX_RESULTS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            port_range: DEFAULT_PORT_RANGE.to_string(),
        }
    }
}

/// Command-line options.
#[derive(Debug, Parser)]
#[command(name = "iot_scan", version, about = "IoT discovery, CVE correlation and risk scoring")]
pub struct Opt {
    /// SQLite database file
    #[arg(long, global = true, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, global = true, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// nmap binary
    #[arg(long, global = true, default_value = NMAP_BINARY)]
    pub nmap_path: PathBuf,

    /// Timeout for a single nmap run, in seconds
    #[arg(long, global = true, default_value_t = NMAP_TIMEOUT_SECS)]
    pub nmap_timeout: u64,

    /// Timeout for version detection HTTP probes, in seconds
    #[arg(long, global = true, default_value_t = VERSION_HTTP_TIMEOUT_SECS)]
    pub http_timeout: u64,

    /// NVD CVE API endpoint
    #[arg(long, global = true, default_value = NVD_BASE_URL)]
    pub nvd_url: String,

    /// NVD API key
    #[arg(long, global = true, env = "NVD_API_KEY", hide_env_values = true)]
    pub nvd_api_key: Option<String>,

    /// CVEs requested per keyword
    #[arg(long, global = true, default_value_t = CVE_MAX_RESULTS)]
    pub cve_max_results: usize,

    /// Hosts processed concurrently within one phase
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Port range for the ports phase
    #[arg(long, global = true, default_value = DEFAULT_PORT_RANGE)]
    pub port_range: String,

    /// Action to perform
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run discover, ports, version+cve and os phases in order
    Scan {
        /// Host IP; the /24 around it is scanned
        #[arg(long)]
        ip: Option<String>,
        /// Explicit subnet (overrides --ip)
        #[arg(long)]
        subnet: Option<String>,
    },
    /// Run host discovery only and print the working set
    Discover {
        /// Host IP; the /24 around it is scanned
        #[arg(long)]
        ip: Option<String>,
        /// Explicit subnet (overrides --ip)
        #[arg(long)]
        subnet: Option<String>,
    },
    /// Serve the scan trigger HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to bind
        #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
        port: u16,
    },
    /// Print stored devices
    Devices {
        /// Only this IP
        #[arg(long)]
        ip: Option<String>,
    },
    /// Print the scan result log
    History {
        /// Filter by scan type (discover, ports, ports_single, ...)
        #[arg(long = "type")]
        scan_type: Option<String>,
    },
    /// Print stored CVE lookups
    Cves {
        /// Filter by device IP
        #[arg(long, conflicts_with = "service")]
        ip: Option<String>,
        /// Filter by keyword/service
        #[arg(long)]
        service: Option<String>,
    },
}

impl Opt {
    /// Builds the library configuration from parsed options.
    pub fn to_config(&self) -> Config {
        Config {
            db_path: self.db_path.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            nmap_path: self.nmap_path.clone(),
            nmap_timeout_seconds: self.nmap_timeout,
            http_timeout_seconds: self.http_timeout,
            nvd_url: self.nvd_url.clone(),
            nvd_api_key: self.nvd_api_key.clone(),
            cve_max_results: self.cve_max_results,
            max_concurrency: self.max_concurrency,
            port_range: self.port_range.clone(),
        }
    }
}
