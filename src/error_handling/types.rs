//! Error type definitions.
//!
//! This module defines the typed errors raised by initialization, storage, scan
//! probes and the vulnerability database client.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A stored value does not map back to a known enum variant.
    #[error("Invalid stored value for {column}: {value}")]
    InvalidValue {
        /// Column holding the value
        column: &'static str,
        /// Offending value
        value: String,
    },
}

/// Failures of the external scan tool.
///
/// Probe failures are always soft at the phase level: the orchestrator records
/// the message on the host result and moves on.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The scan tool could not be started.
    #[error("failed to run scan tool: {0}")]
    Spawn(#[from] std::io::Error),

    /// The scan tool ran past its deadline and was killed.
    #[error("scan tool timed out after {secs}s")]
    Timeout {
        /// Deadline that was exceeded
        secs: u64,
    },

    /// The scan tool exited unsuccessfully.
    #[error("scan tool exited with status {code:?}: {stderr}")]
    Exit {
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Trimmed standard error
        stderr: String,
    },

    /// The scan tool output could not be parsed.
    #[error("unparseable scan tool output: {0}")]
    Parse(String),
}

/// Failures talking to the vulnerability database.
#[derive(Error, Debug)]
pub enum CveError {
    /// Transport failure or non-2xx response.
    #[error("Failed to fetch CVEs: {0}")]
    Http(#[from] ReqwestError),

    /// The database refused to serve the lookup (rate limiting, bad key).
    #[error("Failed to fetch CVEs: {0}")]
    Unavailable(String),
}
