//! Error handling.
//!
//! Errors are categorized by the layer that raises them:
//! - **Initialization**: logger and HTTP client setup
//! - **Database**: SQLite/sqlx and JSON column failures
//! - **Probe**: the external scan tool (always soft at the phase level)
//! - **CVE**: the vulnerability database (converted into an inline marker)

mod types;

// Re-export public API
pub use types::{CveError, DatabaseError, InitializationError, ProbeError};
