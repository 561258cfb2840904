//! CVSS severity bands.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Qualitative CVSS v3 severity.
///
/// `Unknown` means no score was available; `None` means a real score below 0.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

/// Maps a score to its band. Thresholds are inclusive lower bounds.
pub fn severity_label(score: Option<f64>) -> Severity {
    let Some(score) = score.filter(|s| !s.is_nan()) else {
        return Severity::Unknown;
    };

    if score >= 9.0 {
        Severity::Critical
    } else if score >= 7.0 {
        Severity::High
    } else if score >= 4.0 {
        Severity::Medium
    } else if score >= 0.1 {
        Severity::Low
    } else {
        Severity::None
    }
}
