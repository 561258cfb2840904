//! CVE entry types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::severity::Severity;

/// A CVE record normalized from the vulnerability database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveEntry {
    pub id: String,
    pub description: String,
    /// Source-specific metric blocks, passed through untouched.
    #[serde(default)]
    pub metrics: Value,
    #[serde(default)]
    pub references: Vec<String>,
    /// The record exactly as the database returned it.
    #[serde(default)]
    pub raw: Value,
    /// Extracted base score; absent until enrichment, and absent when the
    /// record carries no score at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Sentinel entry returned in place of results when a lookup fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupError {
    pub error: String,
}

/// One element of a keyword lookup result.
///
/// A failed lookup is a one-element list holding `Error`, so batch callers keep
/// going with the next keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CveLookup {
    Error(LookupError),
    Entry(CveEntry),
}

impl CveLookup {
    pub fn error(message: impl Into<String>) -> Self {
        CveLookup::Error(LookupError {
            error: message.into(),
        })
    }

    pub fn entry(&self) -> Option<&CveEntry> {
        match self {
            CveLookup::Entry(entry) => Some(entry),
            CveLookup::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CveLookup::Error(_))
    }
}

/// Page shape of the NVD CVE API 2.0.
#[derive(Debug, Deserialize)]
pub(crate) struct NvdResponse {
    #[serde(default)]
    pub vulnerabilities: Vec<NvdItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NvdItem {
    #[serde(default)]
    pub cve: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_error_roundtrip_stays_error() {
        let marker = CveLookup::error("Failed to fetch CVEs: timeout");
        let json = serde_json::to_value(&marker).unwrap();
        assert_eq!(json, json!({"error": "Failed to fetch CVEs: timeout"}));
        let back: CveLookup = serde_json::from_value(json).unwrap();
        assert!(back.is_error());
    }

    #[test]
    fn test_entry_deserializes_as_entry() {
        let json = json!({
            "id": "CVE-2021-0001",
            "description": "x",
            "metrics": {},
            "references": [],
            "raw": {"id": "CVE-2021-0001"},
            "cvss": 5.0,
            "severity": "Medium"
        });
        let lookup: CveLookup = serde_json::from_value(json).unwrap();
        let entry = lookup.entry().expect("should be an entry");
        assert_eq!(entry.cvss, Some(5.0));
        assert_eq!(entry.severity, Some(Severity::Medium));
    }
}
