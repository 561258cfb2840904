//! CVE correlation.
//!
//! Keyword lookups against a vulnerability database, normalization of the
//! returned records, CVSS extraction and severity banding.

mod client;
mod extract;
mod severity;
mod types;

pub use client::{fetch_cves, NvdClient, VulnDatabase};
pub use extract::{extract_cvss, normalize_cve};
pub use severity::{severity_label, Severity};
pub use types::{CveEntry, CveLookup, LookupError};

/// Attaches `cvss` and `severity` to every entry and returns the highest score.
///
/// Error markers are kept as-is. Entries without a score keep `cvss: None`
/// (severity `Unknown`) and count as 0.0 toward the maximum.
pub fn enrich_lookups(lookups: Vec<CveLookup>) -> (Vec<CveLookup>, f64) {
    let mut max_cvss = 0.0_f64;
    let enriched = lookups
        .into_iter()
        .map(|lookup| match lookup {
            CveLookup::Entry(mut entry) => {
                let cvss = extract_cvss(&entry);
                entry.severity = Some(severity_label(cvss));
                entry.cvss = cvss;
                if let Some(score) = cvss.filter(|s| s.is_finite()) {
                    max_cvss = max_cvss.max(score);
                }
                CveLookup::Entry(entry)
            }
            marker @ CveLookup::Error(_) => marker,
        })
        .collect();
    (enriched, max_cvss)
}
