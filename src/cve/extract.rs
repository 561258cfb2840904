//! Normalization and CVSS extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::types::CveEntry;

/// Metric blocks in descending order of preference.
const METRIC_KEYS: [&str; 3] = ["cvssMetricV31", "cvssMetricV30", "cvssMetricV2"];

static DESCRIPTION_SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)CVSS\s*v3(?:\.\d)?\b.*?\b(\d{1,2}\.\d)\b")
        .expect("description score regex is valid")
});

#[derive(Debug, Default, Deserialize)]
struct LangString {
    #[serde(default)]
    lang: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Reference {
    url: Option<String>,
}

/// Builds a normalized entry from a raw database record.
///
/// Picks the first English description, else the first description, else an
/// empty string. Metrics and reference URLs are passed through.
pub fn normalize_cve(raw: Value) -> CveEntry {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let descriptions: Vec<LangString> = raw
        .get("descriptions")
        .cloned()
        .and_then(|d| serde_json::from_value(d).ok())
        .unwrap_or_default();
    let description = descriptions
        .iter()
        .find(|d| d.lang.eq_ignore_ascii_case("en"))
        .or_else(|| descriptions.first())
        .map(|d| d.value.clone())
        .unwrap_or_default();

    let metrics = raw
        .get("metrics")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));

    let references: Vec<String> = raw
        .get("references")
        .cloned()
        .and_then(|r| serde_json::from_value::<Vec<Reference>>(r).ok())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| r.url)
        .collect();

    CveEntry {
        id,
        description,
        metrics,
        references,
        raw,
        cvss: None,
        severity: None,
    }
}

/// Extracts the base score, preferring CVSS v3.1, then v3.0, then v2.
///
/// Each metric block may be a single object or a list (first element used).
/// Falls back to a `CVSS v3 ... <score>` mention in the description. Returns
/// `None` when nothing is found; callers must not read that as 0.0.
pub fn extract_cvss(entry: &CveEntry) -> Option<f64> {
    for key in METRIC_KEYS {
        let Some(block) = entry.metrics.get(key) else {
            continue;
        };
        let first = match block {
            Value::Array(items) => items.first(),
            Value::Object(_) => Some(block),
            _ => None,
        };
        if let Some(score) = first.and_then(base_score) {
            return Some(score);
        }
    }

    DESCRIPTION_SCORE
        .captures(&entry.description)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|score| (0.0..=10.0).contains(score))
}

fn base_score(metric: &Value) -> Option<f64> {
    metric
        .get("cvssData")
        .and_then(|data| data.get("baseScore"))
        .and_then(as_score)
        .or_else(|| metric.get("baseScore").and_then(as_score))
}

fn as_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.filter(|s| s.is_finite())
}
