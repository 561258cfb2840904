//! Pure extractors for the three version detection strategies.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::VersionInfo;

static BODY_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(firmware|version)[:\s]+([\w.\-]+)").expect("body version regex is valid")
});

// Anchored: only a header that starts with `product/version` counts.
static SERVER_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w\-]+)[/ ]([\w.\-]+)").expect("server header regex is valid")
});

static BANNER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+/tcp\s+open\s+\w+\s+([\w\-]+)[^\d]*(\d[\w.\-]+)")
        .expect("banner regex is valid")
});

/// Product reported when only a status page revealed the version.
pub const BODY_PRODUCT: &str = "UnknownDevice";
/// Product reported for a version read from the `Server` header.
pub const HEADER_PRODUCT: &str = "Webserver";
/// Product reported for a version read from a banner scan.
pub const BANNER_PRODUCT: &str = "Service";

/// Finds `firmware: X` or `version X` in a status page body.
pub fn parse_body_version(body: &str) -> Option<VersionInfo> {
    let caps = BODY_VERSION.captures(body)?;
    Some(VersionInfo {
        vendor: None,
        product: BODY_PRODUCT.to_string(),
        version: caps[2].to_string(),
    })
}

/// Splits a `Server` header such as `lighttpd/1.4.59`.
pub fn parse_server_header(server: &str) -> Option<VersionInfo> {
    let caps = SERVER_HEADER.captures(server)?;
    Some(VersionInfo {
        vendor: Some(caps[1].to_string()),
        product: HEADER_PRODUCT.to_string(),
        version: caps[2].to_string(),
    })
}

/// Reads product and version from nmap's plain-text port table.
pub fn parse_banner(output: &str) -> Option<VersionInfo> {
    let caps = BANNER_LINE.captures(output)?;
    Some(VersionInfo {
        vendor: Some(caps[1].to_string()),
        product: BANNER_PRODUCT.to_string(),
        version: caps[2].to_string(),
    })
}
