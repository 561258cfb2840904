//! HTTP request handlers for the trigger server.

mod records;
mod scan;

pub use records::{
    cves_by_ip_handler, cves_by_service_handler, device_handler, devices_handler, scans_handler,
};
pub use scan::{discover_get, discover_post, os_handler, ports_handler, version_handler};
