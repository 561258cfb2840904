// storage/mod.rs
// Database operations module

pub mod cve_records;
pub mod device;
pub mod migrations;
pub mod pool;
pub mod scan_log;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use cve_records::{cve_records_by_ip, cve_records_by_service, save_cve_records, CveRecord};
pub use device::{
    find_device_by_ip, list_devices, merge_device, upsert_device, CveDetails, CveSummary, Device,
    DevicePatch, PortsPatch, VersionPatch,
};
pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
pub use scan_log::{append_scan_result, query_scan_results, ScanResult};
