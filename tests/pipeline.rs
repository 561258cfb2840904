//! End-to-end phase tests over scripted probes and an in-memory database.

mod helpers;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use helpers::{
    create_test_pool, iot_host, orchestrator, orchestrator_with_pool, FakeCveDatabase, FakeNetwork,
};
use iot_scan::models::{DiscoveredHost, ScanType};
use iot_scan::risk::DeviceStatus;
use iot_scan::scan::ScanSession;
use iot_scan::storage::{
    cve_records_by_ip, cve_records_by_service, find_device_by_ip, list_devices, query_scan_results,
};
use iot_scan::run_pipeline;

const CAMERA: &str = "192.0.2.5";

fn camera_network() -> FakeNetwork {
    FakeNetwork::default()
        .with_subnet("192.0.2.0/24", vec![iot_host(CAMERA)])
        .with_ports(CAMERA, &[23])
        .with_banner(CAMERA, "80/tcp open  http    lighttpd 1.4.59")
        .with_os(CAMERA, "Linux 4.15", 96)
}

#[tokio::test]
async fn test_full_pipeline_scores_critical_device() {
    let cves = FakeCveDatabase::default().with_cve("lighttpd", "CVE-2022-41556", 9.5);
    let orchestrator = orchestrator(camera_network(), cves).await;

    let report = run_pipeline(&orchestrator, "192.0.2.0/24", &CancellationToken::new()).await;

    assert_eq!(report.discover.iot_hosts, vec![CAMERA.to_string()]);
    assert_eq!(report.failed_hosts(), 0);
    assert!(!report.cancelled());
    assert!(report.ports.results[0].suspicious);

    let version = &report.version_cve.results[0];
    let info = version.version_info.as_ref().expect("banner should yield a version");
    assert_eq!(info.vendor.as_deref(), Some("lighttpd"));
    assert_eq!(info.version, "1.4.59");
    assert_eq!(version.max_cvss, 9.5);

    let device = find_device_by_ip(orchestrator.pool(), CAMERA)
        .await
        .expect("query")
        .expect("device stored");
    assert_eq!(device.open_ports.len(), 1);
    assert_eq!(device.open_ports[0].port, 23);
    assert!(device.suspicious);
    assert_eq!(device.firmware.as_deref(), Some("1.4.59"));
    assert_eq!(device.cve_summary.max_cvss, 9.5);
    assert_eq!(device.cve_summary.vuln_count, 1);
    assert_eq!(device.risk_score, 100);
    assert_eq!(device.status, DeviceStatus::VulnerableCritical);
    assert_eq!(device.os_fingerprint.len(), 1);
    assert_eq!(device.os_fingerprint[0].name, "Linux 4.15");
    assert_eq!(device.network_info.mac.as_deref(), Some("00:11:22:33:44:55"));

    let lighttpd = cve_records_by_service(orchestrator.pool(), "lighttpd")
        .await
        .expect("query");
    assert_eq!(lighttpd.len(), 1);
    assert_eq!(lighttpd[0].ip, CAMERA);
    assert!(!cve_records_by_ip(orchestrator.pool(), CAMERA)
        .await
        .expect("query")
        .is_empty());
}

#[tokio::test]
async fn test_pipeline_fills_scan_log() {
    let orchestrator = orchestrator(camera_network(), FakeCveDatabase::default()).await;
    run_pipeline(&orchestrator, "192.0.2.0/24", &CancellationToken::new()).await;

    let pool = orchestrator.pool();
    let all = query_scan_results(pool, None).await.expect("query");
    assert_eq!(all.len(), 7);
    assert_eq!(all[0].scan_type, ScanType::Os);

    for scan_type in [
        ScanType::Discover,
        ScanType::Ports,
        ScanType::PortsSingle,
        ScanType::VersionCve,
        ScanType::VersionCveSingle,
        ScanType::Os,
        ScanType::OsSingle,
    ] {
        let entries = query_scan_results(pool, Some(scan_type)).await.expect("query");
        assert_eq!(entries.len(), 1, "{scan_type} entries");
    }

    let discover = query_scan_results(pool, Some(ScanType::Discover))
        .await
        .expect("query");
    assert_eq!(discover[0].data["subnet"], "192.0.2.0/24");
    assert_eq!(discover[0].data["result"]["iot_hosts"][0], CAMERA);
}

#[tokio::test]
async fn test_discover_replaces_working_set() {
    let network = FakeNetwork::default()
        .with_subnet("198.51.100.0/24", vec![iot_host("198.51.100.7")])
        .with_subnet("203.0.113.0/24", vec![iot_host("203.0.113.9")]);
    let orchestrator = orchestrator(network, FakeCveDatabase::default()).await;
    let session = ScanSession::new();
    let cancel = CancellationToken::new();

    orchestrator.discover(&session, "198.51.100.0/24", &cancel).await;
    orchestrator.discover(&session, "203.0.113.0/24", &cancel).await;

    let targets: Vec<_> = session.iot_targets().await.into_iter().map(|t| t.ip).collect();
    assert_eq!(targets, vec!["203.0.113.9".to_string()]);

    let ports = orchestrator.ports(&session, &cancel).await;
    assert_eq!(ports.results.len(), 1);
    assert_eq!(ports.results[0].ip, "203.0.113.9");
}

#[tokio::test]
async fn test_non_iot_hosts_are_not_targets() {
    let network = FakeNetwork::default()
        .with_subnet(
            "192.0.2.0/28",
            vec![DiscoveredHost::new("192.0.2.1"), DiscoveredHost::new("192.0.2.2")],
        )
        .with_ports("192.0.2.2", &[1883]);
    let orchestrator = orchestrator(network, FakeCveDatabase::default()).await;

    let report = orchestrator
        .discover(&ScanSession::new(), "192.0.2.0/28", &CancellationToken::new())
        .await;

    assert_eq!(report.alive_hosts.len(), 2);
    assert_eq!(report.iot_hosts, vec!["192.0.2.2".to_string()]);
}

#[tokio::test]
async fn test_port_failure_is_isolated_per_host() {
    let network = FakeNetwork::default()
        .with_ports("192.0.2.5", &[80, 443])
        .with_failing_ports("192.0.2.6");
    let orchestrator = orchestrator(network, FakeCveDatabase::default()).await;
    let session = ScanSession::with_iot_hosts(vec![iot_host("192.0.2.5"), iot_host("192.0.2.6")]);

    let report = orchestrator.ports(&session, &CancellationToken::new()).await;

    assert_eq!(report.results.len(), 2);
    let ok = &report.results[0];
    assert_eq!(ok.ip, "192.0.2.5");
    assert!(ok.error.is_none());
    assert_eq!(ok.open_ports.len(), 2);

    let failed = &report.results[1];
    assert_eq!(failed.ip, "192.0.2.6");
    assert!(failed.error.as_deref().unwrap_or_default().contains("dropped probes"));
    assert!(failed.open_ports.is_empty());

    let devices = list_devices(orchestrator.pool()).await.expect("query");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].network_info.ip, "192.0.2.5");
    assert_eq!(devices[0].risk_score, 4);
}

#[tokio::test]
async fn test_database_failure_is_reported_inline() {
    let network = FakeNetwork::default().with_ports(CAMERA, &[80]);
    let orchestrator = orchestrator(network, FakeCveDatabase::default()).await;
    let session = ScanSession::with_iot_hosts(vec![iot_host(CAMERA)]);
    orchestrator.pool().close().await;

    let report = orchestrator.ports(&session, &CancellationToken::new()).await;

    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert!(result.error.is_none());
    assert_eq!(result.open_ports.len(), 1);
    assert!(result.db_error.is_some());
}

#[tokio::test]
async fn test_cancelled_phase_starts_no_hosts() {
    let orchestrator = orchestrator(camera_network(), FakeCveDatabase::default()).await;
    let session = ScanSession::with_iot_hosts(vec![iot_host(CAMERA), iot_host("192.0.2.6")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = orchestrator.ports(&session, &cancel).await;

    assert!(report.results.is_empty());
    assert!(report.cancelled);
    assert!(find_device_by_ip(orchestrator.pool(), CAMERA)
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
async fn test_cancelled_pipeline_keeps_previous_working_set() {
    let orchestrator = orchestrator(camera_network(), FakeCveDatabase::default()).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_pipeline(&orchestrator, "192.0.2.0/24", &cancel).await;

    assert!(report.discover.cancelled);
    assert!(report.cancelled());
    assert!(report.discover.alive_hosts.is_empty());
    assert!(list_devices(orchestrator.pool()).await.expect("query").is_empty());
}

#[tokio::test]
async fn test_os_phase_preserves_other_sub_documents() {
    let cves = FakeCveDatabase::default().with_cve("lighttpd", "CVE-2022-41556", 7.5);
    let orchestrator = orchestrator(camera_network(), cves).await;
    let session = ScanSession::with_iot_hosts(vec![iot_host(CAMERA)]);
    let cancel = CancellationToken::new();

    orchestrator.ports(&session, &cancel).await;
    orchestrator.version_cve(&session, &cancel).await;
    let before = find_device_by_ip(orchestrator.pool(), CAMERA)
        .await
        .expect("query")
        .expect("device stored");
    assert!(before.os_fingerprint.is_empty());

    orchestrator.os(&session, &cancel).await;
    let after = find_device_by_ip(orchestrator.pool(), CAMERA)
        .await
        .expect("query")
        .expect("device stored");

    assert_eq!(after.open_ports, before.open_ports);
    assert_eq!(after.cve_summary, before.cve_summary);
    assert_eq!(after.firmware, before.firmware);
    assert_eq!(after.risk_score, before.risk_score);
    assert_eq!(after.status, DeviceStatus::VulnerableHigh);
    assert_eq!(after.created_at_ms, before.created_at_ms);
    assert_eq!(after.os_fingerprint[0].accuracy, 96);
}

#[tokio::test]
async fn test_cve_lookup_failure_is_kept_as_marker() {
    let cves = FakeCveDatabase::default()
        .with_failure("lighttpd")
        .with_cve("Service", "CVE-2020-0001", 4.3);
    let orchestrator = orchestrator(camera_network(), cves).await;
    let session = ScanSession::with_iot_hosts(vec![iot_host(CAMERA)]);

    let report = orchestrator
        .version_cve(&session, &CancellationToken::new())
        .await;

    let result = &report.results[0];
    assert_eq!(result.max_cvss, 4.3);
    assert!(result.cve_results["lighttpd"][0].is_error());
    assert_eq!(result.summary.detected_services_count, 2);

    let device = find_device_by_ip(orchestrator.pool(), CAMERA)
        .await
        .expect("query")
        .expect("device stored");
    assert_eq!(device.cve_summary.vuln_count, 1);
    assert_eq!(device.status, DeviceStatus::Active);
}

#[tokio::test]
async fn test_failed_lookups_keep_stored_cve_details() {
    let pool = Arc::new(create_test_pool().await);
    let session = ScanSession::with_iot_hosts(vec![iot_host(CAMERA)]);
    let cancel = CancellationToken::new();

    let healthy = FakeCveDatabase::default().with_cve("lighttpd", "CVE-2022-41556", 9.5);
    orchestrator_with_pool(camera_network(), healthy, Arc::clone(&pool))
        .version_cve(&session, &cancel)
        .await;
    let before = find_device_by_ip(&pool, CAMERA)
        .await
        .expect("query")
        .expect("device stored");
    assert_eq!(before.status, DeviceStatus::VulnerableCritical);

    let outage = FakeCveDatabase::default()
        .with_failure("lighttpd")
        .with_failure("Service");
    let report = orchestrator_with_pool(camera_network(), outage, Arc::clone(&pool))
        .version_cve(&session, &cancel)
        .await;
    let result = &report.results[0];
    assert!(!result.cve_results.is_empty());
    assert!(result.cve_results.values().flatten().all(|l| l.is_error()));
    assert!(result.db_error.is_none());

    let after = find_device_by_ip(&pool, CAMERA)
        .await
        .expect("query")
        .expect("device stored");
    assert_eq!(after.cve_summary, before.cve_summary);
    assert_eq!(after.cve_summary.max_cvss, 9.5);
    assert_eq!(after.firmware, before.firmware);
    assert_eq!(after.status, DeviceStatus::VulnerableCritical);
    assert_eq!(after.risk_score, before.risk_score);
}
