//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `iot_scan` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Printing results as JSON
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use iot_scan::initialization::init_logger_with;
use iot_scan::models::ScanType;
use iot_scan::storage::{
    cve_records_by_ip, cve_records_by_service, find_device_by_ip, list_devices, query_scan_results,
};
use iot_scan::{
    init_orchestrator, run_pipeline, start_server, subnet_for, Command, Opt, ScanSession,
    ServerState,
};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", text);
    Ok(())
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing in-flight hosts");
            token.cancel();
        }
    });
}

async fn run(opt: Opt) -> Result<()> {
    let config = opt.to_config();
    let orchestrator = init_orchestrator(&config).await?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match opt.command {
        Command::Scan { ip, subnet } => {
            let subnet = subnet_for(ip.as_deref(), subnet.as_deref());
            let report = run_pipeline(&orchestrator, &subnet, &cancel).await;
            print_json(&report)?;
            if report.cancelled() {
                bail!("scan of {} was interrupted", subnet);
            }
        }
        Command::Discover { ip, subnet } => {
            let subnet = subnet_for(ip.as_deref(), subnet.as_deref());
            let report = orchestrator
                .discover(&ScanSession::new(), &subnet, &cancel)
                .await;
            print_json(&report)?;
        }
        Command::Serve { bind, port } => {
            start_server(&bind, port, ServerState::new(orchestrator, cancel)).await?;
        }
        Command::Devices { ip: Some(ip) } => {
            match find_device_by_ip(orchestrator.pool(), &ip).await? {
                Some(device) => print_json(&device)?,
                None => bail!("no device with ip {}", ip),
            }
        }
        Command::Devices { ip: None } => {
            print_json(&list_devices(orchestrator.pool()).await?)?;
        }
        Command::History { scan_type } => {
            let scan_type = scan_type
                .map(|t| ScanType::from_str(&t).with_context(|| format!("unknown scan type '{}'", t)))
                .transpose()?;
            print_json(&query_scan_results(orchestrator.pool(), scan_type).await?)?;
        }
        Command::Cves { ip, service } => {
            let records = match (ip, service) {
                (Some(ip), _) => cve_records_by_ip(orchestrator.pool(), &ip).await?,
                (None, Some(service)) => cve_records_by_service(orchestrator.pool(), &service).await?,
                (None, None) => bail!("pass --ip or --service"),
            };
            print_json(&records)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // This allows setting NVD_API_KEY in .env without exporting it manually
    if dotenvy::dotenv().is_err() {
        // If .env not found in current dir, try next to the executable
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run(opt).await {
        eprintln!("iot_scan error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
