// SPDX-License-Identifier: GPL-3.0-only

//! nvme-inspect: NVMe drive health and self-test tool
//!
//! Reads identify data, SMART / health, error and self-test logs through
//! nvme-cli and prints an evaluated report per device.
//!
//! Usage:
//!   nvme-inspect [DEVICE...] [--json] [--self-test short|long|extended]

mod args;
mod config;
mod logging;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use nvme_contracts::{NvmeError, RecordSource};
use nvme_health::{InspectConfig, PollOptions, SelfTestOutcome, inspect, start_self_test};
use nvme_sys::NvmeCli;
use nvme_types::SelfTestKind;
use tracing::{error, info, warn};

use crate::args::Args;
use crate::config::Config;
use crate::render::{DeviceReport, ErrorReport, Report, TextReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(entries) = args.error_entries {
        config.error_log.max_entries = entries.max(1);
    }

    logging::init(&config.logging);

    if unsafe { libc::geteuid() } != 0 {
        warn!("Not running as root; most NVMe log pages will be unreadable");
    }

    let cli = NvmeCli::new().context("Cannot inspect NVMe devices")?;
    info!("Using {}", cli.binary_path().display());

    let devices = if args.devices.is_empty() {
        let found = cli
            .list_devices()
            .await
            .context("Failed to enumerate NVMe devices")?;
        info!("Detected {} NVMe device(s)", found.len());
        found.into_iter().map(|d| d.device).collect()
    } else {
        args.devices.clone()
    };

    let source: Arc<dyn RecordSource> = Arc::new(cli);
    let inspect_config = config.inspect();

    let mut reports = Vec::with_capacity(devices.len());
    for device in &devices {
        reports.push(inspect_device(device, &inspect_config, &args, &source).await);
    }

    let report = Report::new(reports);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", TextReport(&report));
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

async fn inspect_device(
    device: &str,
    config: &InspectConfig,
    args: &Args,
    source: &Arc<dyn RecordSource>,
) -> DeviceReport {
    let snapshot = match inspect(&config.context(device), &**source).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("{device}: {e}");
            return DeviceReport::failed(device, &e);
        }
    };

    let Some(kind) = args.self_test else {
        return DeviceReport::inspected(snapshot);
    };

    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.self_test.timeout_for(kind, &snapshot.identity));

    match run_self_test(
        Arc::clone(source),
        device,
        kind,
        timeout,
        config.self_test.poll_options(),
    )
    .await
    {
        Ok(outcome) => {
            let snapshot = snapshot.with_self_test(outcome.record.clone());
            let mut report = DeviceReport::inspected(snapshot);
            report.self_test = Some(outcome);
            report
        }
        Err(e) => {
            error!("{device}: self-test not started: {e}");
            let mut report = DeviceReport::inspected(snapshot);
            report.error = Some(ErrorReport::from(&e));
            report
        }
    }
}

/// Drive one self-test to completion, aborting it on Ctrl-C
async fn run_self_test(
    source: Arc<dyn RecordSource>,
    device: &str,
    kind: SelfTestKind,
    timeout: Duration,
    options: PollOptions,
) -> Result<SelfTestOutcome, NvmeError> {
    info!(
        "Starting {kind} self-test on {device} (timeout {}s)",
        timeout.as_secs()
    );
    let handle = start_self_test(source, device, kind, timeout, options).await?;
    info!("{device}: self-test {} requested", handle.id());

    let token = handle.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting self-test");
            token.cancel();
        }
    });

    let outcome = handle.run().await;
    interrupt.abort();

    info!("{device}: self-test {}", outcome.state);
    Ok(outcome)
}
