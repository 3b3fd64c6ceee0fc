// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use clap::Parser;
use nvme_types::SelfTestKind;

use crate::config::LoggingLevel;

#[derive(Debug, Parser)]
#[command(name = "nvme-inspect")]
#[command(version, about = "Inspect NVMe drive health, error logs and self-tests")]
pub struct Args {
    /// Devices to inspect (e.g. /dev/nvme0); all NVMe devices when omitted
    pub devices: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Run a device self-test after inspection: short, long or extended
    #[arg(long, value_name = "KIND", value_parser = parse_test_kind)]
    pub self_test: Option<SelfTestKind>,

    /// Self-test timeout in seconds; derived from the controller when omitted
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of error log entries to report
    #[arg(long, value_name = "N")]
    pub error_entries: Option<usize>,

    /// Configuration file (default: $XDG_CONFIG_HOME/nvme-inspect/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log verbosity; RUST_LOG takes precedence
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LoggingLevel>,
}

fn parse_test_kind(value: &str) -> Result<SelfTestKind, String> {
    match SelfTestKind::parse(value) {
        Some(SelfTestKind::VendorSpecific) | None => Err(format!(
            "unsupported self-test '{value}', expected short, long or extended"
        )),
        Some(kind) => Ok(kind),
    }
}
