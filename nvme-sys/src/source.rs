// SPDX-License-Identifier: GPL-3.0-only

//! `RecordSource` backed by nvme-cli

use std::path::Path;

use async_trait::async_trait;
use nvme_contracts::{NvmeError, RawRecord, RecordSource};
use nvme_types::SelfTestKind;
use tracing::info;

use crate::cli::NvmeCli;
use crate::error::SysError;

/// Self-test code that aborts the running device self-test
const ABORT_SELF_TEST_CODE: &str = "0xf";

impl NvmeCli {
    async fn read_record(&self, subcommand: &str, device: &str) -> Result<RawRecord, NvmeError> {
        ensure_device(device)?;
        Ok(self.run_json(&[subcommand, device, "-o", "json"]).await?)
    }
}

fn ensure_device(device: &str) -> Result<(), SysError> {
    if device.is_empty() || (device.starts_with("/dev/") && !Path::new(device).exists()) {
        return Err(SysError::DeviceNotFound(device.to_string()));
    }
    Ok(())
}

#[async_trait]
impl RecordSource for NvmeCli {
    async fn identity(&self, device: &str) -> Result<RawRecord, NvmeError> {
        self.read_record("id-ctrl", device).await
    }

    async fn firmware_slots(&self, device: &str) -> Result<RawRecord, NvmeError> {
        self.read_record("fw-log", device).await
    }

    async fn health_log(&self, device: &str) -> Result<RawRecord, NvmeError> {
        self.read_record("smart-log", device).await
    }

    async fn error_log(&self, device: &str, max_entries: usize) -> Result<RawRecord, NvmeError> {
        ensure_device(device)?;
        let entries = max_entries.max(1).to_string();
        Ok(self
            .run_json(&["error-log", device, "-e", &entries, "-o", "json"])
            .await?)
    }

    async fn self_test_log(&self, device: &str) -> Result<RawRecord, NvmeError> {
        self.read_record("self-test-log", device).await
    }

    async fn start_self_test(&self, device: &str, kind: SelfTestKind) -> Result<(), NvmeError> {
        if kind == SelfTestKind::VendorSpecific {
            return Err(NvmeError::UnsupportedTestType {
                requested: kind.to_string(),
            });
        }

        ensure_device(device)?;
        let code = kind.code().to_string();
        info!("Starting {kind} self-test on {device}");
        self.run(&["device-self-test", device, "-s", &code]).await?;
        Ok(())
    }

    async fn abort_self_test(&self, device: &str) -> Result<(), NvmeError> {
        ensure_device(device)?;
        info!("Aborting self-test on {device}");
        self.run(&["device-self-test", device, "-s", ABORT_SELF_TEST_CODE])
            .await?;
        Ok(())
    }
}
