// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

use nvme_types::SelfTestKind;

use crate::NvmeError;

/// Raw structured payload as emitted by the diagnostic utility
pub type RawRecord = serde_json::Value;

/// Supplies raw diagnostic records for a named device.
///
/// Implementations fail with `SourceUnavailable` when the utility is missing
/// or not permitted to run, and with `DeviceNotFound` for unknown devices.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn identity(&self, device: &str) -> Result<RawRecord, NvmeError>;

    async fn firmware_slots(&self, device: &str) -> Result<RawRecord, NvmeError>;

    async fn health_log(&self, device: &str) -> Result<RawRecord, NvmeError>;

    async fn error_log(&self, device: &str, max_entries: usize) -> Result<RawRecord, NvmeError>;

    async fn self_test_log(&self, device: &str) -> Result<RawRecord, NvmeError>;

    async fn start_self_test(&self, device: &str, kind: SelfTestKind) -> Result<(), NvmeError>;

    async fn abort_self_test(&self, device: &str) -> Result<(), NvmeError>;
}
