// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot assembly
//!
//! [`inspect`] reads every record for one device and hands the raw results
//! to [`assemble`], which runs the normalize, evaluate and reconcile steps.

use nvme_contracts::{NvmeError, RawRecord, RecordSource};
use nvme_types::{
    DeviceHealthSnapshot, EnduranceMetrics, RecordIssue, RecordKind, SelfTestRecord,
};
use tracing::{debug, info, warn};

use crate::evaluate::{HealthThresholds, evaluate};
use crate::normalize::{
    Normalized, normalize_endurance, normalize_error_log, normalize_firmware_slots,
    normalize_health, normalize_identity, normalize_self_test_log,
};
use crate::reconcile::reconcile_error_log;

/// Error log entries requested when nothing else is configured
pub const DEFAULT_ERROR_LOG_ENTRIES: usize = 64;

/// Everything one inspection needs besides the source itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectContext {
    pub device: String,
    pub thresholds: HealthThresholds,
    pub error_log_entries: usize,
}

impl InspectContext {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            thresholds: HealthThresholds::default(),
            error_log_entries: DEFAULT_ERROR_LOG_ENTRIES,
        }
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_error_log_entries(mut self, entries: usize) -> Self {
        self.error_log_entries = entries;
        self
    }
}

/// Raw records as fetched, failures included
#[derive(Debug, Clone)]
pub struct SnapshotParts {
    pub identity: Result<RawRecord, NvmeError>,
    pub firmware_slots: Result<RawRecord, NvmeError>,
    pub health: Result<RawRecord, NvmeError>,
    pub error_log: Result<RawRecord, NvmeError>,
    pub self_test_log: Result<RawRecord, NvmeError>,
}

/// Build a snapshot from fetched records
///
/// Only identity and health are required. Every other record degrades to
/// empty or unknown and leaves an issue behind.
pub fn assemble(
    ctx: &InspectContext,
    parts: SnapshotParts,
) -> Result<DeviceHealthSnapshot, NvmeError> {
    let mut issues = Vec::new();

    let identity = required(
        ctx,
        "identity",
        parts
            .identity
            .and_then(|raw| normalize_identity(&ctx.device, &raw)),
        &mut issues,
    )?;

    let health_raw = parts.health;
    let health = required(
        ctx,
        "health log",
        health_raw.as_ref().map_err(Clone::clone).and_then(normalize_health),
        &mut issues,
    )?;

    let endurance = optional(
        RecordKind::Endurance,
        health_raw.and_then(|raw| normalize_endurance(&raw)),
        &mut issues,
    )
    .unwrap_or_else(EnduranceMetrics::default);

    let firmware_slots = optional(
        RecordKind::FirmwareSlots,
        parts
            .firmware_slots
            .and_then(|raw| normalize_firmware_slots(&raw)),
        &mut issues,
    )
    .unwrap_or_default();

    let error_log = optional(
        RecordKind::ErrorLog,
        parts.error_log.and_then(|raw| normalize_error_log(&raw)),
        &mut issues,
    )
    .map(|entries| reconcile_error_log(entries, ctx.error_log_entries))
    .unwrap_or_default();

    let self_test: Option<SelfTestRecord> = optional(
        RecordKind::SelfTestLog,
        parts
            .self_test_log
            .and_then(|raw| normalize_self_test_log(&raw)),
        &mut issues,
    )
    .and_then(|log| log.latest().cloned());

    let assessment = evaluate(&health, &ctx.thresholds);
    debug!(
        "{}: status {} with {} reasons, {} issues",
        ctx.device,
        assessment.status,
        assessment.reasons.len(),
        issues.len()
    );

    Ok(DeviceHealthSnapshot {
        identity,
        firmware_slots,
        health,
        endurance,
        status: assessment.status,
        status_reasons: assessment.reasons,
        error_log,
        self_test,
        issues,
    })
}

fn required<T>(
    ctx: &InspectContext,
    what: &str,
    result: Result<Normalized<T>, NvmeError>,
    issues: &mut Vec<RecordIssue>,
) -> Result<T, NvmeError> {
    match result {
        Ok(normalized) => {
            let (value, record_issues) = normalized.into_parts();
            issues.extend(record_issues);
            Ok(value)
        }
        Err(error) if error.is_fatal() => Err(error),
        Err(error) => {
            warn!("{}: {what} unusable: {error}", ctx.device);
            Err(NvmeError::IncompleteSnapshot {
                device: ctx.device.clone(),
                reason: format!("{what} unusable: {error}"),
            })
        }
    }
}

fn optional<T>(
    record: RecordKind,
    result: Result<Normalized<T>, NvmeError>,
    issues: &mut Vec<RecordIssue>,
) -> Option<T> {
    match result {
        Ok(normalized) => {
            let (value, record_issues) = normalized.into_parts();
            issues.extend(record_issues);
            Some(value)
        }
        Err(error) => {
            debug!("{record} record dropped: {error}");
            issues.push(issue_for(record, error));
            None
        }
    }
}

fn issue_for(record: RecordKind, error: NvmeError) -> RecordIssue {
    match error {
        NvmeError::MalformedRecord {
            record: malformed,
            field,
            reason,
        } => RecordIssue::field(malformed, field, reason),
        other => RecordIssue::record(record, other.to_string()),
    }
}

/// Fatal errors abort the inspection, anything else is kept for assembly
fn fetched(
    result: Result<RawRecord, NvmeError>,
) -> Result<Result<RawRecord, NvmeError>, NvmeError> {
    match result {
        Err(error) if error.is_fatal() => Err(error),
        other => Ok(other),
    }
}

/// Read, normalize and evaluate everything known about one device
pub async fn inspect(
    ctx: &InspectContext,
    source: &dyn RecordSource,
) -> Result<DeviceHealthSnapshot, NvmeError> {
    let device = ctx.device.as_str();
    info!("Inspecting {device}");

    let parts = SnapshotParts {
        identity: fetched(source.identity(device).await)?,
        firmware_slots: fetched(source.firmware_slots(device).await)?,
        health: fetched(source.health_log(device).await)?,
        error_log: fetched(source.error_log(device, ctx.error_log_entries).await)?,
        self_test_log: fetched(source.self_test_log(device).await)?,
    };

    let snapshot = assemble(ctx, parts)?;
    info!(
        "{device}: {} ({} {}), status {}",
        snapshot.identity.model,
        snapshot.identity.serial,
        snapshot.identity.firmware_revision,
        snapshot.status
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use nvme_types::HealthStatus;
    use serde_json::json;

    use super::*;

    fn parts() -> SnapshotParts {
        SnapshotParts {
            identity: Ok(json!({ "sn": "SN1", "mn": "Model", "fr": "1.0" })),
            firmware_slots: Ok(json!({
                "Active Firmware Slot (afi)": 1,
                "Firmware Rev Slot 1": "1.0"
            })),
            health: Ok(json!({
                "critical_warning": 0,
                "temperature": 313,
                "avail_spare": 100,
                "spare_thresh": 10,
                "percent_used": 1
            })),
            error_log: Ok(json!({ "errors": [
                { "error_count": 2, "sqid": 1 },
                { "error_count": 1, "sqid": 1 },
                { "error_count": 0 }
            ] })),
            self_test_log: Ok(json!({ "Current Device Self-Test Operation": 0 })),
        }
    }

    #[test]
    fn assembles_complete_snapshot() {
        let ctx = InspectContext::new("/dev/nvme0");
        let snapshot = assemble(&ctx, parts()).unwrap();

        assert_eq!(snapshot.device(), "/dev/nvme0");
        assert_eq!(snapshot.status, HealthStatus::Ok);
        assert_eq!(snapshot.active_firmware_slot().map(|s| s.slot), Some(1));
        assert_eq!(snapshot.error_log.len(), 2);
        assert!(snapshot.self_test.is_none());
        assert!(snapshot.issues.is_empty());
    }

    #[test]
    fn optional_records_degrade_with_issues() {
        let ctx = InspectContext::new("/dev/nvme0").with_error_log_entries(1);
        let mut parts = parts();
        parts.firmware_slots = Err(NvmeError::CommandFailed {
            command: "nvme fw-log".to_string(),
            stderr: "Invalid field in command".to_string(),
        });
        parts.self_test_log = Ok(json!("not a log"));

        let snapshot = assemble(&ctx, parts).unwrap();
        assert!(snapshot.firmware_slots.is_empty());
        assert_eq!(snapshot.error_log.len(), 1);
        assert_eq!(snapshot.issues.len(), 2);
        assert_eq!(snapshot.issues[0].record, RecordKind::FirmwareSlots);
        assert_eq!(snapshot.issues[1].record, RecordKind::SelfTestLog);
    }

    #[test]
    fn unusable_health_is_an_incomplete_snapshot() {
        let ctx = InspectContext::new("/dev/nvme0");
        let mut parts = parts();
        parts.health = Ok(json!({ "unrelated": true, "other": 1 }));

        let error = assemble(&ctx, parts).unwrap_err();
        assert!(matches!(error, NvmeError::IncompleteSnapshot { .. }));
    }

    #[test]
    fn missing_identity_is_an_incomplete_snapshot() {
        let ctx = InspectContext::new("/dev/nvme0");
        let mut parts = parts();
        parts.identity = Ok(json!({ "mn": "Model" }));

        let error = assemble(&ctx, parts).unwrap_err();
        assert!(matches!(error, NvmeError::IncompleteSnapshot { .. }));
    }
}
