mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixtures::{self, DEVICE, SERIAL};
use common::source::ScriptedSource;
use nvme_contracts::{NvmeError, NvmeErrorKind, RecordSource};
use nvme_health::{InspectConfig, InspectContext, PollOptions, inspect, start_self_test};
use nvme_types::{HealthReason, HealthStatus, Reading, RecordKind, SelfTestKind, SelfTestResult};
use serde_json::json;

fn ctx() -> InspectContext {
    InspectContext::new(DEVICE)
}

#[tokio::test]
async fn healthy_device_snapshot() {
    let source = ScriptedSource::new();
    let snapshot = inspect(&ctx(), &source).await.unwrap();

    assert_eq!(snapshot.serial(), SERIAL);
    assert_eq!(snapshot.identity.model, "Samsung SSD 970 EVO Plus 1TB");
    assert_eq!(snapshot.status, HealthStatus::Ok);
    assert!(snapshot.status_reasons.is_empty());
    assert_eq!(snapshot.health.temperature_celsius, Reading::Known(38));
    assert_eq!(snapshot.endurance.temperature_sensors_celsius.len(), 2);
    assert_eq!(
        snapshot.active_firmware_slot().and_then(|s| s.revision.as_deref()),
        Some("2B2QEXM7")
    );
    assert_eq!(
        snapshot.error_log.iter().map(|e| e.error_count).collect::<Vec<_>>(),
        vec![3, 2]
    );
    assert_eq!(
        snapshot.self_test.as_ref().map(|t| t.result),
        Some(SelfTestResult::CompletedNoError)
    );
    assert!(snapshot.issues.is_empty());
}

#[tokio::test]
async fn assembly_is_deterministic() {
    let source = ScriptedSource::new();
    let first = inspect(&ctx(), &source).await.unwrap();
    let second = inspect(&ctx(), &source).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn missing_critical_warning_is_unknown() {
    let source = ScriptedSource::new()
        .with_health(Ok(fixtures::smart_log_with(json!({ "critical_warning": null }))));
    let snapshot = inspect(&ctx(), &source).await.unwrap();

    assert_eq!(snapshot.status, HealthStatus::Unknown);
    assert_eq!(
        snapshot.status_reasons,
        vec![HealthReason::MissingField {
            field: "critical_warning".to_string()
        }]
    );
}

#[tokio::test]
async fn spare_below_threshold_is_critical() {
    let source = ScriptedSource::new().with_health(Ok(fixtures::smart_log_with(json!({
        "avail_spare": 5,
        "spare_thresh": 10,
        "critical_warning": 0
    }))));
    let snapshot = inspect(&ctx(), &source).await.unwrap();

    assert_eq!(snapshot.status, HealthStatus::Critical);
}

#[tokio::test]
async fn configured_thresholds_reach_the_evaluator() {
    let mut config = InspectConfig::default();
    config.health.high_temp_threshold_c = 30;

    let source = ScriptedSource::new();
    let snapshot = inspect(&config.context(DEVICE), &source).await.unwrap();

    assert_eq!(snapshot.status, HealthStatus::Warning);
}

#[tokio::test]
async fn unreachable_source_is_fatal() {
    let source = ScriptedSource::new().with_health(Err(NvmeError::SourceUnavailable {
        reason: "nvme-cli not installed".to_string(),
    }));
    let error = inspect(&ctx(), &source).await.unwrap_err();
    assert_eq!(error.kind(), NvmeErrorKind::SourceUnavailable);

    let source = ScriptedSource::new().with_identity(vec![Err(NvmeError::DeviceNotFound {
        device: DEVICE.to_string(),
    })]);
    let error = inspect(&ctx(), &source).await.unwrap_err();
    assert_eq!(error.kind(), NvmeErrorKind::DeviceNotFound);
}

#[tokio::test]
async fn failed_optional_records_degrade() {
    let source = ScriptedSource::new()
        .with_error_log(Err(NvmeError::CommandFailed {
            command: "nvme error-log".to_string(),
            stderr: "NVMe status: Invalid Log Page".to_string(),
        }))
        .with_firmware_slots(Ok(json!({ "fw_log": "unsupported" })));
    let snapshot = inspect(&ctx(), &source).await.unwrap();

    assert_eq!(snapshot.status, HealthStatus::Ok);
    assert!(snapshot.error_log.is_empty());
    assert!(snapshot.firmware_slots.is_empty());
    let records: Vec<_> = snapshot.issues.iter().map(|i| i.record).collect();
    assert_eq!(records, vec![RecordKind::FirmwareSlots, RecordKind::ErrorLog]);
}

#[tokio::test]
async fn identity_without_serial_is_incomplete() {
    let source = ScriptedSource::new().with_identity(vec![Ok(json!({ "mn": "Model", "vid": 1 }))]);
    let error = inspect(&ctx(), &source).await.unwrap_err();
    assert_eq!(error.kind(), NvmeErrorKind::IncompleteSnapshot);
}

#[tokio::test]
async fn unknown_readings_serialize_as_null() {
    let source = ScriptedSource::new()
        .with_health(Ok(fixtures::smart_log_with(json!({ "media_errors": null }))));
    let snapshot = inspect(&ctx(), &source).await.unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(value["status"], "ok");
    assert_eq!(value["health"]["media_errors"], serde_json::Value::Null);
    assert_eq!(value["health"]["available_spare"], 100);
}

#[tokio::test(start_paused = true)]
async fn self_test_outcome_merges_into_snapshot() {
    let source = Arc::new(ScriptedSource::new().with_self_test_log(vec![
        Ok(fixtures::self_test_idle()),
        Ok(fixtures::self_test_idle()),
        Ok(fixtures::self_test_running(1, 60)),
        Ok(fixtures::self_test_finished(0)),
    ]));
    let snapshot = inspect(&ctx(), &*source).await.unwrap();

    let dyn_source: Arc<dyn RecordSource> = source.clone();
    let handle = start_self_test(
        dyn_source,
        DEVICE,
        SelfTestKind::Short,
        Duration::from_secs(600),
        PollOptions::default(),
    )
    .await
    .unwrap();
    let outcome = handle.run().await;

    let merged = snapshot.clone().with_self_test(outcome.record.clone());
    assert_eq!(merged.self_test, Some(outcome.record));
    assert_eq!(merged.status, snapshot.status);
    assert_eq!(merged.identity, snapshot.identity);
}
