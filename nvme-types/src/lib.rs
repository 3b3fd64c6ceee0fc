// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for NVMe health inspection
//!
//! This crate defines the single source of truth for device health types.
//! These models are used throughout the stack:
//!
//! - **nvme-health**: Builds these types from raw nvme-cli records
//! - **nvme-inspect**: Renders them as text or serializes them as JSON
//!
//! Field names and enum strings form the JSON contract consumed by
//! downstream tooling and must stay stable across versions.

pub mod error_log;
pub mod health;
pub mod identity;
pub mod reading;
pub mod record;
pub mod snapshot;

pub use error_log::ErrorLogEntry;
pub use health::{
    CriticalWarning, EnduranceMetrics, HealthAssessment, HealthMetrics, HealthReason,
    HealthStatus, TemperatureSensor,
};
pub use identity::{DeviceIdentity, FirmwareSlot, TYPICAL_MAX_FIRMWARE_SLOTS};
pub use reading::Reading;
pub use record::{RecordIssue, RecordKind};
pub use self_test::{SelfTestKind, SelfTestLog, SelfTestRecord, SelfTestResult};
pub use snapshot::DeviceHealthSnapshot;
