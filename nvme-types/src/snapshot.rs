// SPDX-License-Identifier: GPL-3.0-only

//! Point-in-time device health snapshot

use serde::{Deserialize, Serialize};

use crate::{
    DeviceIdentity, EnduranceMetrics, ErrorLogEntry, FirmwareSlot, HealthMetrics, HealthReason,
    HealthStatus, RecordIssue, SelfTestRecord,
};

/// Everything known about one device at inspection time
///
/// Built once per inspection and never mutated afterwards; merging a
/// self-test outcome yields a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHealthSnapshot {
    pub identity: DeviceIdentity,

    /// Firmware slots in slot order; empty when the log was unavailable
    #[serde(default)]
    pub firmware_slots: Vec<FirmwareSlot>,

    pub health: HealthMetrics,

    pub endurance: EnduranceMetrics,

    /// Derived status
    pub status: HealthStatus,

    #[serde(default)]
    pub status_reasons: Vec<HealthReason>,

    /// Reconciled error log, most recent first
    #[serde(default)]
    pub error_log: Vec<ErrorLogEntry>,

    /// Running or most recent self-test
    pub self_test: Option<SelfTestRecord>,

    /// Fields and records that degraded to unknown
    #[serde(default)]
    pub issues: Vec<RecordIssue>,
}

impl DeviceHealthSnapshot {
    pub fn device(&self) -> &str {
        &self.identity.device
    }

    pub fn serial(&self) -> &str {
        &self.identity.serial
    }

    /// Firmware slot currently running, if the log identifies one
    pub fn active_firmware_slot(&self) -> Option<&FirmwareSlot> {
        self.firmware_slots.iter().find(|slot| slot.active)
    }

    /// Replace the self-test record with one observed by a controller
    pub fn with_self_test(self, record: SelfTestRecord) -> Self {
        Self {
            self_test: Some(record),
            ..self
        }
    }
}
