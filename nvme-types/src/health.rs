// SPDX-License-Identifier: GPL-3.0-only

//! SMART/health log models
//!
//! `HealthMetrics` carries the fields that drive the health classification.
//! `EnduranceMetrics` carries the wear and thermal counters from the same log
//! page, which are reported but never classified.

use enumflags2::{BitFlags, bitflags};
use serde::{Deserialize, Serialize};

use crate::Reading;

/// Bits of the SMART critical warning byte
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalWarning {
    /// Available spare capacity fell below the threshold
    AvailableSpareLow = 0b0000_0001,
    /// A temperature crossed an over or under temperature threshold
    TemperatureThreshold = 0b0000_0010,
    /// NVM subsystem reliability degraded by media errors
    ReliabilityDegraded = 0b0000_0100,
    /// Media placed in read-only mode
    ReadOnly = 0b0000_1000,
    /// Volatile memory backup device failed
    VolatileBackupFailed = 0b0001_0000,
    /// Persistent memory region became read-only
    PersistentMemoryReadOnly = 0b0010_0000,
}

impl CriticalWarning {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AvailableSpareLow => "available_spare_low",
            Self::TemperatureThreshold => "temperature_threshold",
            Self::ReliabilityDegraded => "reliability_degraded",
            Self::ReadOnly => "read_only",
            Self::VolatileBackupFailed => "volatile_backup_failed",
            Self::PersistentMemoryReadOnly => "persistent_memory_read_only",
        }
    }
}

impl std::fmt::Display for CriticalWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized health indicators
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Raw critical warning byte; authoritative for derived status
    pub critical_warning: Reading<u8>,

    /// Composite temperature in Celsius
    pub temperature_celsius: Reading<i32>,

    /// Remaining spare capacity, percent (0-100)
    pub available_spare: Reading<u8>,

    /// Spare threshold below which the device raises a warning, percent (0-100)
    pub available_spare_threshold: Reading<u8>,

    /// Vendor estimate of consumed endurance, percent; may exceed 100
    pub percentage_used: Reading<u16>,

    /// Power-on hours
    pub power_on_hours: Reading<u64>,

    /// Number of power cycles
    pub power_cycles: Reading<u64>,

    /// Number of unsafe shutdowns
    pub unsafe_shutdowns: Reading<u64>,

    /// Media and data integrity errors
    pub media_errors: Reading<u64>,

    /// Number of error information log entries over the device's life
    pub error_log_entries: Reading<u64>,
}

impl HealthMetrics {
    /// Decoded critical warning flags; reserved bits are dropped.
    pub fn critical_warnings(&self) -> Option<BitFlags<CriticalWarning>> {
        self.critical_warning
            .get()
            .map(BitFlags::<CriticalWarning>::from_bits_truncate)
    }
}

/// Wear and thermal counters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnduranceMetrics {
    /// Data units read (thousands of 512-byte units)
    pub data_units_read: Reading<u64>,

    /// Data units written (thousands of 512-byte units)
    pub data_units_written: Reading<u64>,

    pub host_read_commands: Reading<u64>,
    pub host_write_commands: Reading<u64>,

    /// Minutes the controller was busy with I/O
    pub controller_busy_minutes: Reading<u64>,

    /// Minutes spent above the warning composite temperature
    pub warning_temperature_minutes: Reading<u64>,

    /// Minutes spent above the critical composite temperature
    pub critical_temperature_minutes: Reading<u64>,

    /// Additional temperature sensors in Celsius, in sensor order.
    /// Sensors that are not implemented are omitted.
    #[serde(default)]
    pub temperature_sensors_celsius: Vec<TemperatureSensor>,

    /// Thermal management temperature 1 transition count
    pub thermal_transitions_1: Reading<u64>,

    /// Thermal management temperature 2 transition count
    pub thermal_transitions_2: Reading<u64>,

    /// Seconds spent in thermal management temperature 1
    pub thermal_seconds_1: Reading<u64>,

    /// Seconds spent in thermal management temperature 2
    pub thermal_seconds_2: Reading<u64>,

    /// Endurance group critical warning summary byte
    pub endurance_group_warning: Reading<u8>,
}

/// One additional temperature sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureSensor {
    /// Sensor index, starting at 1
    pub sensor: u8,
    pub celsius: i32,
}

/// Derived health classification
///
/// Variants are ordered by severity, so the maximum of two statuses is the
/// more severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Warning,
    /// Required indicators are missing, so the device cannot be called healthy
    Unknown,
    Critical,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Unknown => "unknown",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a status was assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum HealthReason {
    CriticalWarning {
        bits: u8,
        flags: Vec<CriticalWarning>,
    },
    SpareBelowThreshold {
        available_spare: u8,
        threshold: u8,
    },
    EnduranceExhausted {
        percentage_used: u16,
    },
    EnduranceNearLimit {
        percentage_used: u16,
    },
    SpareNearThreshold {
        available_spare: u8,
        threshold: u8,
        margin: u8,
    },
    TemperatureHigh {
        celsius: i32,
        threshold: i32,
    },
    MissingField {
        field: String,
    },
}

impl HealthReason {
    /// Status this reason contributes on its own
    pub fn severity(&self) -> HealthStatus {
        match self {
            Self::CriticalWarning { .. }
            | Self::SpareBelowThreshold { .. }
            | Self::EnduranceExhausted { .. } => HealthStatus::Critical,
            Self::MissingField { .. } => HealthStatus::Unknown,
            Self::EnduranceNearLimit { .. }
            | Self::SpareNearThreshold { .. }
            | Self::TemperatureHigh { .. } => HealthStatus::Warning,
        }
    }
}

/// Status plus the reasons behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub status: HealthStatus,
    #[serde(default)]
    pub reasons: Vec<HealthReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_warning_flags_ignore_reserved_bits() {
        let metrics = HealthMetrics {
            critical_warning: Reading::Known(0b1100_0101),
            ..Default::default()
        };

        let flags = metrics.critical_warnings().unwrap();
        assert!(flags.contains(CriticalWarning::AvailableSpareLow));
        assert!(flags.contains(CriticalWarning::ReliabilityDegraded));
        assert_eq!(flags.iter().count(), 2);
    }

    #[test]
    fn status_strings_are_stable() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(
            serde_json::to_string(&CriticalWarning::TemperatureThreshold).unwrap(),
            "\"temperature_threshold\""
        );
        assert_eq!(CriticalWarning::ReadOnly.as_str(), "read_only");
        assert_eq!(
            serde_json::to_string(&CriticalWarning::PersistentMemoryReadOnly).unwrap(),
            format!("\"{}\"", CriticalWarning::PersistentMemoryReadOnly)
        );
        assert!(HealthStatus::Critical > HealthStatus::Unknown);
        assert!(HealthStatus::Unknown > HealthStatus::Warning);
        assert!(HealthStatus::Warning > HealthStatus::Ok);
    }
}
