// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// Kind of raw diagnostic record read from a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Identity,
    FirmwareSlots,
    Health,
    Endurance,
    ErrorLog,
    SelfTestLog,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::FirmwareSlots => "firmware_slots",
            Self::Health => "health",
            Self::Endurance => "endurance",
            Self::ErrorLog => "error_log",
            Self::SelfTestLog => "self_test_log",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place where data degraded to unknown while building a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub record: RecordKind,

    /// Field name, or `None` when the whole record was affected
    pub field: Option<String>,

    pub message: String,
}

impl RecordIssue {
    pub fn field(record: RecordKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            record,
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn record(record: RecordKind, message: impl Into<String>) -> Self {
        Self {
            record,
            field: None,
            message: message.into(),
        }
    }
}
