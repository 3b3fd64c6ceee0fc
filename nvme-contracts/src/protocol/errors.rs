// SPDX-License-Identifier: GPL-3.0-only

use nvme_types::RecordKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NvmeErrorKind {
    SourceUnavailable,
    DeviceNotFound,
    MalformedRecord,
    IncompleteSnapshot,
    TestAlreadyRunning,
    UnsupportedTestType,
    DeviceIdentityMismatch,
    CommandFailed,
}

impl NvmeErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceUnavailable => "source_unavailable",
            Self::DeviceNotFound => "device_not_found",
            Self::MalformedRecord => "malformed_record",
            Self::IncompleteSnapshot => "incomplete_snapshot",
            Self::TestAlreadyRunning => "test_already_running",
            Self::UnsupportedTestType => "unsupported_test_type",
            Self::DeviceIdentityMismatch => "device_identity_mismatch",
            Self::CommandFailed => "command_failed",
        }
    }

    /// Errors after which no partial report is meaningful
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::SourceUnavailable | Self::DeviceNotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NvmeError {
    #[error("diagnostic utility unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("malformed {record} record: field `{field}`: {reason}")]
    MalformedRecord {
        record: RecordKind,
        field: String,
        reason: String,
    },

    #[error("incomplete snapshot for {device}: {reason}")]
    IncompleteSnapshot { device: String, reason: String },

    #[error("a self-test is already running on {device}")]
    TestAlreadyRunning { device: String },

    #[error("unsupported self-test type: {requested}")]
    UnsupportedTestType { requested: String },

    #[error("device identity changed on {device}: expected serial {expected}, found {found}")]
    DeviceIdentityMismatch {
        device: String,
        expected: String,
        found: String,
    },

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

impl NvmeError {
    pub fn kind(&self) -> NvmeErrorKind {
        match self {
            Self::SourceUnavailable { .. } => NvmeErrorKind::SourceUnavailable,
            Self::DeviceNotFound { .. } => NvmeErrorKind::DeviceNotFound,
            Self::MalformedRecord { .. } => NvmeErrorKind::MalformedRecord,
            Self::IncompleteSnapshot { .. } => NvmeErrorKind::IncompleteSnapshot,
            Self::TestAlreadyRunning { .. } => NvmeErrorKind::TestAlreadyRunning,
            Self::UnsupportedTestType { .. } => NvmeErrorKind::UnsupportedTestType,
            Self::DeviceIdentityMismatch { .. } => NvmeErrorKind::DeviceIdentityMismatch,
            Self::CommandFailed { .. } => NvmeErrorKind::CommandFailed,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    pub fn malformed(
        record: RecordKind,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedRecord {
            record,
            field: field.into(),
            reason: reason.into(),
        }
    }
}
