// SPDX-License-Identifier: GPL-3.0-only

use nvme_contracts::NvmeError;
use thiserror::Error;

/// Error types for nvme-cli invocations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("nvme-cli not installed (install the nvme-cli package)")]
    NvmeNotFound,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("{command} produced invalid JSON: {reason}")]
    InvalidOutput { command: String, reason: String },
}

/// Result type alias for nvme-cli operations
pub type Result<T> = std::result::Result<T, SysError>;

impl From<SysError> for NvmeError {
    fn from(error: SysError) -> Self {
        match error {
            SysError::NvmeNotFound => NvmeError::SourceUnavailable {
                reason: "nvme-cli not installed".to_string(),
            },
            SysError::PermissionDenied(reason) => NvmeError::SourceUnavailable { reason },
            SysError::Io(e) => NvmeError::SourceUnavailable {
                reason: format!("failed to execute nvme: {e}"),
            },
            SysError::DeviceNotFound(device) => NvmeError::DeviceNotFound { device },
            SysError::CommandFailed { command, stderr } => {
                NvmeError::CommandFailed { command, stderr }
            }
            SysError::InvalidOutput { command, reason } => NvmeError::CommandFailed {
                command,
                stderr: format!("invalid JSON output: {reason}"),
            },
        }
    }
}
