// SPDX-License-Identifier: GPL-3.0-only

//! Error information log models

use serde::{Deserialize, Serialize};

use crate::Reading;

/// One entry of the controller's error information log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    /// Sequence number assigned by the device; 0 marks an empty slot
    pub error_count: u64,

    /// Submission queue id of the failed command
    pub submission_queue_id: Reading<u16>,

    /// Command id of the failed command
    pub command_id: Reading<u16>,

    /// Status field of the failed completion, phase tag removed
    pub status_field: Reading<u16>,

    /// Byte and bit of the command parameter that caused the error
    pub parameter_error_location: Reading<u16>,

    /// Namespace the command targeted
    pub namespace_id: Reading<u32>,

    /// First LBA that experienced the error
    pub lba: Reading<u64>,
}

impl ErrorLogEntry {
    /// Empty slots in the circular buffer carry error count 0.
    pub fn is_empty_slot(&self) -> bool {
        self.error_count == 0
    }
}
