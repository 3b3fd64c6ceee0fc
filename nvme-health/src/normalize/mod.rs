// SPDX-License-Identifier: GPL-3.0-only

//! Raw record normalization
//!
//! Each raw record kind is mapped into its typed model. Absent or null fields
//! become [`Reading::Unknown`](nvme_types::Reading); values that are present
//! but unparsable also become unknown and leave a [`RecordIssue`] behind. A
//! record that cannot be read as its kind at all is a
//! [`NvmeError::MalformedRecord`](nvme_contracts::NvmeError).

mod error_log;
mod fields;
mod firmware;
mod health;
mod identity;

use nvme_types::RecordIssue;

pub use error_log::normalize_error_log;
pub use firmware::normalize_firmware_slots;
pub use health::{normalize_endurance, normalize_health};
pub use identity::{normalize_identity, serial_number};
pub use self_test::{decode_result, normalize_self_test_log};

/// A normalized value plus the per-field degradations met on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub issues: Vec<RecordIssue>,
}

impl<T> Normalized<T> {
    pub(crate) fn new(value: T, issues: fields::IssueLog) -> Self {
        Self {
            value,
            issues: issues.into_issues(),
        }
    }

    pub fn into_parts(self) -> (T, Vec<RecordIssue>) {
        (self.value, self.issues)
    }
}
