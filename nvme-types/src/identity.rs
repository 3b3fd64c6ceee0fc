// SPDX-License-Identifier: GPL-3.0-only

//! Controller identity and firmware slot models

use serde::{Deserialize, Serialize};

use crate::Reading;

/// Identity of the controller behind a device node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Device path the identity was read from (e.g., "/dev/nvme0")
    pub device: String,

    /// Model number, trimmed of padding
    pub model: String,

    /// Serial number, trimmed of padding
    pub serial: String,

    /// Firmware revision currently running
    pub firmware_revision: Reading<String>,

    /// Controller id (`cntlid`)
    pub controller_id: Reading<u16>,

    /// PCI vendor id (`vid`)
    pub vendor_id: Reading<u16>,

    /// Extended self-test time in minutes (`edstt`)
    pub extended_self_test_minutes: Reading<u16>,

    /// Total NVM capacity in bytes (`tnvmcap`)
    pub total_capacity_bytes: Reading<u64>,
}

/// One firmware slot as reported by the firmware slot log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareSlot {
    /// Slot number, starting at 1
    pub slot: u8,

    /// Firmware revision stored in the slot; `None` when unprogrammed
    pub revision: Option<String>,

    /// Slot holds the firmware that is currently running
    pub active: bool,

    /// Slot will be activated on the next controller reset
    pub active_on_next_reset: bool,
}

impl FirmwareSlot {
    pub fn is_programmed(&self) -> bool {
        self.revision.is_some()
    }
}

/// Typical upper bound for firmware slots; devices may report more.
pub const TYPICAL_MAX_FIRMWARE_SLOTS: u8 = 7;
