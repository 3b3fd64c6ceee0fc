// SPDX-License-Identifier: GPL-3.0-only

use nvme_contracts::NvmeError;
use nvme_types::{DeviceIdentity, Reading, RecordKind};
use serde_json::Value;

use super::Normalized;
use super::fields::{Fields, IssueLog, unwrap_wrappers};

const SERIAL: &[&str] = &["sn", "SerialNumber", "serial_number"];
const MODEL: &[&str] = &["mn", "ModelNumber", "model_number"];
const FIRMWARE: &[&str] = &["fr", "Firmware", "firmware_rev"];
const CONTROLLER_ID: &[&str] = &["cntlid", "controller_id"];
const VENDOR_ID: &[&str] = &["vid", "vendor_id"];
const EXTENDED_SELF_TEST_TIME: &[&str] = &["edstt", "extended_self_test_time"];
const TOTAL_CAPACITY: &[&str] = &["tnvmcap", "total_capacity"];

/// Normalize an identify-controller record
///
/// Serial and model are required: without them the device cannot be
/// described or re-identified while a self-test runs.
pub fn normalize_identity(
    device: &str,
    raw: &Value,
) -> Result<Normalized<DeviceIdentity>, NvmeError> {
    let raw = unwrap_wrappers(raw, SERIAL);
    let fields = Fields::new(RecordKind::Identity, raw)?;
    let mut issues = IssueLog::new(RecordKind::Identity);

    let serial = required_text(&fields, SERIAL)?;
    let model = required_text(&fields, MODEL)?;

    let identity = DeviceIdentity {
        device: device.to_string(),
        model,
        serial,
        firmware_revision: issues.recover(fields.text(FIRMWARE)),
        controller_id: issues.recover(fields.uint(CONTROLLER_ID)),
        vendor_id: issues.recover(fields.uint(VENDOR_ID)),
        extended_self_test_minutes: issues.recover(fields.uint(EXTENDED_SELF_TEST_TIME)),
        total_capacity_bytes: issues.recover(fields.uint(TOTAL_CAPACITY)),
    };

    Ok(Normalized::new(identity, issues))
}

/// Serial number only, for re-identifying a device between polls
pub fn serial_number(raw: &Value) -> Result<String, NvmeError> {
    let raw = unwrap_wrappers(raw, SERIAL);
    let fields = Fields::new(RecordKind::Identity, raw)?;
    required_text(&fields, SERIAL)
}

fn required_text(fields: &Fields<'_>, aliases: &[&'static str]) -> Result<String, NvmeError> {
    match fields.text(aliases)? {
        Reading::Known(value) => Ok(value),
        Reading::Unknown => Err(NvmeError::malformed(
            RecordKind::Identity,
            aliases[0],
            "required field is missing",
        )),
    }
}
