// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;

use nvme_contracts::NvmeError;
use nvme_types::{FirmwareSlot, Reading, RecordKind, TYPICAL_MAX_FIRMWARE_SLOTS};
use serde_json::Value;
use tracing::warn;

use super::Normalized;
use super::fields::{Fields, IssueLog, parse_u64, unwrap_wrappers};

const SLOT_LISTS: &[&str] = &["fw_log", "slots"];
const ACTIVE_FIRMWARE_INFO: &[&str] = &["Active Firmware Slot (afi)", "afi"];
const SLOT_REVISION_PREFIX: &str = "Firmware Rev Slot ";

const SLOT: &[&str] = &["slot", "slot_number"];
const REVISION: &[&str] = &["revision", "frs"];
const ACTIVE: &[&str] = &["active"];
const NEXT_RESET: &[&str] = &["active_on_next_reset", "next_active"];

/// Normalize a firmware slot log
///
/// Accepts the list layout (`fw_log: [{revision, active, ...}]`) and
/// nvme-cli's map layout (`afi` byte plus `Firmware Rev Slot N` keys).
pub fn normalize_firmware_slots(raw: &Value) -> Result<Normalized<Vec<FirmwareSlot>>, NvmeError> {
    let raw = unwrap_wrappers(raw, &[SLOT_LISTS, ACTIVE_FIRMWARE_INFO].concat());
    let fields = Fields::new(RecordKind::FirmwareSlots, raw)?;
    let mut issues = IssueLog::new(RecordKind::FirmwareSlots);

    let slots = if let Some((alias, list)) = fields.lookup(SLOT_LISTS) {
        let Value::Array(entries) = list else {
            return Err(NvmeError::malformed(
                RecordKind::FirmwareSlots,
                alias,
                "expected an array of slots",
            ));
        };
        slots_from_list(entries, &mut issues)?
    } else if fields.has_any(ACTIVE_FIRMWARE_INFO)
        || fields.map().keys().any(|k| k.starts_with(SLOT_REVISION_PREFIX))
    {
        slots_from_map(&fields, &mut issues)?
    } else {
        return Err(NvmeError::malformed(
            RecordKind::FirmwareSlots,
            SLOT_LISTS[0],
            "no firmware slot information",
        ));
    };

    validate_slots(&slots)?;
    Ok(Normalized::new(slots, issues))
}

fn slots_from_list(
    entries: &[Value],
    issues: &mut IssueLog,
) -> Result<Vec<FirmwareSlot>, NvmeError> {
    let mut slots = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let fields = match Fields::new(RecordKind::FirmwareSlots, entry) {
            Ok(fields) => fields,
            Err(error) => {
                issues.push_error(error);
                continue;
            }
        };

        let slot = match fields.uint::<u8>(SLOT)? {
            Reading::Known(slot) => slot,
            Reading::Unknown => u8::try_from(index + 1).map_err(|_| {
                NvmeError::malformed(RecordKind::FirmwareSlots, SLOT[0], "too many slots")
            })?,
        };

        let revision = match fields.lookup(REVISION) {
            Some((_, value)) => decode_revision(value),
            None => None,
        };

        slots.push(FirmwareSlot {
            slot,
            revision,
            active: issues.recover(fields.flag(ACTIVE)).get().unwrap_or(false),
            active_on_next_reset: issues
                .recover(fields.flag(NEXT_RESET))
                .get()
                .unwrap_or(false),
        });
    }

    Ok(slots)
}

fn slots_from_map(
    fields: &Fields<'_>,
    issues: &mut IssueLog,
) -> Result<Vec<FirmwareSlot>, NvmeError> {
    let afi = issues.recover(fields.uint::<u8>(ACTIVE_FIRMWARE_INFO));
    let active_slot = afi.get().map(|afi| afi & 0x07).filter(|slot| *slot != 0);
    let next_slot = afi.get().map(|afi| (afi >> 4) & 0x07).filter(|slot| *slot != 0);

    let mut revisions = BTreeMap::new();
    for (key, value) in fields.map() {
        let Some(number) = key.strip_prefix(SLOT_REVISION_PREFIX) else {
            continue;
        };
        let slot = number.trim().parse::<u8>().map_err(|_| {
            NvmeError::malformed(
                RecordKind::FirmwareSlots,
                key.as_str(),
                "slot number is not a small integer",
            )
        })?;
        revisions.insert(slot, decode_revision(value));
    }

    if let Some(active) = active_slot {
        revisions.entry(active).or_insert(None);
    }

    Ok(revisions
        .into_iter()
        .map(|(slot, revision)| FirmwareSlot {
            slot,
            revision,
            active: Some(slot) == active_slot,
            active_on_next_reset: Some(slot) == next_slot,
        })
        .collect())
}

/// Firmware revisions arrive either as text or, from older nvme-cli, as the
/// 8 revision bytes packed into a little-endian integer. Blank or zero means
/// the slot is unprogrammed.
fn decode_revision(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(_) => {
            let packed = parse_u64(value)?;
            if packed == 0 {
                return None;
            }
            let bytes: Vec<u8> = packed
                .to_le_bytes()
                .into_iter()
                .take_while(|b| *b != 0)
                .collect();
            String::from_utf8_lossy(&bytes).trim().to_string()
        }
        _ => return None,
    };

    if text.is_empty() { None } else { Some(text) }
}

fn validate_slots(slots: &[FirmwareSlot]) -> Result<(), NvmeError> {
    let mut seen = BTreeMap::new();
    for slot in slots {
        if slot.slot == 0 {
            return Err(NvmeError::malformed(
                RecordKind::FirmwareSlots,
                "slot",
                "slot numbers start at 1",
            ));
        }
        if seen.insert(slot.slot, ()).is_some() {
            return Err(NvmeError::malformed(
                RecordKind::FirmwareSlots,
                "slot",
                format!("duplicate slot {}", slot.slot),
            ));
        }
        if slot.slot > TYPICAL_MAX_FIRMWARE_SLOTS {
            warn!(
                "Device reports firmware slot {} beyond the usual {} slots",
                slot.slot, TYPICAL_MAX_FIRMWARE_SLOTS
            );
        }
    }

    if slots.iter().filter(|slot| slot.active).count() > 1 {
        return Err(NvmeError::malformed(
            RecordKind::FirmwareSlots,
            "active",
            "more than one slot marked active",
        ));
    }

    Ok(())
}
