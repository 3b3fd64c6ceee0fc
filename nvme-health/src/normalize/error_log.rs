// SPDX-License-Identifier: GPL-3.0-only

use nvme_contracts::NvmeError;
use nvme_types::{ErrorLogEntry, Reading, RecordKind};
use serde_json::Value;

use super::Normalized;
use super::fields::{Fields, IssueLog, unwrap_wrappers};

const ENTRY_LISTS: &[&str] = &["errors", "error_log", "entries"];

const ERROR_COUNT: &[&str] = &["error_count", "err_count"];
const SQID: &[&str] = &["sqid", "submission_queue_id"];
const CMDID: &[&str] = &["cmdid", "cid", "command_id"];
const STATUS: &[&str] = &["status_field", "status"];
/// Present when nvme-cli already split the phase tag off the status field
const PHASE_TAG: &[&str] = &["phase_tag"];
const PARAMETER_LOCATION: &[&str] = &["parm_error_location", "parameter_error_location"];
const NSID: &[&str] = &["nsid", "namespace_id"];
const LBA: &[&str] = &["lba"];

/// Normalize an error information log into entries in device order
///
/// Empty slots are kept here; dropping them is the reconciler's job.
pub fn normalize_error_log(raw: &Value) -> Result<Normalized<Vec<ErrorLogEntry>>, NvmeError> {
    let raw = unwrap_wrappers(raw, ENTRY_LISTS);
    let entries = match raw {
        Value::Array(entries) => entries,
        Value::Object(_) => {
            let fields = Fields::new(RecordKind::ErrorLog, raw)?;
            match fields.lookup(ENTRY_LISTS) {
                Some((_, Value::Array(entries))) => entries,
                Some((alias, _)) => {
                    return Err(NvmeError::malformed(
                        RecordKind::ErrorLog,
                        alias,
                        "expected an array of entries",
                    ));
                }
                None => {
                    return Err(NvmeError::malformed(
                        RecordKind::ErrorLog,
                        ENTRY_LISTS[0],
                        "no error log entries",
                    ));
                }
            }
        }
        _ => {
            return Err(NvmeError::malformed(
                RecordKind::ErrorLog,
                "<record>",
                "expected an object or an array of entries",
            ));
        }
    };

    let mut issues = IssueLog::new(RecordKind::ErrorLog);
    let mut normalized = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        match normalize_entry(entry, &mut issues) {
            Ok(Some(entry)) => normalized.push(entry),
            Ok(None) => issues.push(
                ERROR_COUNT[0],
                format!("entry {index} has no error count, skipped"),
            ),
            Err(error) => issues.push_error(error),
        }
    }

    Ok(Normalized::new(normalized, issues))
}

fn normalize_entry(
    entry: &Value,
    issues: &mut IssueLog,
) -> Result<Option<ErrorLogEntry>, NvmeError> {
    let fields = Fields::new(RecordKind::ErrorLog, entry)?;
    let Reading::Known(error_count) = fields.uint::<u64>(ERROR_COUNT)? else {
        return Ok(None);
    };

    let status = issues.recover(fields.uint::<u16>(STATUS));
    let status_field = if fields.has_any(PHASE_TAG) {
        status
    } else {
        status.map(|status| status >> 1)
    };

    Ok(Some(ErrorLogEntry {
        error_count,
        submission_queue_id: issues.recover(fields.uint(SQID)),
        command_id: issues.recover(fields.uint(CMDID)),
        status_field,
        parameter_error_location: issues.recover(fields.uint(PARAMETER_LOCATION)),
        namespace_id: issues.recover(fields.uint(NSID)),
        lba: issues.recover(fields.uint(LBA)),
    }))
}
