// SPDX-License-Identifier: GPL-3.0-only

//! Error log reconciliation

use std::collections::HashSet;

use nvme_types::ErrorLogEntry;
use tracing::debug;

/// Reduce raw error log entries to at most `max_entries` distinct ones
///
/// Empty slots are skipped and repeated error counts keep their first
/// occurrence. Input order is preserved and the result is never padded.
pub fn reconcile_error_log(entries: Vec<ErrorLogEntry>, max_entries: usize) -> Vec<ErrorLogEntry> {
    let mut seen = HashSet::new();
    let mut reconciled = Vec::with_capacity(entries.len().min(max_entries));
    let mut duplicates = 0usize;

    for entry in entries {
        if reconciled.len() == max_entries {
            break;
        }
        if entry.is_empty_slot() {
            continue;
        }
        if !seen.insert(entry.error_count) {
            duplicates += 1;
            continue;
        }
        reconciled.push(entry);
    }

    if duplicates > 0 {
        debug!("Dropped {duplicates} duplicate error log entries");
    }

    reconciled
}
