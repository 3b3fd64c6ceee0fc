// SPDX-License-Identifier: GPL-3.0-only

//! Alias-based field lookup over raw JSON records
//!
//! nvme-cli renames fields between releases and vendors add their own. Each
//! target field is looked up through an ordered alias list; the first alias
//! present wins and the rest are never consulted.

use nvme_contracts::NvmeError;
use nvme_types::{Reading, RecordIssue, RecordKind};
use serde_json::{Map, Value};
use tracing::debug;

/// Read-only view over one JSON object of a given record kind
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields<'a> {
    record: RecordKind,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(record: RecordKind, value: &'a Value) -> Result<Self, NvmeError> {
        match value {
            Value::Object(map) => Ok(Self { record, map }),
            other => Err(NvmeError::malformed(
                record,
                "<record>",
                format!("expected an object, found {}", json_type(other)),
            )),
        }
    }

    pub(crate) fn map(&self) -> &'a Map<String, Value> {
        self.map
    }

    /// First alias present with a non-null value
    pub(crate) fn lookup(&self, aliases: &[&'static str]) -> Option<(&'static str, &'a Value)> {
        aliases.iter().find_map(|alias| match self.map.get(*alias) {
            Some(Value::Null) | None => None,
            Some(value) => Some((*alias, value)),
        })
    }

    pub(crate) fn has_any(&self, aliases: &[&'static str]) -> bool {
        self.lookup(aliases).is_some()
    }

    pub(crate) fn uint<T: TryFrom<u64>>(
        &self,
        aliases: &[&'static str],
    ) -> Result<Reading<T>, NvmeError> {
        let Some((alias, value)) = self.lookup(aliases) else {
            return Ok(Reading::Unknown);
        };

        let number = parse_u64(value).ok_or_else(|| {
            NvmeError::malformed(
                self.record,
                alias,
                format!("expected an unsigned integer, found {value}"),
            )
        })?;

        T::try_from(number).map(Reading::Known).map_err(|_| {
            NvmeError::malformed(self.record, alias, format!("value {number} out of range"))
        })
    }

    pub(crate) fn text(&self, aliases: &[&'static str]) -> Result<Reading<String>, NvmeError> {
        let Some((alias, value)) = self.lookup(aliases) else {
            return Ok(Reading::Unknown);
        };

        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Ok(Reading::Unknown)
                } else {
                    Ok(Reading::Known(trimmed.to_string()))
                }
            }
            Value::Number(n) => Ok(Reading::Known(n.to_string())),
            other => Err(NvmeError::malformed(
                self.record,
                alias,
                format!("expected a string, found {}", json_type(other)),
            )),
        }
    }

    pub(crate) fn flag(&self, aliases: &[&'static str]) -> Result<Reading<bool>, NvmeError> {
        let Some((alias, value)) = self.lookup(aliases) else {
            return Ok(Reading::Unknown);
        };

        parse_flag(value).map(Reading::Known).ok_or_else(|| {
            NvmeError::malformed(self.record, alias, format!("expected a boolean, found {value}"))
        })
    }
}

/// Collects per-field degradations while a record is normalized
#[derive(Debug)]
pub(crate) struct IssueLog {
    record: RecordKind,
    issues: Vec<RecordIssue>,
}

impl IssueLog {
    pub(crate) fn new(record: RecordKind) -> Self {
        Self {
            record,
            issues: Vec::new(),
        }
    }

    /// Degrade a failed field to unknown and remember why
    pub(crate) fn recover<T>(&mut self, result: Result<Reading<T>, NvmeError>) -> Reading<T> {
        match result {
            Ok(reading) => reading,
            Err(error) => {
                self.push_error(error);
                Reading::Unknown
            }
        }
    }

    pub(crate) fn push_error(&mut self, error: NvmeError) {
        debug!("{} record degraded: {error}", self.record);
        let issue = match error {
            NvmeError::MalformedRecord {
                record,
                field,
                reason,
            } => RecordIssue::field(record, field, reason),
            other => RecordIssue::record(self.record, other.to_string()),
        };
        self.issues.push(issue);
    }

    pub(crate) fn push(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        debug!("{} record degraded: {field}: {message}", self.record);
        self.issues
            .push(RecordIssue::field(self.record, field, message));
    }

    pub(crate) fn into_issues(self) -> Vec<RecordIssue> {
        self.issues
    }
}

/// Descend through single-key wrapper objects such as `{"nvme0": {...}}`
/// until an object carrying one of the `known` keys is found.
pub(crate) fn unwrap_wrappers<'a>(value: &'a Value, known: &[&'static str]) -> &'a Value {
    let mut current = value;
    loop {
        let Value::Object(map) = current else {
            return current;
        };
        if known.iter().any(|key| map.contains_key(*key)) || map.len() != 1 {
            return current;
        }
        match map.values().next() {
            Some(inner @ Value::Object(_)) => current = inner,
            _ => return current,
        }
    }
}

/// Accepts integers, integral floats, decimal strings (optionally with
/// thousands separators or a trailing `%`), `0x` hex strings, and objects
/// carrying the number under `value`.
pub(crate) fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            let f = n.as_f64()?;
            (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64)
                .then_some(f as u64)
        }),
        Value::String(s) => parse_u64_str(s),
        Value::Object(map) => map.get("value").and_then(parse_u64),
        _ => None,
    }
}

fn parse_u64_str(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }

    let s = s.strip_suffix('%').unwrap_or(s).trim_end();
    let digits: String = s.chars().filter(|c| *c != ',' && *c != '_').collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub(crate) fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(_) => parse_u64(value).map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn coerces_numeric_representations() {
        assert_eq!(parse_u64(&json!(42)), Some(42));
        assert_eq!(parse_u64(&json!(42.0)), Some(42));
        assert_eq!(parse_u64(&json!("42")), Some(42));
        assert_eq!(parse_u64(&json!(" 1,234 ")), Some(1234));
        assert_eq!(parse_u64(&json!("0x1f")), Some(31));
        assert_eq!(parse_u64(&json!("100%")), Some(100));
        assert_eq!(parse_u64(&json!({ "value": 7 })), Some(7));
        assert_eq!(parse_u64(&json!(-1)), None);
        assert_eq!(parse_u64(&json!(1.5)), None);
        assert_eq!(parse_u64(&json!("n/a")), None);
        assert_eq!(parse_u64(&json!(true)), None);
    }

    #[test]
    fn first_alias_wins_without_ambiguity_error() {
        let raw = json!({ "avail_spare": 90, "available_spare": 10 });
        let fields = Fields::new(RecordKind::Health, &raw).unwrap();

        let spare: Reading<u8> = fields.uint(&["avail_spare", "available_spare"]).unwrap();
        assert_eq!(spare, Reading::Known(90));

        let spare: Reading<u8> = fields.uint(&["available_spare", "avail_spare"]).unwrap();
        assert_eq!(spare, Reading::Known(10));
    }

    #[test]
    fn alias_matching_is_case_sensitive() {
        let raw = json!({ "Avail_Spare": 90 });
        let fields = Fields::new(RecordKind::Health, &raw).unwrap();

        let spare: Reading<u8> = fields.uint(&["avail_spare"]).unwrap();
        assert_eq!(spare, Reading::Unknown);
    }

    #[test]
    fn absent_and_null_are_unknown_but_garbage_is_an_error() {
        let raw = json!({ "media_errors": null, "power_cycles": "lots" });
        let fields = Fields::new(RecordKind::Health, &raw).unwrap();

        let missing: Reading<u64> = fields.uint(&["unsafe_shutdowns"]).unwrap();
        assert_eq!(missing, Reading::Unknown);

        let null: Reading<u64> = fields.uint(&["media_errors"]).unwrap();
        assert_eq!(null, Reading::Unknown);

        let error = fields.uint::<u64>(&["power_cycles"]).unwrap_err();
        assert!(matches!(
            error,
            NvmeError::MalformedRecord { ref field, .. } if field == "power_cycles"
        ));
    }

    #[test]
    fn out_of_range_values_are_errors() {
        let raw = json!({ "avail_spare": 300 });
        let fields = Fields::new(RecordKind::Health, &raw).unwrap();
        assert!(fields.uint::<u8>(&["avail_spare"]).is_err());
    }

    #[test]
    fn unwraps_device_keyed_objects() {
        let raw = json!({ "nvme0": { "critical_warning": 0 } });
        let inner = unwrap_wrappers(&raw, &["critical_warning"]);
        assert_eq!(inner, &json!({ "critical_warning": 0 }));

        let flat = json!({ "critical_warning": 0, "temperature": 300 });
        assert_eq!(unwrap_wrappers(&flat, &["critical_warning"]), &flat);
    }

    #[test]
    fn recover_records_issue_and_degrades() {
        let raw = json!({ "power_cycles": "lots" });
        let fields = Fields::new(RecordKind::Health, &raw).unwrap();
        let mut issues = IssueLog::new(RecordKind::Health);

        let cycles: Reading<u64> = issues.recover(fields.uint(&["power_cycles"]));
        assert_eq!(cycles, Reading::Unknown);

        let issues = issues.into_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field.as_deref(), Some("power_cycles"));
    }
}
