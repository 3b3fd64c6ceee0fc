// SPDX-License-Identifier: GPL-3.0-only

use nvme_contracts::NvmeError;
use nvme_types::{EnduranceMetrics, HealthMetrics, Reading, RecordKind, TemperatureSensor};
use serde_json::Value;
use tracing::debug;

use super::Normalized;
use super::fields::{Fields, IssueLog, parse_u64, unwrap_wrappers};

const CRITICAL_WARNING: &[&str] = &["critical_warning", "critical_warnings"];
const AVAILABLE_SPARE: &[&str] = &["avail_spare", "available_spare"];
const SPARE_THRESHOLD: &[&str] = &["spare_thresh", "available_spare_threshold"];
const PERCENTAGE_USED: &[&str] = &["percent_used", "percentage_used"];
const POWER_ON_HOURS: &[&str] = &["power_on_hours"];
const POWER_CYCLES: &[&str] = &["power_cycles"];
const UNSAFE_SHUTDOWNS: &[&str] = &["unsafe_shutdowns"];
const MEDIA_ERRORS: &[&str] = &["media_errors", "media_and_data_integrity_errors"];
const ERROR_LOG_ENTRIES: &[&str] = &["num_err_log_entries", "error_log_entries"];

/// Composite temperature aliases in lookup order, with the unit each carries
const TEMPERATURE: &[(&str, TemperatureUnit)] = &[
    ("temperature", TemperatureUnit::Kelvin),
    ("composite_temperature", TemperatureUnit::Kelvin),
    ("temperature_celsius", TemperatureUnit::Celsius),
];

const DATA_UNITS_READ: &[&str] = &["data_units_read"];
const DATA_UNITS_WRITTEN: &[&str] = &["data_units_written"];
const HOST_READ_COMMANDS: &[&str] = &["host_read_commands"];
const HOST_WRITE_COMMANDS: &[&str] = &["host_write_commands"];
const CONTROLLER_BUSY_TIME: &[&str] = &["controller_busy_time"];
const WARNING_TEMP_TIME: &[&str] = &["warning_temp_time"];
const CRITICAL_TEMP_TIME: &[&str] = &["critical_comp_time", "critical_temp_time"];
const THERMAL_TRANSITIONS_1: &[&str] = &["thm_temp1_trans_count", "thm_temp1_transition_count"];
const THERMAL_TRANSITIONS_2: &[&str] = &["thm_temp2_trans_count", "thm_temp2_transition_count"];
const THERMAL_SECONDS_1: &[&str] = &["thm_temp1_total_time"];
const THERMAL_SECONDS_2: &[&str] = &["thm_temp2_total_time"];
const ENDURANCE_GROUP_WARNING: &[&str] = &["endurance_grp_critical_warning_summary"];

/// NVMe defines up to eight additional temperature sensors
const TEMPERATURE_SENSORS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemperatureUnit {
    Kelvin,
    Celsius,
}

fn health_keys() -> Vec<&'static str> {
    [
        CRITICAL_WARNING,
        AVAILABLE_SPARE,
        SPARE_THRESHOLD,
        PERCENTAGE_USED,
        POWER_ON_HOURS,
        POWER_CYCLES,
        UNSAFE_SHUTDOWNS,
        MEDIA_ERRORS,
        ERROR_LOG_ENTRIES,
    ]
    .concat()
    .into_iter()
    .chain(TEMPERATURE.iter().map(|(alias, _)| *alias))
    .collect()
}

/// Normalize the SMART/health log into the metrics that drive status
///
/// The record is wholly unparsable only when it is not an object or carries
/// none of the known health fields; individual bad fields degrade.
pub fn normalize_health(raw: &Value) -> Result<Normalized<HealthMetrics>, NvmeError> {
    let known = health_keys();
    let raw = unwrap_wrappers(raw, &known);
    let fields = Fields::new(RecordKind::Health, raw)?;

    if !fields.has_any(&known) {
        return Err(NvmeError::malformed(
            RecordKind::Health,
            "<record>",
            "no known health fields",
        ));
    }

    let mut issues = IssueLog::new(RecordKind::Health);

    let metrics = HealthMetrics {
        critical_warning: issues.recover(fields.uint(CRITICAL_WARNING)),
        temperature_celsius: composite_temperature(&fields, &mut issues),
        available_spare: percent(&fields, AVAILABLE_SPARE, &mut issues),
        available_spare_threshold: percent(&fields, SPARE_THRESHOLD, &mut issues),
        percentage_used: issues.recover(fields.uint(PERCENTAGE_USED)),
        power_on_hours: issues.recover(fields.uint(POWER_ON_HOURS)),
        power_cycles: issues.recover(fields.uint(POWER_CYCLES)),
        unsafe_shutdowns: issues.recover(fields.uint(UNSAFE_SHUTDOWNS)),
        media_errors: issues.recover(fields.uint(MEDIA_ERRORS)),
        error_log_entries: issues.recover(fields.uint(ERROR_LOG_ENTRIES)),
    };

    Ok(Normalized::new(metrics, issues))
}

/// Normalize the wear and thermal counters carried by the same log page
pub fn normalize_endurance(raw: &Value) -> Result<Normalized<EnduranceMetrics>, NvmeError> {
    let raw = unwrap_wrappers(raw, &health_keys());
    let fields = Fields::new(RecordKind::Endurance, raw)?;
    let mut issues = IssueLog::new(RecordKind::Endurance);

    let mut temperature_sensors_celsius = Vec::new();
    for sensor in 1..=TEMPERATURE_SENSORS {
        let key = format!("temperature_sensor_{sensor}");
        let Some(value) = fields.map().get(&key) else {
            continue;
        };
        match parse_u64(value) {
            // 0 K marks a sensor that is not implemented
            Some(0) => {}
            Some(kelvin) => temperature_sensors_celsius.push(TemperatureSensor {
                sensor,
                celsius: kelvin_to_celsius(kelvin),
            }),
            None if value.is_null() => {}
            None => issues.push(&key, format!("expected kelvin, found {value}")),
        }
    }

    let metrics = EnduranceMetrics {
        data_units_read: issues.recover(fields.uint(DATA_UNITS_READ)),
        data_units_written: issues.recover(fields.uint(DATA_UNITS_WRITTEN)),
        host_read_commands: issues.recover(fields.uint(HOST_READ_COMMANDS)),
        host_write_commands: issues.recover(fields.uint(HOST_WRITE_COMMANDS)),
        controller_busy_minutes: issues.recover(fields.uint(CONTROLLER_BUSY_TIME)),
        warning_temperature_minutes: issues.recover(fields.uint(WARNING_TEMP_TIME)),
        critical_temperature_minutes: issues.recover(fields.uint(CRITICAL_TEMP_TIME)),
        temperature_sensors_celsius,
        thermal_transitions_1: issues.recover(fields.uint(THERMAL_TRANSITIONS_1)),
        thermal_transitions_2: issues.recover(fields.uint(THERMAL_TRANSITIONS_2)),
        thermal_seconds_1: issues.recover(fields.uint(THERMAL_SECONDS_1)),
        thermal_seconds_2: issues.recover(fields.uint(THERMAL_SECONDS_2)),
        endurance_group_warning: issues.recover(fields.uint(ENDURANCE_GROUP_WARNING)),
    };

    Ok(Normalized::new(metrics, issues))
}

fn composite_temperature(fields: &Fields<'_>, issues: &mut IssueLog) -> Reading<i32> {
    let Some((alias, unit)) = TEMPERATURE
        .iter()
        .find(|(alias, _)| fields.has_any(&[*alias]))
    else {
        return Reading::Unknown;
    };

    let raw: Reading<u64> = issues.recover(fields.uint(&[*alias]));
    match (raw, unit) {
        // A composite temperature of 0 K is a controller that does not report it
        (Reading::Known(0), TemperatureUnit::Kelvin) => {
            debug!("Composite temperature reported as 0 K, treating as not reported");
            Reading::Unknown
        }
        (Reading::Known(kelvin), TemperatureUnit::Kelvin) => {
            Reading::Known(kelvin_to_celsius(kelvin))
        }
        (Reading::Known(celsius), TemperatureUnit::Celsius) => match i32::try_from(celsius) {
            Ok(celsius) => Reading::Known(celsius),
            Err(_) => {
                issues.push(alias, "temperature out of range");
                Reading::Unknown
            }
        },
        (Reading::Unknown, _) => Reading::Unknown,
    }
}

fn kelvin_to_celsius(kelvin: u64) -> i32 {
    i32::try_from(kelvin).unwrap_or(i32::MAX).saturating_sub(273)
}

/// Percentages are clamped into 0-100
fn percent(fields: &Fields<'_>, aliases: &[&'static str], issues: &mut IssueLog) -> Reading<u8> {
    let value: Reading<u64> = issues.recover(fields.uint(aliases));
    value.map(|value| {
        if value > 100 {
            debug!("Clamping {} = {value} to 100", aliases[0]);
        }
        value.min(100) as u8
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn smart_log() -> Value {
        json!({
            "critical_warning": 0,
            "temperature": 310,
            "avail_spare": 100,
            "spare_thresh": 10,
            "percent_used": 2,
            "endurance_grp_critical_warning_summary": 0,
            "data_units_read": 12345678,
            "data_units_written": 23456789,
            "host_read_commands": 345678901,
            "host_write_commands": 456789012,
            "controller_busy_time": 1234,
            "power_cycles": 1500,
            "power_on_hours": 8760,
            "unsafe_shutdowns": 42,
            "media_errors": 0,
            "num_err_log_entries": 7,
            "warning_temp_time": 0,
            "critical_comp_time": 0,
            "temperature_sensor_1": 310,
            "temperature_sensor_2": 0,
            "thm_temp1_trans_count": 0,
            "thm_temp2_trans_count": 0,
            "thm_temp1_total_time": 0,
            "thm_temp2_total_time": 0
        })
    }

    #[test]
    fn normalizes_smart_log() {
        let normalized = normalize_health(&smart_log()).unwrap();
        let metrics = normalized.value;

        assert_eq!(metrics.critical_warning, Reading::Known(0));
        assert_eq!(metrics.temperature_celsius, Reading::Known(37));
        assert_eq!(metrics.available_spare, Reading::Known(100));
        assert_eq!(metrics.available_spare_threshold, Reading::Known(10));
        assert_eq!(metrics.percentage_used, Reading::Known(2));
        assert_eq!(metrics.power_on_hours, Reading::Known(8760));
        assert_eq!(metrics.media_errors, Reading::Known(0));
        assert!(normalized.issues.is_empty());
    }

    #[test]
    fn missing_fields_stay_unknown_not_zero() {
        let raw = json!({ "avail_spare": 100, "spare_thresh": 10 });
        let metrics = normalize_health(&raw).unwrap().value;

        assert_eq!(metrics.critical_warning, Reading::Unknown);
        assert_eq!(metrics.media_errors, Reading::Unknown);
        assert_eq!(metrics.temperature_celsius, Reading::Unknown);
    }

    #[test]
    fn celsius_alias_is_taken_as_is() {
        let raw = json!({ "critical_warning": 0, "temperature_celsius": "45" });
        let metrics = normalize_health(&raw).unwrap().value;
        assert_eq!(metrics.temperature_celsius, Reading::Known(45));
    }

    #[test]
    fn zero_kelvin_is_not_reported() {
        let raw = json!({ "critical_warning": 0, "temperature": 0 });
        let metrics = normalize_health(&raw).unwrap().value;
        assert_eq!(metrics.temperature_celsius, Reading::Unknown);
    }

    #[test]
    fn clamps_spare_and_keeps_over_limit_wear() {
        let raw = json!({ "avail_spare": 250, "spare_thresh": "10", "percent_used": 130 });
        let metrics = normalize_health(&raw).unwrap().value;
        assert_eq!(metrics.available_spare, Reading::Known(100));
        assert_eq!(metrics.available_spare_threshold, Reading::Known(10));
        assert_eq!(metrics.percentage_used, Reading::Known(130));
    }

    #[test]
    fn unparsable_field_degrades_with_issue() {
        let raw = json!({ "critical_warning": "0x0", "power_cycles": "many" });
        let normalized = normalize_health(&raw).unwrap();
        assert_eq!(normalized.value.critical_warning, Reading::Known(0));
        assert_eq!(normalized.value.power_cycles, Reading::Unknown);
        assert_eq!(normalized.issues.len(), 1);
    }

    #[test]
    fn record_without_health_fields_is_malformed() {
        assert!(normalize_health(&json!({ "vendor": "x" })).is_err());
        assert!(normalize_health(&json!([1, 2, 3])).is_err());
    }

    #[test]
    fn normalizes_endurance_counters_and_sensors() {
        let normalized = normalize_endurance(&smart_log()).unwrap();
        let endurance = normalized.value;

        assert_eq!(endurance.data_units_written, Reading::Known(23456789));
        assert_eq!(endurance.controller_busy_minutes, Reading::Known(1234));
        assert_eq!(
            endurance.temperature_sensors_celsius,
            vec![TemperatureSensor {
                sensor: 1,
                celsius: 37
            }]
        );
        assert_eq!(endurance.endurance_group_warning, Reading::Known(0));
    }
}
