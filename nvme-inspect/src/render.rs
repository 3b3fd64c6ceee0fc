// SPDX-License-Identifier: GPL-3.0-only

//! Text and JSON output

use std::fmt;

use chrono::{DateTime, Utc};
use nvme_contracts::{NvmeError, NvmeErrorKind};
use nvme_health::{SelfTestOutcome, SelfTestState};
use nvme_types::{DeviceHealthSnapshot, HealthReason, Reading, RecordIssue, SelfTestRecord};
use serde::Serialize;

/// One NVMe data unit is 1000 blocks of 512 bytes
const DATA_UNIT_BYTES: u64 = 512 * 1000;

/// Everything printed for one run
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub devices: Vec<DeviceReport>,
}

impl Report {
    pub fn new(devices: Vec<DeviceReport>) -> Self {
        Self {
            generated_at: Utc::now(),
            devices,
        }
    }

    /// A device could not be inspected, or its self-test did not finish
    pub fn has_failures(&self) -> bool {
        self.devices.iter().any(|d| {
            d.error.is_some()
                || d.self_test.as_ref().is_some_and(|outcome| {
                    matches!(
                        outcome.state,
                        SelfTestState::Failed { .. } | SelfTestState::TimedOut
                    )
                })
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceReport {
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<DeviceHealthSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_test: Option<SelfTestOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl DeviceReport {
    pub fn inspected(snapshot: DeviceHealthSnapshot) -> Self {
        Self {
            device: snapshot.device().to_string(),
            snapshot: Some(snapshot),
            self_test: None,
            error: None,
        }
    }

    pub fn failed(device: impl Into<String>, error: &NvmeError) -> Self {
        Self {
            device: device.into(),
            snapshot: None,
            self_test: None,
            error: Some(ErrorReport::from(error)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub kind: NvmeErrorKind,
    pub message: String,
}

impl From<&NvmeError> for ErrorReport {
    fn from(error: &NvmeError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut unit_index = 0;
    let mut value = bytes as f64;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{value:.1} {}", UNITS[unit_index])
    }
}

fn data_units(units: Reading<u64>) -> String {
    match units {
        Reading::Known(units) => format!(
            "{units} ({})",
            format_bytes(units.saturating_mul(DATA_UNIT_BYTES))
        ),
        Reading::Unknown => "unknown".to_string(),
    }
}

fn percent<T: fmt::Display>(value: Reading<T>) -> String {
    match value {
        Reading::Known(value) => format!("{value}%"),
        Reading::Unknown => "unknown".to_string(),
    }
}

fn describe(reason: &HealthReason) -> String {
    match reason {
        HealthReason::CriticalWarning { bits, flags } => {
            let names: Vec<&str> = flags.iter().map(|flag| flag.as_str()).collect();
            format!("critical warning 0x{bits:02x} ({})", names.join(", "))
        }
        HealthReason::SpareBelowThreshold {
            available_spare,
            threshold,
        } => format!("available spare {available_spare}% below threshold {threshold}%"),
        HealthReason::EnduranceExhausted { percentage_used } => {
            format!("rated endurance exhausted ({percentage_used}% used)")
        }
        HealthReason::EnduranceNearLimit { percentage_used } => {
            format!("rated endurance nearly used up ({percentage_used}% used)")
        }
        HealthReason::SpareNearThreshold {
            available_spare,
            threshold,
            margin,
        } => format!(
            "available spare {available_spare}% within {margin} points of threshold {threshold}%"
        ),
        HealthReason::TemperatureHigh { celsius, threshold } => {
            format!("temperature {celsius} °C above {threshold} °C")
        }
        HealthReason::MissingField { field } => format!("{field} not reported"),
    }
}

fn describe_issue(issue: &RecordIssue) -> String {
    match &issue.field {
        Some(field) => format!("{}.{field}: {}", issue.record, issue.message),
        None => format!("{}: {}", issue.record, issue.message),
    }
}

fn describe_self_test(record: &SelfTestRecord) -> String {
    if record.is_in_progress() {
        return format!(
            "{} test in progress, {}",
            record.kind,
            percent(record.percent_complete)
        );
    }

    match record.power_on_hours {
        Reading::Known(hours) => format!(
            "{} test {} at {hours} power-on hours",
            record.kind, record.result
        ),
        Reading::Unknown => format!("{} test {}", record.kind, record.result),
    }
}

/// Human-readable rendering of a run
pub struct TextReport<'a>(pub &'a Report);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let devices = &self.0.devices;
        writeln!(
            f,
            "NVMe health report, {}",
            self.0.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        if devices.is_empty() {
            return writeln!(f, "No NVMe devices found.");
        }

        writeln!(f, "Inspected {} NVMe device(s).", devices.len())?;
        for device in devices {
            write_device(f, device)?;
        }
        Ok(())
    }
}

fn write_device(f: &mut fmt::Formatter<'_>, report: &DeviceReport) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "=== {} ===", report.device)?;

    if let Some(error) = &report.error {
        writeln!(f, "Error ({}): {}", error.kind.as_str(), error.message)?;
    }

    if let Some(snapshot) = &report.snapshot {
        write_snapshot(f, snapshot)?;
    }

    if let Some(outcome) = &report.self_test {
        write_outcome(f, outcome)?;
    }
    Ok(())
}

fn write_snapshot(f: &mut fmt::Formatter<'_>, snapshot: &DeviceHealthSnapshot) -> fmt::Result {
    let identity = &snapshot.identity;
    let capacity = identity
        .total_capacity_bytes
        .get()
        .map(format_bytes)
        .unwrap_or_else(|| "unknown".to_string());

    writeln!(f, "Model: {}", identity.model)?;
    writeln!(f, "Serial: {}", identity.serial)?;
    writeln!(f, "Firmware: {}", identity.firmware_revision)?;
    writeln!(f, "Capacity: {capacity}")?;
    writeln!(f, "Status: {}", snapshot.status.as_str().to_uppercase())?;
    for reason in &snapshot.status_reasons {
        writeln!(f, "  - {}", describe(reason))?;
    }

    let health = &snapshot.health;
    let endurance = &snapshot.endurance;
    writeln!(f)?;
    writeln!(f, "--- Health ---")?;
    match health.critical_warning {
        Reading::Known(bits) => writeln!(f, "Critical Warning: 0x{bits:02x}")?,
        Reading::Unknown => writeln!(f, "Critical Warning: unknown")?,
    }
    match health.temperature_celsius {
        Reading::Known(celsius) => writeln!(f, "Temperature: {celsius} °C")?,
        Reading::Unknown => writeln!(f, "Temperature: unknown")?,
    }
    writeln!(
        f,
        "Available Spare: {} (Threshold: {})",
        percent(health.available_spare),
        percent(health.available_spare_threshold)
    )?;
    writeln!(f, "Percentage Used: {}", percent(health.percentage_used))?;
    writeln!(f, "Data Units Read: {}", data_units(endurance.data_units_read))?;
    writeln!(f, "Data Units Written: {}", data_units(endurance.data_units_written))?;
    writeln!(f, "Power Cycles: {}", health.power_cycles)?;
    writeln!(f, "Power On Hours: {}", health.power_on_hours)?;
    writeln!(f, "Unsafe Shutdowns: {}", health.unsafe_shutdowns)?;
    writeln!(f, "Media Errors: {}", health.media_errors)?;
    writeln!(f, "Error Log Entries: {}", health.error_log_entries)?;
    for sensor in &endurance.temperature_sensors_celsius {
        writeln!(f, "Temperature Sensor {}: {} °C", sensor.sensor, sensor.celsius)?;
    }

    writeln!(f)?;
    writeln!(f, "--- Error Log ---")?;
    if snapshot.error_log.is_empty() {
        writeln!(f, "  No errors logged.")?;
    }
    for entry in &snapshot.error_log {
        let status = entry
            .status_field
            .get()
            .map(|code| format!("0x{code:04x}"))
            .unwrap_or_else(|| "unknown".to_string());
        writeln!(
            f,
            "  ErrorCount={}, SQID={}, CmdID={}, Status={status}, NSID={}, LBA={}",
            entry.error_count,
            entry.submission_queue_id,
            entry.command_id,
            entry.namespace_id,
            entry.lba
        )?;
    }

    writeln!(f)?;
    writeln!(f, "--- Firmware Slots ---")?;
    if snapshot.firmware_slots.is_empty() {
        writeln!(f, "  Not reported.")?;
    }
    for slot in &snapshot.firmware_slots {
        let revision = slot.revision.as_deref().unwrap_or("(empty)");
        let marker = match (slot.active, slot.active_on_next_reset) {
            (true, _) => " [active]",
            (false, true) => " [next reset]",
            (false, false) => "",
        };
        writeln!(f, "  Slot {}: {revision}{marker}", slot.slot)?;
    }

    writeln!(f)?;
    writeln!(f, "--- Device Self-Test ---")?;
    match &snapshot.self_test {
        Some(record) => writeln!(f, "  {}", describe_self_test(record))?,
        None => writeln!(f, "  No self-test recorded.")?,
    }

    if !snapshot.issues.is_empty() {
        writeln!(f)?;
        writeln!(f, "--- Incomplete Data ---")?;
        for issue in &snapshot.issues {
            writeln!(f, "  {}", describe_issue(issue))?;
        }
    }
    Ok(())
}

fn write_outcome(f: &mut fmt::Formatter<'_>, outcome: &SelfTestOutcome) -> fmt::Result {
    let progress: Vec<String> = outcome
        .observed_percentages
        .iter()
        .map(|p| format!("{p}%"))
        .collect();

    writeln!(f)?;
    writeln!(f, "--- Self-Test Run ({}) ---", outcome.id)?;
    writeln!(f, "Kind: {}", outcome.kind)?;
    writeln!(f, "State: {}", outcome.state)?;
    writeln!(f, "Result: {}", outcome.record.result)?;
    if !progress.is_empty() {
        writeln!(f, "Progress: {}", progress.join(" -> "))?;
    }
    writeln!(f, "Polls: {}", outcome.polls)
}
