// SPDX-License-Identifier: GPL-3.0-only

//! Health status derivation

use nvme_types::{HealthAssessment, HealthMetrics, HealthReason, HealthStatus, Reading};
use serde::{Deserialize, Serialize};

/// Percentage used at which wear is reported as nearing the limit
const ENDURANCE_WARN_PERCENT: u16 = 90;

/// Percentage used at which the rated endurance is exhausted
const ENDURANCE_LIMIT_PERCENT: u16 = 100;

/// Tunable thresholds for the warning band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Composite temperature above which a device is flagged, in Celsius
    pub high_temp_threshold_c: i32,

    /// Available spare within this many points of the threshold is flagged
    pub spare_warn_margin: u8,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            high_temp_threshold_c: 70,
            spare_warn_margin: 10,
        }
    }
}

/// Derive a status with its reasons
///
/// Known critical evidence always wins. Without it, any unknown required
/// indicator makes the status `unknown`: absence is never read as healthy.
pub fn evaluate(metrics: &HealthMetrics, thresholds: &HealthThresholds) -> HealthAssessment {
    let mut reasons = Vec::new();

    match metrics.critical_warning {
        Reading::Known(bits) => {
            if bits != 0 {
                let flags = metrics
                    .critical_warnings()
                    .map(|flags| flags.iter().collect())
                    .unwrap_or_default();
                reasons.push(HealthReason::CriticalWarning { bits, flags });
            }
        }
        Reading::Unknown => reasons.push(missing("critical_warning")),
    }

    match (metrics.available_spare, metrics.available_spare_threshold) {
        (Reading::Known(spare), Reading::Known(threshold)) => {
            if spare < threshold {
                reasons.push(HealthReason::SpareBelowThreshold {
                    available_spare: spare,
                    threshold,
                });
            } else if u16::from(spare)
                < u16::from(threshold) + u16::from(thresholds.spare_warn_margin)
            {
                reasons.push(HealthReason::SpareNearThreshold {
                    available_spare: spare,
                    threshold,
                    margin: thresholds.spare_warn_margin,
                });
            }
        }
        (spare, threshold) => {
            if spare.is_unknown() {
                reasons.push(missing("available_spare"));
            }
            if threshold.is_unknown() {
                reasons.push(missing("available_spare_threshold"));
            }
        }
    }

    match metrics.percentage_used {
        Reading::Known(used) if used >= ENDURANCE_LIMIT_PERCENT => {
            reasons.push(HealthReason::EnduranceExhausted {
                percentage_used: used,
            });
        }
        Reading::Known(used) if used >= ENDURANCE_WARN_PERCENT => {
            reasons.push(HealthReason::EnduranceNearLimit {
                percentage_used: used,
            });
        }
        Reading::Known(_) => {}
        Reading::Unknown => reasons.push(missing("percentage_used")),
    }

    match metrics.temperature_celsius {
        Reading::Known(celsius) if celsius > thresholds.high_temp_threshold_c => {
            reasons.push(HealthReason::TemperatureHigh {
                celsius,
                threshold: thresholds.high_temp_threshold_c,
            });
        }
        // The device's own thermal bit in critical_warning covers the rest
        _ => {}
    }

    let status = reasons
        .iter()
        .map(HealthReason::severity)
        .max()
        .unwrap_or(HealthStatus::Ok);

    HealthAssessment { status, reasons }
}

fn missing(field: &str) -> HealthReason {
    HealthReason::MissingField {
        field: field.to_string(),
    }
}
