// SPDX-License-Identifier: GPL-3.0-only

//! Tunables shared by every inspection
//!
//! Every key is optional; an empty TOML document yields the defaults.

use std::time::Duration;

use nvme_types::{DeviceIdentity, SelfTestKind};
use serde::{Deserialize, Serialize};

use crate::evaluate::HealthThresholds;
use crate::report::{DEFAULT_ERROR_LOG_ENTRIES, InspectContext};
use crate::selftest::PollOptions;

/// Fallback extended self-test budget when the controller reports no `edstt`
const EXTENDED_FALLBACK: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    pub health: HealthThresholds,
    pub self_test: SelfTestConfig,
    pub error_log: ErrorLogConfig,
}

impl InspectConfig {
    pub fn context(&self, device: impl Into<String>) -> InspectContext {
        InspectContext::new(device)
            .with_thresholds(self.health)
            .with_error_log_entries(self.error_log.max_entries)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfTestConfig {
    pub short_timeout_secs: u64,
    /// Derived from the controller's extended self-test time when unset
    pub extended_timeout_secs: Option<u64>,
    pub poll_interval_ms: u64,
    pub min_poll_interval_ms: u64,
}

impl Default for SelfTestConfig {
    fn default() -> Self {
        Self {
            short_timeout_secs: 600,
            extended_timeout_secs: None,
            poll_interval_ms: 5_000,
            min_poll_interval_ms: 1_000,
        }
    }
}

impl SelfTestConfig {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms),
            min_interval: Duration::from_millis(self.min_poll_interval_ms),
        }
    }

    /// Timeout for a test of `kind` on the identified controller
    ///
    /// Extended tests get twice the controller's advertised duration.
    pub fn timeout_for(&self, kind: SelfTestKind, identity: &DeviceIdentity) -> Duration {
        match kind {
            SelfTestKind::Extended => match self.extended_timeout_secs {
                Some(secs) => Duration::from_secs(secs),
                None => match identity.extended_self_test_minutes.get() {
                    Some(minutes) if minutes > 0 => {
                        Duration::from_secs(u64::from(minutes) * 60 * 2)
                    }
                    _ => EXTENDED_FALLBACK,
                },
            },
            SelfTestKind::Short | SelfTestKind::VendorSpecific => {
                Duration::from_secs(self.short_timeout_secs)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLogConfig {
    pub max_entries: usize,
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_ERROR_LOG_ENTRIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use nvme_types::Reading;

    use super::*;

    fn identity(edstt: Reading<u16>) -> DeviceIdentity {
        DeviceIdentity {
            device: "/dev/nvme0".to_string(),
            model: "Model".to_string(),
            serial: "SN1".to_string(),
            firmware_revision: Reading::Unknown,
            controller_id: Reading::Unknown,
            vendor_id: Reading::Unknown,
            extended_self_test_minutes: edstt,
            total_capacity_bytes: Reading::Unknown,
        }
    }

    #[test]
    fn extended_timeout_follows_edstt() {
        let config = SelfTestConfig::default();
        assert_eq!(
            config.timeout_for(SelfTestKind::Extended, &identity(Reading::Known(35))),
            Duration::from_secs(70 * 60)
        );
        assert_eq!(
            config.timeout_for(SelfTestKind::Extended, &identity(Reading::Unknown)),
            EXTENDED_FALLBACK
        );
        assert_eq!(
            config.timeout_for(SelfTestKind::Short, &identity(Reading::Known(35))),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn explicit_extended_timeout_wins() {
        let config = SelfTestConfig {
            extended_timeout_secs: Some(90),
            ..SelfTestConfig::default()
        };
        assert_eq!(
            config.timeout_for(SelfTestKind::Extended, &identity(Reading::Known(35))),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn context_carries_configured_values() {
        let mut config = InspectConfig::default();
        config.error_log.max_entries = 8;
        config.health.high_temp_threshold_c = 60;

        let ctx = config.context("/dev/nvme1");
        assert_eq!(ctx.device, "/dev/nvme1");
        assert_eq!(ctx.error_log_entries, 8);
        assert_eq!(ctx.thresholds.high_temp_threshold_c, 60);
    }
}
