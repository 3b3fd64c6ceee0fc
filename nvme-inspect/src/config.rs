// SPDX-License-Identifier: GPL-3.0-only

//! On-disk configuration for the CLI
//!
//! Looked up at `$XDG_CONFIG_HOME/nvme-inspect/config.toml` (or
//! `~/.config/nvme-inspect/config.toml`) unless `--config` names a file.
//! A missing default file means defaults; a missing explicit file is an error.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use nvme_health::{ErrorLogConfig, HealthThresholds, InspectConfig, SelfTestConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "nvme-inspect";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid config {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LoggingLevel,
    /// Also write a daily rolling log file here
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    pub health: HealthThresholds,
    pub self_test: SelfTestConfig,
    pub error_log: ErrorLogConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Self::read(path)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        };

        let raw = fs::read_to_string(path).map_err(|error| invalid(error.to_string()))?;
        let config = Self::parse(&raw).map_err(invalid)?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(raw).map_err(|error| error.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.self_test.poll_interval_ms == 0 {
            return Err("self_test.poll_interval_ms must be greater than zero".to_string());
        }
        if self.self_test.short_timeout_secs == 0 {
            return Err("self_test.short_timeout_secs must be greater than zero".to_string());
        }
        if self.self_test.extended_timeout_secs == Some(0) {
            return Err("self_test.extended_timeout_secs must be greater than zero".to_string());
        }
        if self.error_log.max_entries == 0 {
            return Err("error_log.max_entries must be greater than zero".to_string());
        }
        if self.health.spare_warn_margin > 100 {
            return Err("health.spare_warn_margin must be at most 100".to_string());
        }
        Ok(())
    }

    pub fn inspect(&self) -> InspectConfig {
        InspectConfig {
            health: self.health,
            self_test: self.self_test.clone(),
            error_log: self.error_log.clone(),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE));
    }

    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE)
    })
}
