// SPDX-License-Identifier: GPL-3.0-only

//! Low-level nvme-cli operations
//!
//! Wraps the `nvme` command-line tool. Every read uses `-o json` so callers
//! get structured payloads instead of the human-readable tables.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, warn};
use which::which;

use crate::error::{Result, SysError};
use crate::list::{NvmeDevice, parse_list_output};

/// nvme-cli wrapper
#[derive(Debug, Clone)]
pub struct NvmeCli {
    /// Path to the nvme binary
    binary_path: PathBuf,
}

impl NvmeCli {
    /// Create a new nvme-cli wrapper
    ///
    /// Returns an error if nvme-cli is not installed
    pub fn new() -> Result<Self> {
        let binary_path = Self::find_nvme_binary()?;
        info!("Found nvme binary at {:?}", binary_path);
        Ok(Self { binary_path })
    }

    /// Use an explicit binary instead of searching PATH
    pub fn with_binary(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Find the nvme binary in PATH
    pub fn find_nvme_binary() -> Result<PathBuf> {
        which("nvme").map_err(|_| SysError::NvmeNotFound)
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Run an nvme subcommand and return its stdout
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let rendered = render("nvme", args);
        debug!("Running {rendered}");

        let output = Command::new(&self.binary_path)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SysError::NvmeNotFound,
                std::io::ErrorKind::PermissionDenied => {
                    SysError::PermissionDenied(format!("cannot execute {rendered}: {e}"))
                }
                _ => SysError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("{rendered} failed: {}", stderr.trim());
            return Err(classify_failure(&rendered, args, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run an nvme subcommand and parse its stdout as JSON
    pub async fn run_json(&self, args: &[&str]) -> Result<serde_json::Value> {
        let stdout = self.run(args).await?;
        serde_json::from_str(&stdout).map_err(|e| SysError::InvalidOutput {
            command: render("nvme", args),
            reason: e.to_string(),
        })
    }

    /// Enumerate NVMe devices using `nvme list`
    pub async fn list_devices(&self) -> Result<Vec<NvmeDevice>> {
        let output = self.run_json(&["list", "-o", "json"]).await?;
        let devices = parse_list_output(&output);
        debug!("Found {} NVMe devices", devices.len());
        Ok(devices)
    }
}

pub(crate) fn render(command: &str, args: &[&str]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}

/// Map a failed invocation to an error using the messages nvme-cli prints
pub(crate) fn classify_failure(command: &str, args: &[&str], stderr: &str) -> SysError {
    let lowered = stderr.to_lowercase();
    let device = args
        .iter()
        .find(|arg| arg.starts_with("/dev/"))
        .map(|arg| arg.to_string());

    if lowered.contains("permission denied") || lowered.contains("operation not permitted") {
        return SysError::PermissionDenied(format!("{command}: {}", stderr.trim()));
    }

    if lowered.contains("no such file or directory") || lowered.contains("no such device") {
        return SysError::DeviceNotFound(device.unwrap_or_else(|| command.to_string()));
    }

    SysError::CommandFailed {
        command: command.to_string(),
        stderr: stderr.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_command_context() {
        let rendered = render("nvme", &["smart-log", "/dev/nvme0", "-o", "json"]);
        assert_eq!(rendered, "nvme smart-log /dev/nvme0 -o json");
    }

    #[test]
    fn classifies_missing_device() {
        let args = ["smart-log", "/dev/nvme9", "-o", "json"];
        let error = classify_failure(
            "nvme smart-log /dev/nvme9 -o json",
            &args,
            "open: No such file or directory\n",
        );
        assert!(matches!(error, SysError::DeviceNotFound(device) if device == "/dev/nvme9"));
    }

    #[test]
    fn classifies_permission_problems() {
        let args = ["id-ctrl", "/dev/nvme0", "-o", "json"];
        let error = classify_failure(
            "nvme id-ctrl /dev/nvme0 -o json",
            &args,
            "Permission denied",
        );
        assert!(matches!(error, SysError::PermissionDenied(_)));

        let error = classify_failure("nvme", &args, "NVMe status: INVALID_FIELD(0x2)");
        assert!(matches!(error, SysError::CommandFailed { .. }));
    }
}
