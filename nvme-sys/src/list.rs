// SPDX-License-Identifier: GPL-3.0-only

//! Device discovery from `nvme list -o json`
//!
//! nvme-cli 1.x prints a flat `Devices` array of namespaces; 2.x nests
//! controllers and namespaces under subsystems. Both layouts are accepted.

use serde::Serialize;
use serde_json::Value;

/// One NVMe device found by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NvmeDevice {
    /// Device node to inspect (e.g., "/dev/nvme0")
    pub device: String,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub firmware: Option<String>,

    /// Physical size in bytes, summed over namespaces when nested
    pub capacity_bytes: Option<u64>,
}

pub fn parse_list_output(output: &Value) -> Vec<NvmeDevice> {
    let Some(devices) = output.get("Devices").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for entry in devices {
        if let Some(subsystems) = entry.get("Subsystems").and_then(Value::as_array) {
            for subsystem in subsystems {
                found.extend(parse_subsystem(subsystem));
            }
        } else if let Some(device) = parse_flat_entry(entry) {
            found.push(device);
        }
    }

    found
}

fn parse_flat_entry(entry: &Value) -> Option<NvmeDevice> {
    let device = text(entry, "DevicePath")?;

    Some(NvmeDevice {
        device,
        model: text(entry, "ModelNumber"),
        serial: text(entry, "SerialNumber"),
        firmware: text(entry, "Firmware"),
        capacity_bytes: number(entry, "PhysicalSize").or_else(|| number(entry, "UsedBytes")),
    })
}

fn parse_subsystem(subsystem: &Value) -> Vec<NvmeDevice> {
    let Some(controllers) = subsystem.get("Controllers").and_then(Value::as_array) else {
        return Vec::new();
    };

    controllers
        .iter()
        .filter_map(|controller| {
            let name = text(controller, "Controller")?;
            let device = if name.starts_with("/dev/") {
                name
            } else {
                format!("/dev/{name}")
            };

            let namespaces = controller
                .get("Namespaces")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let capacity_bytes = namespaces
                .iter()
                .filter_map(|ns| number(ns, "PhysicalSize"))
                .reduce(|a, b| a.saturating_add(b));

            Some(NvmeDevice {
                device,
                model: text(controller, "ModelNumber"),
                serial: text(controller, "SerialNumber"),
                firmware: text(controller, "Firmware"),
                capacity_bytes,
            })
        })
        .collect()
}

fn text(value: &Value, key: &str) -> Option<String> {
    let s = value.get(key)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn number(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
