use serde_json::{Value, json};

pub const DEVICE: &str = "/dev/nvme0";
pub const SERIAL: &str = "S4EWNX0R123456";

pub fn id_ctrl(serial: &str) -> Value {
    json!({
        "vid": 5197,
        "ssvid": 5197,
        "sn": format!("{serial}      "),
        "mn": "Samsung SSD 970 EVO Plus 1TB            ",
        "fr": "2B2QEXM7",
        "cntlid": 4,
        "edstt": 35,
        "tnvmcap": 1000204886016u64
    })
}

pub fn fw_log() -> Value {
    json!({
        "Firmware Logging Info": {
            "Active Firmware Slot (afi)": 1,
            "Firmware Rev Slot 1": "2B2QEXM7",
            "Firmware Rev Slot 2": "1B2QEXM7"
        }
    })
}

pub fn smart_log() -> Value {
    json!({
        "critical_warning": 0,
        "temperature": 311,
        "avail_spare": 100,
        "spare_thresh": 10,
        "percent_used": 4,
        "endurance_grp_critical_warning_summary": 0,
        "data_units_read": 42150397,
        "data_units_written": 51342091,
        "host_read_commands": 512338720,
        "host_write_commands": 894103384,
        "controller_busy_time": 2310,
        "power_cycles": 1032,
        "power_on_hours": 6021,
        "unsafe_shutdowns": 87,
        "media_errors": 0,
        "num_err_log_entries": 3,
        "warning_temp_time": 0,
        "critical_comp_time": 0,
        "temperature_sensor_1": 311,
        "temperature_sensor_2": 318,
        "thm_temp1_trans_count": 0,
        "thm_temp2_trans_count": 0,
        "thm_temp1_total_time": 0,
        "thm_temp2_total_time": 0
    })
}

/// Health payload with the given keys replaced (or removed when `null`)
pub fn smart_log_with(overrides: Value) -> Value {
    let mut log = smart_log();
    if let (Value::Object(log), Value::Object(overrides)) = (&mut log, overrides) {
        for (key, value) in overrides {
            if value.is_null() {
                log.remove(&key);
            } else {
                log.insert(key, value);
            }
        }
    }
    log
}

fn error_entry(error_count: u64, sqid: u16, cmdid: u16, status: u16, nsid: u32) -> Value {
    json!({
        "error_count": error_count,
        "sqid": sqid,
        "cmdid": cmdid,
        "status_field": status,
        "phase_tag": 0,
        "parm_error_location": 65535,
        "nsid": nsid,
        "lba": 0
    })
}

/// Newest first, one duplicated entry and one empty slot
pub fn error_log() -> Value {
    json!({
        "errors": [
            error_entry(3, 2, 17, 16388, 1),
            error_entry(2, 0, 9, 8194, 0),
            error_entry(2, 0, 9, 8194, 0),
            error_entry(0, 0, 0, 0, 0)
        ]
    })
}

fn result_entry(result: u8, code: u8, power_on_hours: u64) -> Value {
    json!({
        "Self test result": result,
        "Self test code": code,
        "Valid Diagnostic Information": 0,
        "Power on hours": power_on_hours,
        "Vendor Specific": 0
    })
}

/// Idle device with one short test in its history
pub fn self_test_idle() -> Value {
    json!({
        "Current Device Self-Test Operation": 0,
        "Current Device Self-Test Completion": 0,
        "Self Test Result0": result_entry(0, 1, 6000),
        "Self Test Result1": { "Self test result": 15 }
    })
}

pub fn self_test_running(code: u8, percent: u8) -> Value {
    json!({
        "Current Device Self-Test Operation": code,
        "Current Device Self-Test Completion": percent,
        "Self Test Result0": result_entry(0, 1, 6000),
        "Self Test Result1": { "Self test result": 15 }
    })
}

/// History after a new short test finished with `result`
pub fn self_test_finished(result: u8) -> Value {
    json!({
        "Current Device Self-Test Operation": 0,
        "Current Device Self-Test Completion": 0,
        "Self Test Result0": result_entry(result, 1, 6021),
        "Self Test Result1": result_entry(0, 1, 6000),
        "Self Test Result2": { "Self test result": 15 }
    })
}
