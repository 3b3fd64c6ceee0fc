// SPDX-License-Identifier: GPL-3.0-only

//! NVMe health inspection engine
//!
//! Turns raw nvme-cli records into a [`DeviceHealthSnapshot`] and drives
//! device self-tests:
//! - `normalize`: tolerant mapping of raw JSON into typed models
//! - `evaluate`: ok / warning / critical / unknown classification
//! - `reconcile`: ordered, de-duplicated error log
//! - `selftest`: self-test state machine and its async driver
//! - `report`: snapshot assembly and the `inspect` entry point
//!
//! Nothing here talks to a device directly; every read goes through a
//! [`RecordSource`](nvme_contracts::RecordSource).
//!
//! [`DeviceHealthSnapshot`]: nvme_types::DeviceHealthSnapshot

pub mod config;
pub mod evaluate;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod selftest;

pub use config::{ErrorLogConfig, InspectConfig, SelfTestConfig};
pub use evaluate::{HealthThresholds, evaluate};
pub use reconcile::reconcile_error_log;
pub use report::{DEFAULT_ERROR_LOG_ENTRIES, InspectContext, SnapshotParts, assemble, inspect};
pub use selftest::{
    PollOptions, SelfTestHandle, SelfTestOutcome, SelfTestState, start_self_test,
};
