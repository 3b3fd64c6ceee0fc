// SPDX-License-Identifier: GPL-3.0-only

//! nvme-cli operations for device health inspection
//!
//! This crate shells out to the `nvme` utility, which does the actual
//! protocol work:
//! - Reading identify data and log pages as JSON
//! - Starting and aborting device self-tests
//! - Enumerating devices
//!
//! Reading log pages usually requires root; permission failures surface as
//! `SourceUnavailable` through the `RecordSource` implementation.

pub mod cli;
pub mod error;
pub mod list;
pub mod source;

pub use cli::NvmeCli;
pub use error::{Result, SysError};
pub use list::{NvmeDevice, parse_list_output};
