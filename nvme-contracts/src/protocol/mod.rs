// SPDX-License-Identifier: GPL-3.0-only

pub mod errors;
pub mod ids;

pub use errors::{NvmeError, NvmeErrorKind};
pub use ids::SelfTestId;
