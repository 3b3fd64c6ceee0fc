// SPDX-License-Identifier: GPL-3.0-only

pub mod protocol;
pub mod traits;

pub use protocol::{NvmeError, NvmeErrorKind, SelfTestId};
pub use traits::{RawRecord, RecordSource};
