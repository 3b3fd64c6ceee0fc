// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one self-test run for logging and correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelfTestId(Uuid);

impl SelfTestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SelfTestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SelfTestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
