// SPDX-License-Identifier: GPL-3.0-only

//! Device self-test lifecycle
//!
//! `machine` holds the pure state machine, `controller` the tokio driver that
//! feeds it from a [`RecordSource`](nvme_contracts::RecordSource).

mod controller;
mod machine;

pub use controller::{PollOptions, SelfTestHandle, SelfTestOutcome, start_self_test};
pub use machine::{
    Action, FailureReason, Observation, SelfTestMachine, SelfTestState, TransitionContext,
    next_action, transition,
};
