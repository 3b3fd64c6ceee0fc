// SPDX-License-Identifier: GPL-3.0-only

//! Self-test lifecycle as data
//!
//! [`transition`] is pure: the async driver feeds it observations together
//! with the elapsed time and never mutates state any other way.

use std::time::Duration;

use nvme_contracts::NvmeError;
use nvme_types::{Reading, SelfTestKind, SelfTestLog, SelfTestRecord, SelfTestResult};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SelfTestState {
    Idle,
    Requested,
    InProgress { percent_complete: Reading<u8> },
    CompletedOk,
    CompletedWithError,
    Aborted,
    TimedOut,
    Failed { reason: FailureReason },
}

impl SelfTestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CompletedOk
                | Self::CompletedWithError
                | Self::Aborted
                | Self::TimedOut
                | Self::Failed { .. }
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requested => "requested",
            Self::InProgress { .. } => "in_progress",
            Self::CompletedOk => "completed_ok",
            Self::CompletedWithError => "completed_with_error",
            Self::Aborted => "aborted",
            Self::TimedOut => "timed_out",
            Self::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for SelfTestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed ({reason})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Why a self-test ended in `failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FailureReason {
    ProgressRegressed { from: u8, to: u8 },
    IdentityMismatch { expected: String, found: String },
    AbortFailed { message: String },
    UnknownResult,
    PollFailed { message: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProgressRegressed { from, to } => {
                write!(f, "progress went from {from}% back to {to}%")
            }
            Self::IdentityMismatch { expected, found } => {
                write!(f, "serial changed from {expected} to {found}")
            }
            Self::AbortFailed { message } => write!(f, "abort failed: {message}"),
            Self::UnknownResult => f.write_str("device reported an unknown result"),
            Self::PollFailed { message } => write!(f, "polling failed: {message}"),
        }
    }
}

/// What the driver saw since the previous transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Serial number read back from the device
    Identity { serial: String },
    /// Freshly normalized self-test log
    Log(SelfTestLog),
    /// Time passed without a usable reading
    Tick,
    AbortAcknowledged,
    AbortFailed { message: String },
    PollFailed { message: String },
}

/// Fixed facts a transition is judged against
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub expected_serial: &'a str,
    /// Self-test log as it was when the test was requested
    pub baseline: &'a SelfTestLog,
    /// Time since the test was requested
    pub elapsed: Duration,
    pub timeout: Duration,
}

/// Next step the driver should take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Poll,
    Abort,
    Stop,
}

pub fn next_action(state: &SelfTestState, cancelled: bool) -> Action {
    if state.is_terminal() {
        Action::Stop
    } else if cancelled {
        Action::Abort
    } else {
        Action::Poll
    }
}

pub fn transition(
    state: &SelfTestState,
    observation: &Observation,
    ctx: &TransitionContext<'_>,
) -> SelfTestState {
    if state.is_terminal() || *state == SelfTestState::Idle {
        return state.clone();
    }

    match observation {
        Observation::AbortAcknowledged => return SelfTestState::Aborted,
        Observation::AbortFailed { message } => {
            return SelfTestState::Failed {
                reason: FailureReason::AbortFailed {
                    message: message.clone(),
                },
            };
        }
        _ => {}
    }

    if ctx.elapsed > ctx.timeout {
        return SelfTestState::TimedOut;
    }

    match observation {
        Observation::Identity { serial } if serial != ctx.expected_serial => {
            SelfTestState::Failed {
                reason: FailureReason::IdentityMismatch {
                    expected: ctx.expected_serial.to_string(),
                    found: serial.clone(),
                },
            }
        }
        Observation::Log(log) => observe_log(state, log, ctx.baseline),
        Observation::PollFailed { message } => SelfTestState::Failed {
            reason: FailureReason::PollFailed {
                message: message.clone(),
            },
        },
        _ => state.clone(),
    }
}

fn observe_log(state: &SelfTestState, log: &SelfTestLog, baseline: &SelfTestLog) -> SelfTestState {
    if let Some(current) = &log.current {
        return match state {
            SelfTestState::InProgress {
                percent_complete: Reading::Known(previous),
            } => match current.percent_complete {
                Reading::Known(percent) if percent < *previous => SelfTestState::Failed {
                    reason: FailureReason::ProgressRegressed {
                        from: *previous,
                        to: percent,
                    },
                },
                Reading::Known(percent) => SelfTestState::InProgress {
                    percent_complete: Reading::Known(percent),
                },
                Reading::Unknown => state.clone(),
            },
            _ => SelfTestState::InProgress {
                percent_complete: current.percent_complete,
            },
        };
    }

    // A result history identical to the baseline carries nothing new
    if log.results == baseline.results {
        return state.clone();
    }

    match log.results.first().map(|record| record.result) {
        Some(result) => terminal_state(result).unwrap_or_else(|| state.clone()),
        None => state.clone(),
    }
}

fn terminal_state(result: SelfTestResult) -> Option<SelfTestState> {
    let state = match result {
        SelfTestResult::InProgress => return None,
        SelfTestResult::CompletedNoError => SelfTestState::CompletedOk,
        SelfTestResult::CompletedWithError => SelfTestState::CompletedWithError,
        SelfTestResult::AbortedByHost | SelfTestResult::AbortedByController => {
            SelfTestState::Aborted
        }
        SelfTestResult::Unknown => SelfTestState::Failed {
            reason: FailureReason::UnknownResult,
        },
    };
    Some(state)
}

/// Lifecycle of one self-test on one device
#[derive(Debug, Clone)]
pub struct SelfTestMachine {
    device: String,
    kind: SelfTestKind,
    expected_serial: String,
    baseline: SelfTestLog,
    state: SelfTestState,
    observed_percentages: Vec<u8>,
    final_record: Option<SelfTestRecord>,
}

impl SelfTestMachine {
    pub fn new(
        device: impl Into<String>,
        kind: SelfTestKind,
        expected_serial: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            kind,
            expected_serial: expected_serial.into(),
            baseline: SelfTestLog::default(),
            state: SelfTestState::Idle,
            observed_percentages: Vec::new(),
            final_record: None,
        }
    }

    /// Move from `idle` to `requested`, remembering the log seen at request time
    pub fn request(&mut self, baseline: SelfTestLog) -> Result<(), NvmeError> {
        if self.kind == SelfTestKind::VendorSpecific {
            return Err(NvmeError::UnsupportedTestType {
                requested: self.kind.to_string(),
            });
        }
        if self.state != SelfTestState::Idle || baseline.is_running() {
            return Err(NvmeError::TestAlreadyRunning {
                device: self.device.clone(),
            });
        }

        self.baseline = baseline;
        self.set_state(SelfTestState::Requested);
        Ok(())
    }

    pub fn apply(
        &mut self,
        observation: &Observation,
        elapsed: Duration,
        timeout: Duration,
    ) -> &SelfTestState {
        let ctx = TransitionContext {
            expected_serial: &self.expected_serial,
            baseline: &self.baseline,
            elapsed,
            timeout,
        };
        let next = transition(&self.state, observation, &ctx);

        if let SelfTestState::InProgress {
            percent_complete: Reading::Known(percent),
        } = next
        {
            self.record_percent(percent);
        }

        if next.is_terminal() && !self.state.is_terminal() {
            self.final_record = Some(self.final_record_for(&next, observation));
            if next == SelfTestState::CompletedOk {
                self.record_percent(100);
            }
        }

        self.set_state(next);
        &self.state
    }

    fn record_percent(&mut self, percent: u8) {
        if self.observed_percentages.last() != Some(&percent) {
            self.observed_percentages.push(percent);
        }
    }

    fn final_record_for(&self, next: &SelfTestState, observation: &Observation) -> SelfTestRecord {
        if let Observation::Log(log) = observation {
            if let (None, Some(record)) = (&log.current, log.results.first()) {
                return record.clone();
            }
        }

        let result = match next {
            SelfTestState::Aborted => SelfTestResult::AbortedByHost,
            SelfTestState::CompletedOk => SelfTestResult::CompletedNoError,
            SelfTestState::CompletedWithError => SelfTestResult::CompletedWithError,
            _ => SelfTestResult::Unknown,
        };
        SelfTestRecord {
            kind: self.kind,
            result,
            percent_complete: self.last_percent(),
            power_on_hours: Reading::Unknown,
        }
    }

    fn last_percent(&self) -> Reading<u8> {
        self.observed_percentages.last().copied().into()
    }

    fn set_state(&mut self, next: SelfTestState) {
        if next != self.state {
            info!(
                "Self-test on {}: {} -> {}",
                self.device,
                self.state.as_str(),
                next
            );
        }
        self.state = next;
    }

    pub fn state(&self) -> &SelfTestState {
        &self.state
    }

    pub fn kind(&self) -> SelfTestKind {
        self.kind
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Known percentages in observation order, ending at 100 on success
    pub fn observed_percentages(&self) -> &[u8] {
        &self.observed_percentages
    }

    /// Record describing the test as the machine currently sees it
    pub fn current_record(&self) -> SelfTestRecord {
        if let Some(record) = &self.final_record {
            return record.clone();
        }

        let percent_complete = match &self.state {
            SelfTestState::InProgress { percent_complete } => *percent_complete,
            _ => self.last_percent(),
        };
        SelfTestRecord {
            kind: self.kind,
            result: SelfTestResult::InProgress,
            percent_complete,
            power_on_hours: Reading::Unknown,
        }
    }
}
