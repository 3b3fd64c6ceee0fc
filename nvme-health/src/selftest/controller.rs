// SPDX-License-Identifier: GPL-3.0-only

//! Async driver for a running self-test

use std::sync::Arc;
use std::time::Duration;

use nvme_contracts::{NvmeError, RecordSource, SelfTestId};
use nvme_types::{SelfTestKind, SelfTestLog, SelfTestRecord};
use serde::Serialize;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::machine::{
    Action, FailureReason, Observation, SelfTestMachine, SelfTestState, next_action,
};
use crate::normalize::{normalize_self_test_log, serial_number};

/// How often the device is polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Floor under `interval`; polls never come closer together than this
    pub min_interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            min_interval: Duration::from_secs(1),
        }
    }
}

impl PollOptions {
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(self.min_interval)
    }
}

/// Final report of a driven self-test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfTestOutcome {
    pub id: SelfTestId,
    pub device: String,
    pub kind: SelfTestKind,
    pub state: SelfTestState,
    pub record: SelfTestRecord,
    pub observed_percentages: Vec<u8>,
    pub polls: usize,
}

/// Start a self-test and return a handle that tracks it
///
/// The serial number and self-test log are read before the start command is
/// issued; a test already running on the device is refused.
pub async fn start_self_test(
    source: Arc<dyn RecordSource>,
    device: &str,
    kind: SelfTestKind,
    timeout: Duration,
    options: PollOptions,
) -> Result<SelfTestHandle, NvmeError> {
    if kind == SelfTestKind::VendorSpecific {
        return Err(NvmeError::UnsupportedTestType {
            requested: kind.to_string(),
        });
    }

    let serial = serial_number(&source.identity(device).await?)?;
    let baseline = read_log(&*source, device).await?;

    let mut machine = SelfTestMachine::new(device, kind, serial);
    machine.request(baseline)?;

    source.start_self_test(device, kind).await?;

    let id = SelfTestId::new();
    info!(%id, "Started {kind} self-test on {device}, timeout {}s", timeout.as_secs());

    Ok(SelfTestHandle {
        id,
        source,
        machine,
        timeout,
        options,
        requested_at: Instant::now(),
        last_poll: None,
        token: CancellationToken::new(),
        polls: 0,
    })
}

async fn read_log(source: &dyn RecordSource, device: &str) -> Result<SelfTestLog, NvmeError> {
    let normalized = normalize_self_test_log(&source.self_test_log(device).await?)?;
    for issue in &normalized.issues {
        debug!("{device}: self-test log {:?}: {}", issue.field, issue.message);
    }
    Ok(normalized.value)
}

/// A self-test in flight on one device
pub struct SelfTestHandle {
    id: SelfTestId,
    source: Arc<dyn RecordSource>,
    machine: SelfTestMachine,
    timeout: Duration,
    options: PollOptions,
    requested_at: Instant,
    last_poll: Option<Instant>,
    token: CancellationToken,
    polls: usize,
}

impl std::fmt::Debug for SelfTestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfTestHandle")
            .field("id", &self.id)
            .field("device", &self.machine.device())
            .field("state", self.machine.state())
            .field("polls", &self.polls)
            .finish()
    }
}

impl SelfTestHandle {
    pub fn id(&self) -> SelfTestId {
        self.id
    }

    pub fn device(&self) -> &str {
        self.machine.device()
    }

    pub fn state(&self) -> &SelfTestState {
        self.machine.state()
    }

    pub fn polls(&self) -> usize {
        self.polls
    }

    /// Token that cancels this test from another task
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn elapsed(&self) -> Duration {
        self.requested_at.elapsed()
    }

    fn observe(&mut self, observation: Observation) {
        let elapsed = self.elapsed();
        self.machine.apply(&observation, elapsed, self.timeout);
    }

    /// Poll the device once and advance the lifecycle
    ///
    /// Terminal tests return their record without touching the device. A
    /// serial number change fails the test and is returned as an error.
    pub async fn poll(&mut self) -> Result<SelfTestRecord, NvmeError> {
        if self.machine.is_terminal() {
            return Ok(self.machine.current_record());
        }
        if self.token.is_cancelled() {
            return Ok(self.cancel().await);
        }

        if let Some(last) = self.last_poll {
            tokio::select! {
                _ = sleep_until(last + self.options.min_interval) => {}
                _ = self.token.cancelled() => {}
            }
        }
        if self.token.is_cancelled() {
            return Ok(self.cancel().await);
        }

        // Timed out before the poll goes out
        self.observe(Observation::Tick);
        if self.machine.is_terminal() {
            return Ok(self.machine.current_record());
        }

        self.last_poll = Some(Instant::now());
        self.polls += 1;
        let device = self.machine.device().to_string();

        let serial = match self.source.identity(&device).await {
            Ok(raw) => serial_number(&raw),
            Err(error) => Err(error),
        };
        match serial {
            Ok(serial) => self.observe(Observation::Identity { serial }),
            Err(error) => {
                self.poll_failed(&device, error);
                return Ok(self.machine.current_record());
            }
        }

        if let SelfTestState::Failed {
            reason: FailureReason::IdentityMismatch { expected, found },
        } = self.machine.state()
        {
            return Err(NvmeError::DeviceIdentityMismatch {
                device,
                expected: expected.clone(),
                found: found.clone(),
            });
        }
        if self.machine.is_terminal() {
            return Ok(self.machine.current_record());
        }

        match read_log(&*self.source, &device).await {
            Ok(log) => self.observe(Observation::Log(log)),
            Err(error) => self.poll_failed(&device, error),
        }

        Ok(self.machine.current_record())
    }

    /// Fatal source errors end the test; anything else is retried next poll
    fn poll_failed(&mut self, device: &str, error: NvmeError) {
        if error.is_fatal() {
            warn!(id = %self.id, "Self-test poll on {device} failed: {error}");
            self.observe(Observation::PollFailed {
                message: error.to_string(),
            });
        } else {
            debug!(id = %self.id, "Self-test poll on {device} degraded: {error}");
            self.observe(Observation::Tick);
        }
    }

    /// Abort the test on the device
    ///
    /// The test is `aborted` once the device accepts the abort and `failed`
    /// when the abort itself errors.
    pub async fn cancel(&mut self) -> SelfTestRecord {
        if self.machine.is_terminal() {
            return self.machine.current_record();
        }
        self.token.cancel();

        let device = self.machine.device().to_string();
        info!(id = %self.id, "Aborting self-test on {device}");
        let observation = match self.source.abort_self_test(&device).await {
            Ok(()) => Observation::AbortAcknowledged,
            Err(error) => {
                warn!(id = %self.id, "Abort on {device} failed: {error}");
                Observation::AbortFailed {
                    message: error.to_string(),
                }
            }
        };
        self.observe(observation);
        self.machine.current_record()
    }

    /// Poll until the test reaches a terminal state
    pub async fn run(mut self) -> SelfTestOutcome {
        loop {
            match next_action(self.machine.state(), self.token.is_cancelled()) {
                Action::Stop => break,
                Action::Abort => {
                    self.cancel().await;
                }
                Action::Poll => {
                    if let Err(error) = self.poll().await {
                        warn!(id = %self.id, "{error}");
                    }
                    if self.machine.is_terminal() {
                        continue;
                    }
                    tokio::select! {
                        _ = sleep(self.options.effective_interval()) => {}
                        _ = self.token.cancelled() => {}
                    }
                }
            }
        }

        info!(
            id = %self.id,
            "Self-test on {} finished: {} after {} polls",
            self.machine.device(),
            self.machine.state(),
            self.polls
        );

        SelfTestOutcome {
            id: self.id,
            device: self.machine.device().to_string(),
            kind: self.machine.kind(),
            state: self.machine.state().clone(),
            record: self.machine.current_record(),
            observed_percentages: self.machine.observed_percentages().to_vec(),
            polls: self.polls,
        }
    }
}
