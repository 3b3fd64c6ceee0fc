use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nvme_contracts::{NvmeError, RawRecord, RecordSource};
use nvme_types::SelfTestKind;
use serde_json::Value;

use super::fixtures;

type Reply = Result<RawRecord, NvmeError>;

/// Replies handed out in order; the last one repeats forever
#[derive(Debug)]
struct Script {
    pending: VecDeque<Reply>,
    last: Reply,
}

impl Script {
    fn new(replies: Vec<Reply>) -> Self {
        let last = replies.last().cloned().unwrap_or(Ok(Value::Null));
        Self {
            pending: replies.into(),
            last,
        }
    }

    fn next_reply(&mut self) -> Reply {
        self.pending.pop_front().unwrap_or_else(|| self.last.clone())
    }
}

/// In-memory `RecordSource` that replays scripted nvme-cli output
#[derive(Debug)]
pub struct ScriptedSource {
    identity: Mutex<Script>,
    firmware_slots: Mutex<Script>,
    health: Mutex<Script>,
    error_log: Mutex<Script>,
    self_test_log: Mutex<Script>,
    start: Mutex<Result<(), NvmeError>>,
    abort: Mutex<Result<(), NvmeError>>,

    pub identity_reads: AtomicUsize,
    pub self_test_reads: AtomicUsize,
    pub starts: AtomicUsize,
    pub aborts: AtomicUsize,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self {
            identity: Mutex::new(Script::new(vec![Ok(fixtures::id_ctrl(fixtures::SERIAL))])),
            firmware_slots: Mutex::new(Script::new(vec![Ok(fixtures::fw_log())])),
            health: Mutex::new(Script::new(vec![Ok(fixtures::smart_log())])),
            error_log: Mutex::new(Script::new(vec![Ok(fixtures::error_log())])),
            self_test_log: Mutex::new(Script::new(vec![Ok(fixtures::self_test_idle())])),
            start: Mutex::new(Ok(())),
            abort: Mutex::new(Ok(())),
            identity_reads: AtomicUsize::new(0),
            self_test_reads: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            aborts: AtomicUsize::new(0),
        }
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(self, replies: Vec<Reply>) -> Self {
        *self.identity.lock().unwrap() = Script::new(replies);
        self
    }

    pub fn with_firmware_slots(self, reply: Reply) -> Self {
        *self.firmware_slots.lock().unwrap() = Script::new(vec![reply]);
        self
    }

    pub fn with_health(self, reply: Reply) -> Self {
        *self.health.lock().unwrap() = Script::new(vec![reply]);
        self
    }

    pub fn with_error_log(self, reply: Reply) -> Self {
        *self.error_log.lock().unwrap() = Script::new(vec![reply]);
        self
    }

    pub fn with_self_test_log(self, replies: Vec<Reply>) -> Self {
        *self.self_test_log.lock().unwrap() = Script::new(replies);
        self
    }

    pub fn with_abort_result(self, result: Result<(), NvmeError>) -> Self {
        *self.abort.lock().unwrap() = result;
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn identity(&self, _device: &str) -> Result<RawRecord, NvmeError> {
        self.identity_reads.fetch_add(1, Ordering::SeqCst);
        self.identity.lock().unwrap().next_reply()
    }

    async fn firmware_slots(&self, _device: &str) -> Result<RawRecord, NvmeError> {
        self.firmware_slots.lock().unwrap().next_reply()
    }

    async fn health_log(&self, _device: &str) -> Result<RawRecord, NvmeError> {
        self.health.lock().unwrap().next_reply()
    }

    async fn error_log(&self, _device: &str, _max_entries: usize) -> Result<RawRecord, NvmeError> {
        self.error_log.lock().unwrap().next_reply()
    }

    async fn self_test_log(&self, _device: &str) -> Result<RawRecord, NvmeError> {
        self.self_test_reads.fetch_add(1, Ordering::SeqCst);
        self.self_test_log.lock().unwrap().next_reply()
    }

    async fn start_self_test(&self, _device: &str, _kind: SelfTestKind) -> Result<(), NvmeError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.start.lock().unwrap().clone()
    }

    async fn abort_self_test(&self, _device: &str) -> Result<(), NvmeError> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.abort.lock().unwrap().clone()
    }
}
