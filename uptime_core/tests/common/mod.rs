#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uptime_core::config::SchedulerConfig;
use uptime_core::error::{AppError, Result};
use uptime_core::probe::{ProbeRequest, TransportError};
use uptime_core::{
    CheckValidator, EvaluationLogger, MemoryRecordStore, Notifier, ProbeExecutor, ProbeTransport, RecordStore,
    Scheduler,
};

pub const PHONE: &str = "254700000000";

pub fn check_id(n: usize) -> String {
    format!("check{:015}", n)
}

pub fn check_record(id: &str, url: &str, timeout_seconds: u64) -> Value {
    json!({
        "id": id,
        "phone": PHONE,
        "protocol": "http",
        "url": url,
        "method": "get",
        "successCodes": [200, 201],
        "timeoutSeconds": timeout_seconds
    })
}

#[derive(Clone)]
pub enum Reply {
    Status(u16),
    Fail(&'static str),
    Hang,
    After(Duration, u16),
}

/// Replies per URL are consumed in order; the last one repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, url: &str, replies: Vec<Reply>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(format!("http://{}", url), replies.into_iter().collect());
        self
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn send(&self, request: &ProbeRequest) -> std::result::Result<u16, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        match self.next_reply(&request.url) {
            Some(Reply::Status(status)) => Ok(status),
            Some(Reply::Fail(message)) => Err(TransportError::new(message)),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::After(delay, status)) => {
                tokio::time::sleep(delay).await;
                Ok(status)
            }
            None => Err(TransportError::new("unknown host")),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        if self.fail {
            Err(AppError::Notification("status code returned: 500".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Wraps a memory store and rejects every update.
pub struct ReadOnlyStore(pub MemoryRecordStore);

#[async_trait]
impl RecordStore for ReadOnlyStore {
    async fn create(&self, collection: &str, key: &str, record: &Value) -> Result<()> {
        self.0.create(collection, key, record).await
    }
    async fn read(&self, collection: &str, key: &str) -> Result<Value> {
        self.0.read(collection, key).await
    }
    async fn update(&self, _: &str, key: &str, _: &Value) -> Result<()> {
        Err(AppError::Persistence(format!("could not update {}", key)))
    }
    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        self.0.delete(collection, key).await
    }
    async fn list(&self, collection: &str) -> Result<Vec<String>> {
        self.0.list(collection).await
    }
}

pub struct Harness {
    pub store: Arc<dyn RecordStore>,
    pub transport: Arc<ScriptedTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub logs: TempDir,
    pub scheduler: Scheduler,
}

impl Harness {
    pub fn new(store: Arc<dyn RecordStore>, transport: ScriptedTransport, notifier: RecordingNotifier) -> Self {
        Self::with_config(store, transport, notifier, SchedulerConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn RecordStore>,
        transport: ScriptedTransport,
        notifier: RecordingNotifier,
        config: SchedulerConfig,
    ) -> Self {
        let transport = Arc::new(transport);
        let notifier = Arc::new(notifier);
        let logs = TempDir::new().unwrap();
        let scheduler = Scheduler::new(
            store.clone(),
            CheckValidator::default(),
            ProbeExecutor::new(transport.clone(), config.max_timeout()),
            EvaluationLogger::new(logs.path()),
            notifier.clone(),
            config,
        );
        Self {
            store,
            transport,
            notifier,
            logs,
            scheduler,
        }
    }

    pub fn logger(&self) -> EvaluationLogger {
        EvaluationLogger::new(self.logs.path())
    }

    pub async fn stored(&self, id: &str) -> Value {
        self.store.read("checks", id).await.unwrap()
    }
}
