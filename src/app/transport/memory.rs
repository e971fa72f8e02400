//! In-memory transport with scriptable fetch failures
//!
//! Holds a fixed history and records every fetch attempt, which makes it the
//! transport of choice for embedding callers that already have messages and
//! for exercising retry and scheduling behavior.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{MessageStream, Transport};
use crate::app::models::{MediaClass, Message};
use crate::errors::{DownloadError, DownloadResult, TransportError, TransportResult};

/// Failure injected into a fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Fails like a locked or read-only target file
    PermissionDenied,
    /// Fails like a dropped transfer
    Transfer,
}

/// One recorded fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub message_id: i64,
    pub path: PathBuf,
    pub succeeded: bool,
}

#[derive(Debug, Default)]
struct InFlight {
    current: HashMap<MediaClass, usize>,
    peak: HashMap<MediaClass, usize>,
}

/// Transport serving a fixed list of messages
#[derive(Debug, Default)]
pub struct MemoryTransport {
    chat_id: i64,
    messages: Vec<Message>,
    failures: Mutex<HashMap<i64, VecDeque<ScriptedFailure>>>,
    fetches: Mutex<Vec<FetchRecord>>,
    in_flight: Mutex<InFlight>,
    pulled: Arc<AtomicUsize>,
    fetch_delay: Duration,
    fail_stream_after: Option<usize>,
}

impl MemoryTransport {
    /// Serve `messages` as the history of `chat_id`; order does not matter
    pub fn new(chat_id: i64, mut messages: Vec<Message>) -> Self {
        messages.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Self {
            chat_id,
            messages,
            ..Default::default()
        }
    }

    /// Fail the next fetches of `message_id` with `failures`, in order
    pub fn script_failures(
        self,
        message_id: i64,
        failures: impl IntoIterator<Item = ScriptedFailure>,
    ) -> Self {
        self.lock_failures()
            .entry(message_id)
            .or_default()
            .extend(failures);
        self
    }

    /// Make every fetch take `delay`
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Yield a connection error after `count` messages have been pulled
    pub fn fail_stream_after(mut self, count: usize) -> Self {
        self.fail_stream_after = Some(count);
        self
    }

    /// Every fetch attempt so far
    pub fn fetches(&self) -> Vec<FetchRecord> {
        self.fetches
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of successful fetches
    pub fn successful_fetches(&self) -> usize {
        self.fetches().iter().filter(|r| r.succeeded).count()
    }

    /// Number of messages pulled from history streams
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous fetches seen for a class
    pub fn peak_in_flight(&self, class: MediaClass) -> usize {
        self.in_flight
            .lock()
            .map(|state| state.peak.get(&class).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, HashMap<i64, VecDeque<ScriptedFailure>>> {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_failure(&self, message_id: i64) -> Option<ScriptedFailure> {
        self.lock_failures()
            .get_mut(&message_id)
            .and_then(VecDeque::pop_front)
    }

    fn record(&self, message_id: i64, path: &Path, succeeded: bool) {
        if let Ok(mut records) = self.fetches.lock() {
            records.push(FetchRecord {
                message_id,
                path: path.to_path_buf(),
                succeeded,
            });
        }
    }

    fn enter(&self, class: Option<MediaClass>) {
        let (Some(class), Ok(mut state)) = (class, self.in_flight.lock()) else {
            return;
        };
        let current = state.current.entry(class).or_insert(0);
        *current += 1;
        let now = *current;
        let peak = state.peak.entry(class).or_insert(0);
        *peak = (*peak).max(now);
    }

    fn leave(&self, class: Option<MediaClass>) {
        let (Some(class), Ok(mut state)) = (class, self.in_flight.lock()) else {
            return;
        };
        if let Some(current) = state.current.get_mut(&class) {
            *current = current.saturating_sub(1);
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn history(&self, chat_id: Option<i64>, limit: usize) -> TransportResult<MessageStream> {
        if let Some(id) = chat_id {
            if id != self.chat_id {
                return Err(TransportError::ChatNotFound { chat_id: id });
            }
        }

        let pulled = Arc::clone(&self.pulled);
        let mut items: Vec<TransportResult<Message>> =
            self.messages.iter().take(limit).cloned().map(Ok).collect();
        if let Some(after) = self.fail_stream_after {
            items.truncate(after);
            items.push(Err(TransportError::Connection {
                reason: "connection reset by peer".to_string(),
            }));
        }

        Ok(stream::iter(items)
            .map(move |item| {
                if item.is_ok() {
                    pulled.fetch_add(1, Ordering::SeqCst);
                }
                item
            })
            .boxed())
    }

    async fn fetch_bytes(&self, message: &Message, destination: &Path) -> DownloadResult<()> {
        let class = message.kind().class();
        self.enter(class);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        let result = match self.next_failure(message.id) {
            Some(ScriptedFailure::PermissionDenied) => Err(DownloadError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is locked by another process",
            ))),
            Some(ScriptedFailure::Transfer) => Err(DownloadError::Transfer(
                "connection lost mid-transfer".to_string(),
            )),
            None => tokio::fs::write(destination, format!("message {}", message.id))
                .await
                .map_err(DownloadError::from),
        };

        self.record(message.id, destination, result.is_ok());
        self.leave(class);
        result
    }
}
