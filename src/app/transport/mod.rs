//! Message transport capability
//!
//! A transport yields a chat's history newest first and can write the bytes
//! of a message's media to a path. The harvester never speaks a messaging
//! protocol itself; it only drives a [`Transport`].
//!
//! # Implementations
//!
//! - [`export::ExportTransport`] - serves a Telegram Desktop JSON export
//! - [`memory::MemoryTransport`] - in-memory, scriptable history

pub mod export;
pub mod memory;

use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::app::models::Message;
use crate::errors::{DownloadResult, TransportResult};

pub use export::ExportTransport;
pub use memory::{FetchRecord, MemoryTransport, ScriptedFailure};

/// Lazy, newest-first sequence of messages
pub type MessageStream = BoxStream<'static, TransportResult<Message>>;

/// History source and media fetcher
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the history of `chat_id` (or the only available chat), newest first,
    /// yielding at most `limit` messages
    async fn history(&self, chat_id: Option<i64>, limit: usize) -> TransportResult<MessageStream>;

    /// Write the media bytes of `message` to `destination`
    async fn fetch_bytes(&self, message: &Message, destination: &Path) -> DownloadResult<()>;
}
