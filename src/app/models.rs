//! Data models for chat messages and download tasks
//!
//! Messages are owned by the transport; the core only reads them. Media is a
//! closed tagged union so every dispatch site has to handle every kind.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a message's attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    None,
    Photo,
    Video,
    Document,
    WebPage,
    Text,
}

impl MediaKind {
    /// Limiter class for downloadable kinds, `None` for kinds that never download
    pub fn class(self) -> Option<MediaClass> {
        match self {
            MediaKind::Video => Some(MediaClass::Heavy),
            MediaKind::Photo | MediaKind::Document => Some(MediaClass::Default),
            MediaKind::None | MediaKind::WebPage | MediaKind::Text => None,
        }
    }

    /// Human-readable label used in logs and reports
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::None => "none",
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::WebPage => "web page",
            MediaKind::Text => "text",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Concurrency class a download runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaClass {
    /// Photos and documents
    Default,
    /// Videos
    Heavy,
}

/// Kind-specific message payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageMedia {
    /// Photo; the transport does not name photos
    Photo,
    /// Video with its original file name, if any
    Video { file_name: Option<String> },
    /// Document with its original file name, if any
    Document { file_name: Option<String> },
    /// Link preview
    WebPage { url: String },
    /// Plain text
    Text { text: String },
    /// Nothing the harvester handles
    None,
}

impl MessageMedia {
    /// Media kind tag
    pub fn kind(&self) -> MediaKind {
        match self {
            MessageMedia::Photo => MediaKind::Photo,
            MessageMedia::Video { .. } => MediaKind::Video,
            MessageMedia::Document { .. } => MediaKind::Document,
            MessageMedia::WebPage { .. } => MediaKind::WebPage,
            MessageMedia::Text { .. } => MediaKind::Text,
            MessageMedia::None => MediaKind::None,
        }
    }
}

/// A single message from a chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier within the chat
    pub id: i64,
    /// Send time
    pub date: DateTime<Utc>,
    /// Attachment payload
    pub media: MessageMedia,
    /// Opaque handle the transport resolves when fetching bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Message {
    /// Create a message without a source handle
    pub fn new(id: i64, date: DateTime<Utc>, media: MessageMedia) -> Self {
        Self {
            id,
            date,
            media,
            source: None,
        }
    }

    /// Attach a transport source handle
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Media kind of this message
    pub fn kind(&self) -> MediaKind {
        self.media.kind()
    }

    /// Whether the message was sent before `cutoff`
    pub fn is_older_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.date < cutoff
    }
}

/// One download unit, consumed exactly once by a worker
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// Message whose bytes are fetched
    pub message: Message,
    /// Media kind being downloaded
    pub kind: MediaKind,
    /// Resolved target path
    pub path: PathBuf,
}

impl DownloadTask {
    pub fn new(message: Message, path: PathBuf) -> Self {
        let kind = message.kind();
        Self {
            message,
            kind,
            path,
        }
    }
}
