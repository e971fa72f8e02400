//! Telegram Desktop export transport
//!
//! Serves the history stored in a "Export chat history" directory: a
//! `result.json` document next to the exported media tree. Both single-chat
//! exports and full-account exports (`chats.list`) are understood.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use super::{MessageStream, Transport};
use crate::app::models::{Message, MessageMedia};
use crate::constants::export;
use crate::errors::{DownloadError, DownloadResult, TransportError, TransportResult};

/// Transport over a Telegram Desktop JSON export
#[derive(Debug, Clone)]
pub struct ExportTransport {
    root: PathBuf,
}

impl ExportTransport {
    /// Use the export directory at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Export directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load(&self) -> TransportResult<ExportDocument> {
        let path = self.root.join(export::RESULT_FILE);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(TransportError::ExportNotFound { path });
        }

        let content = tokio::fs::read(&path).await?;
        let document: ExportDocument = serde_json::from_slice(&content)?;
        Ok(document)
    }

    fn source_path(&self, message: &Message) -> DownloadResult<PathBuf> {
        let source = message
            .source
            .as_deref()
            .ok_or(DownloadError::NoMedia {
                message_id: message.id,
            })?;

        if source.starts_with(export::NOT_INCLUDED_PREFIX) {
            return Err(DownloadError::SourceUnavailable {
                message_id: message.id,
                reason: "media was not included in the export".to_string(),
            });
        }

        let relative = Path::new(source);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(DownloadError::SourceUnavailable {
                message_id: message.id,
                reason: format!("media path '{}' leaves the export directory", source),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Transport for ExportTransport {
    async fn history(&self, chat_id: Option<i64>, limit: usize) -> TransportResult<MessageStream> {
        let document = self.load().await?;
        let chat = document.select(chat_id)?;
        info!(
            "Loaded export of chat {} ({}) with {} entries",
            chat.id,
            chat.name.as_deref().unwrap_or("unnamed"),
            chat.messages.len()
        );

        let mut messages = chat
            .messages
            .into_iter()
            .map(ExportMessage::into_message)
            .collect::<TransportResult<Vec<_>>>()?;

        // Exports are oldest first; the stream contract is newest first
        messages.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        messages.truncate(limit);

        Ok(stream::iter(messages.into_iter().map(Ok)).boxed())
    }

    async fn fetch_bytes(&self, message: &Message, destination: &Path) -> DownloadResult<()> {
        let source = self.source_path(message)?;
        debug!(
            "Copying {} -> {}",
            source.display(),
            destination.display()
        );
        tokio::fs::copy(&source, destination).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportDocument {
    Account { chats: ChatList },
    Single(ExportChat),
}

impl ExportDocument {
    fn select(self, chat_id: Option<i64>) -> TransportResult<ExportChat> {
        match (self, chat_id) {
            (ExportDocument::Single(chat), None) => Ok(chat),
            (ExportDocument::Single(chat), Some(id)) if chat.id == id => Ok(chat),
            (ExportDocument::Single(_), Some(id)) => {
                Err(TransportError::ChatNotFound { chat_id: id })
            }
            (ExportDocument::Account { chats }, Some(id)) => chats
                .list
                .into_iter()
                .find(|chat| chat.id == id)
                .ok_or(TransportError::ChatNotFound { chat_id: id }),
            (ExportDocument::Account { mut chats }, None) => {
                if chats.list.len() == 1 {
                    Ok(chats.list.remove(0))
                } else {
                    Err(TransportError::AmbiguousChat {
                        count: chats.list.len(),
                    })
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatList {
    #[serde(default)]
    list: Vec<ExportChat>,
}

#[derive(Debug, Deserialize)]
struct ExportChat {
    id: i64,
    name: Option<String>,
    #[serde(default)]
    messages: Vec<ExportMessage>,
}

#[derive(Debug, Deserialize)]
struct ExportMessage {
    id: i64,
    #[serde(rename = "type", default)]
    kind: String,
    date: Option<String>,
    date_unixtime: Option<String>,
    #[serde(default)]
    text: ExportText,
    photo: Option<String>,
    file: Option<String>,
    file_name: Option<String>,
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportText {
    Plain(String),
    Parts(Vec<TextPart>),
}

impl Default for ExportText {
    fn default() -> Self {
        ExportText::Plain(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextPart {
    Plain(String),
    Entity {
        #[serde(rename = "type")]
        kind: String,
        text: String,
    },
}

impl ExportText {
    fn flatten(&self) -> String {
        match self {
            ExportText::Plain(text) => text.clone(),
            ExportText::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    TextPart::Plain(text) => text.as_str(),
                    TextPart::Entity { text, .. } => text.as_str(),
                })
                .collect(),
        }
    }

    /// The URL when the whole text is a single link entity
    fn sole_link(&self) -> Option<String> {
        let ExportText::Parts(parts) = self else {
            return None;
        };

        let mut link = None;
        for part in parts {
            match part {
                TextPart::Plain(text) if text.trim().is_empty() => {}
                TextPart::Entity { kind, text } if kind == "link" && link.is_none() => {
                    link = Some(text.trim().to_string());
                }
                _ => return None,
            }
        }
        link
    }
}

impl ExportMessage {
    fn into_message(self) -> TransportResult<Message> {
        let date = self.parse_date()?;

        if self.kind != "message" {
            return Ok(Message::new(self.id, date, MessageMedia::None));
        }

        if let Some(photo) = self.photo {
            return Ok(Message::new(self.id, date, MessageMedia::Photo).with_source(photo));
        }

        if let Some(file) = self.file {
            let media = match self.media_type.as_deref() {
                Some("video_file") => MessageMedia::Video {
                    file_name: self.file_name,
                },
                None => MessageMedia::Document {
                    file_name: self.file_name,
                },
                // Stickers, voice notes, animations and the like are not harvested
                Some(_) => MessageMedia::None,
            };
            return Ok(Message::new(self.id, date, media).with_source(file));
        }

        let media = if let Some(url) = self.text.sole_link() {
            MessageMedia::WebPage { url }
        } else {
            let text = self.text.flatten();
            if text.is_empty() {
                MessageMedia::None
            } else {
                MessageMedia::Text { text }
            }
        };

        Ok(Message::new(self.id, date, media))
    }

    fn parse_date(&self) -> TransportResult<DateTime<Utc>> {
        if let Some(unix) = self.date_unixtime.as_deref() {
            let seconds: i64 = unix.parse().map_err(|_| self.invalid_date(unix))?;
            return Utc
                .timestamp_opt(seconds, 0)
                .single()
                .ok_or_else(|| self.invalid_date(unix));
        }

        let raw = self.date.as_deref().ok_or(TransportError::InvalidMessage {
            message_id: self.id,
            reason: "missing date".to_string(),
        })?;

        // Older exports only carry local wall-clock time
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .map_err(|_| self.invalid_date(raw))?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| self.invalid_date(raw))
    }

    fn invalid_date(&self, raw: &str) -> TransportError {
        TransportError::InvalidMessage {
            message_id: self.id,
            reason: format!("unparseable date '{}'", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::MediaKind;
    use tempfile::TempDir;

    const SINGLE_CHAT: &str = r#"{
        "name": "Course chat",
        "type": "private_group",
        "id": 777,
        "messages": [
            {"id": 1, "type": "service", "date_unixtime": "1700000000", "action": "create_group", "text": ""},
            {"id": 2, "type": "message", "date_unixtime": "1700000100", "photo": "photos/photo_1.jpg", "text": ""},
            {"id": 3, "type": "message", "date_unixtime": "1700000200", "file": "files/notes.pdf", "file_name": "notes.pdf", "text": "slides"},
            {"id": 4, "type": "message", "date_unixtime": "1700000300", "file": "video_files/lecture.mp4", "file_name": "lecture.mp4", "media_type": "video_file", "text": ""},
            {"id": 5, "type": "message", "date_unixtime": "1700000400", "text": [{"type": "link", "text": "https://example.com"}]},
            {"id": 6, "type": "message", "date_unixtime": "1700000500", "text": ["check ", {"type": "link", "text": "http://x"}]},
            {"id": 7, "type": "message", "date_unixtime": "1700000600", "file": "stickers/s.webp", "media_type": "sticker", "text": ""}
        ]
    }"#;

    async fn write_export(json: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join(export::RESULT_FILE), json)
            .await
            .unwrap();
        dir
    }

    async fn collect(transport: &ExportTransport, chat: Option<i64>, limit: usize) -> Vec<Message> {
        transport
            .history(chat, limit)
            .await
            .unwrap()
            .map(|m| m.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_classified() {
        let dir = write_export(SINGLE_CHAT).await;
        let transport = ExportTransport::new(dir.path());

        let messages = collect(&transport, None, 100).await;
        let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![7, 6, 5, 4, 3, 2, 1]);

        let kinds: Vec<MediaKind> = messages.iter().map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::None,
                MediaKind::Text,
                MediaKind::WebPage,
                MediaKind::Video,
                MediaKind::Document,
                MediaKind::Photo,
                MediaKind::None,
            ]
        );

        assert_eq!(
            messages[1].media,
            MessageMedia::Text {
                text: "check http://x".to_string()
            }
        );
        assert_eq!(
            messages[2].media,
            MessageMedia::WebPage {
                url: "https://example.com".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_history_respects_limit() {
        let dir = write_export(SINGLE_CHAT).await;
        let transport = ExportTransport::new(dir.path());

        let messages = collect(&transport, Some(777), 2).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, 7);
    }

    #[tokio::test]
    async fn test_wrong_chat_is_rejected() {
        let dir = write_export(SINGLE_CHAT).await;
        let transport = ExportTransport::new(dir.path());

        let result = transport.history(Some(1), 10).await;
        assert!(matches!(
            result,
            Err(TransportError::ChatNotFound { chat_id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_account_export_needs_target_when_ambiguous() {
        let json = r#"{"chats": {"list": [
            {"id": 1, "name": "a", "messages": []},
            {"id": 2, "name": "b", "messages": [{"id": 9, "type": "message", "date_unixtime": "1700000000", "text": "hi"}]}
        ]}}"#;
        let dir = write_export(json).await;
        let transport = ExportTransport::new(dir.path());

        assert!(matches!(
            transport.history(None, 10).await,
            Err(TransportError::AmbiguousChat { count: 2 })
        ));

        let messages = collect(&transport, Some(2), 10).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MediaKind::Text);
    }

    #[tokio::test]
    async fn test_missing_export_is_fatal() {
        let dir = TempDir::new().unwrap();
        let transport = ExportTransport::new(dir.path());

        assert!(matches!(
            transport.history(None, 10).await,
            Err(TransportError::ExportNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_bytes_copies_media() {
        let dir = write_export(SINGLE_CHAT).await;
        tokio::fs::create_dir_all(dir.path().join("files"))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("files/notes.pdf"), b"pdf-bytes")
            .await
            .unwrap();

        let transport = ExportTransport::new(dir.path());
        let out = TempDir::new().unwrap();
        let target = out.path().join("notes.pdf");

        let message = Message::new(
            3,
            Utc::now(),
            MessageMedia::Document {
                file_name: Some("notes.pdf".into()),
            },
        )
        .with_source("files/notes.pdf");

        transport.fetch_bytes(&message, &target).await.unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"pdf-bytes");
    }

    #[tokio::test]
    async fn test_fetch_rejects_unavailable_sources() {
        let transport = ExportTransport::new("/nonexistent");
        let out = TempDir::new().unwrap();
        let target = out.path().join("x");

        let not_included = Message::new(1, Utc::now(), MessageMedia::Photo)
            .with_source("(File not included. Change data exporting settings to download.)");
        let err = transport.fetch_bytes(&not_included, &target).await.unwrap_err();
        assert!(matches!(err, DownloadError::SourceUnavailable { .. }));
        assert!(!err.is_file_contention());

        let escaping = Message::new(2, Utc::now(), MessageMedia::Photo).with_source("../secret");
        let err = transport.fetch_bytes(&escaping, &target).await.unwrap_err();
        assert!(matches!(err, DownloadError::SourceUnavailable { .. }));

        let no_source = Message::new(3, Utc::now(), MessageMedia::Photo);
        let err = transport.fetch_bytes(&no_source, &target).await.unwrap_err();
        assert!(matches!(err, DownloadError::NoMedia { message_id: 3 }));
    }
}
