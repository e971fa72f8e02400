//! Shared fixtures for integration tests
//!
//! Builds Telegram Desktop style export directories on disk, with message
//! dates relative to the current time so the age cutoff behaves predictably.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{json, Value};
use tempfile::TempDir;

use chat_harvest::app::LinkOpener;
use chat_harvest::errors::{LinkError, LinkResult};

/// An export directory under construction
pub struct ExportFixture {
    pub dir: TempDir,
    messages: Vec<Value>,
}

impl ExportFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            messages: Vec::new(),
        }
    }

    fn unixtime(hours_ago: i64) -> String {
        (Utc::now() - chrono::Duration::hours(hours_ago))
            .timestamp()
            .to_string()
    }

    /// Write `relative` inside the export with `content`
    pub fn media(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn photo(mut self, id: i64, hours_ago: i64, relative: &str) -> Self {
        self.media(relative, format!("photo {}", id).as_bytes());
        self.messages.push(json!({
            "id": id,
            "type": "message",
            "date_unixtime": Self::unixtime(hours_ago),
            "photo": relative,
            "text": ""
        }));
        self
    }

    pub fn file(
        mut self,
        id: i64,
        hours_ago: i64,
        relative: &str,
        file_name: &str,
        media_type: Option<&str>,
    ) -> Self {
        self.media(relative, format!("file {}", id).as_bytes());
        let mut message = json!({
            "id": id,
            "type": "message",
            "date_unixtime": Self::unixtime(hours_ago),
            "file": relative,
            "file_name": file_name,
            "text": ""
        });
        if let Some(media_type) = media_type {
            message["media_type"] = json!(media_type);
        }
        self.messages.push(message);
        self
    }

    /// A file the export skipped, as written by size-limited exports
    pub fn missing_file(mut self, id: i64, hours_ago: i64, file_name: &str) -> Self {
        self.messages.push(json!({
            "id": id,
            "type": "message",
            "date_unixtime": Self::unixtime(hours_ago),
            "file": "(File not included. Change data exporting settings to download.)",
            "file_name": file_name,
            "text": ""
        }));
        self
    }

    pub fn text(mut self, id: i64, hours_ago: i64, text: Value) -> Self {
        self.messages.push(json!({
            "id": id,
            "type": "message",
            "date_unixtime": Self::unixtime(hours_ago),
            "text": text
        }));
        self
    }

    /// Write `result.json` for a single chat
    pub fn write(self, chat_id: i64) -> TempDir {
        let document = json!({
            "name": "Integration chat",
            "type": "private_supergroup",
            "id": chat_id,
            "messages": self.messages
        });
        std::fs::write(
            self.dir.path().join("result.json"),
            serde_json::to_vec_pretty(&document).unwrap(),
        )
        .unwrap();
        self.dir
    }
}

/// Opener without a desktop viewer; records what it was asked to reveal
#[derive(Default)]
pub struct HeadlessOpener {
    pub revealed: Mutex<Vec<PathBuf>>,
}

impl LinkOpener for HeadlessOpener {
    fn open_link(&self, link: &str) -> LinkResult<()> {
        Err(LinkError::OpenFailed {
            target: link.to_string(),
            reason: "no display".to_string(),
        })
    }

    fn reveal(&self, path: &Path) -> LinkResult<()> {
        self.revealed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
