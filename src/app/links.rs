//! Link collection
//!
//! Web links found in the history are opened in the desktop viewer right away.
//! Links that cannot be opened are buffered and written to a links file at the
//! end of the run, which is then revealed to the user.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::errors::{LinkError, LinkResult};

/// Opens links and reveals files in an external viewer
pub trait LinkOpener: Send + Sync {
    /// Open `link` in the viewer
    fn open_link(&self, link: &str) -> LinkResult<()>;

    /// Show `path` to the user
    fn reveal(&self, path: &Path) -> LinkResult<()>;
}

/// Opener backed by the desktop's default handlers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl LinkOpener for SystemOpener {
    fn open_link(&self, link: &str) -> LinkResult<()> {
        let url = Url::parse(link.trim()).map_err(|_| LinkError::NotOpenable {
            link: link.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LinkError::NotOpenable {
                link: link.to_string(),
            });
        }

        open::that_detached(url.as_str()).map_err(|e| LinkError::OpenFailed {
            target: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn reveal(&self, path: &Path) -> LinkResult<()> {
        open::that_detached(path).map_err(|e| LinkError::OpenFailed {
            target: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Buffers links that could not be opened
pub struct LinkCollector {
    opener: Arc<dyn LinkOpener>,
    open_links: bool,
    links_file: PathBuf,
    buffer: Vec<String>,
}

impl LinkCollector {
    /// Collector writing its buffer to `links_file`
    pub fn new(opener: Arc<dyn LinkOpener>, links_file: impl Into<PathBuf>) -> Self {
        Self {
            opener,
            open_links: true,
            links_file: links_file.into(),
            buffer: Vec::new(),
        }
    }

    /// Skip the viewer entirely and buffer every link
    pub fn with_open_links(mut self, enabled: bool) -> Self {
        self.open_links = enabled;
        self
    }

    /// Try to open `link`; buffer it if that fails
    pub fn offer(&mut self, link: &str) {
        if link.trim().is_empty() {
            return;
        }

        if !self.open_links {
            info!("Saved link for manual review: {}", link);
            self.buffer.push(link.to_string());
            return;
        }

        match self.opener.open_link(link) {
            Ok(()) => info!("Opened link in viewer: {}", link),
            Err(e) => {
                warn!("Could not open link {}, saved for manual review: {}", link, e);
                self.buffer.push(link.to_string());
            }
        }
    }

    /// Links buffered so far
    pub fn buffered(&self) -> &[String] {
        &self.buffer
    }

    /// Path the buffer is flushed to
    pub fn links_file(&self) -> &Path {
        &self.links_file
    }

    /// Write buffered links, one per line, and reveal the file
    ///
    /// Does nothing when the buffer is empty. Returns the written file.
    pub async fn flush(&mut self) -> LinkResult<Option<PathBuf>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let content: String = self
            .buffer
            .iter()
            .map(|link| format!("{}\n", link))
            .collect();
        tokio::fs::write(&self.links_file, content)
            .await
            .map_err(|source| LinkError::Write {
                path: self.links_file.clone(),
                source,
            })?;

        info!(
            "Saved {} links to {}",
            self.buffer.len(),
            self.links_file.display()
        );
        self.buffer.clear();

        if self.open_links {
            if let Err(e) = self.opener.reveal(&self.links_file) {
                warn!("Could not reveal links file: {}", e);
            }
        }

        Ok(Some(self.links_file.clone()))
    }
}

impl std::fmt::Debug for LinkCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkCollector")
            .field("open_links", &self.open_links)
            .field("links_file", &self.links_file)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
