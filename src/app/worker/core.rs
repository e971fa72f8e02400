//! Core download worker implementation
//!
//! A worker performs one media fetch with a bounded number of attempts. Only
//! permission and file-lock errors are retried, each time under a fresh
//! `.temp` target; every other error ends the item after one try. Failures are
//! logged here and never propagate to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::config::WorkerConfig;
use crate::app::models::Message;
use crate::app::transport::Transport;
use crate::constants::files;

/// How a download ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Bytes were written; `path` is where the file now lives
    ///
    /// After a retry under a `.temp` name this is the promoted permanent name,
    /// not the path the bytes were first written to.
    Completed { path: PathBuf, attempts: u32 },
    /// The item was given up
    Abandoned { attempts: u32, reason: String },
}

impl DownloadOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DownloadOutcome::Completed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DownloadOutcome::Completed { attempts, .. }
            | DownloadOutcome::Abandoned { attempts, .. } => *attempts,
        }
    }
}

/// Retry target state, kept apart from the attempt counter
#[derive(Debug)]
enum Target {
    Original(PathBuf),
    Renamed { path: PathBuf, suffix: String },
}

impl Target {
    fn path(&self) -> &Path {
        match self {
            Target::Original(path) | Target::Renamed { path, .. } => path,
        }
    }
}

/// Single-item downloader with retry-with-rename
#[derive(Clone)]
pub struct DownloadWorker {
    config: WorkerConfig,
    transport: Arc<dyn Transport>,
}

impl DownloadWorker {
    pub fn new(config: WorkerConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Download `message` to `path`, best effort
    pub async fn download(&self, message: &Message, path: PathBuf) -> DownloadOutcome {
        let original = path;
        let mut target = Target::Original(original.clone());
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(
                "Fetching message {} to {} (attempt {})",
                message.id,
                target.path().display(),
                attempts
            );

            let error = match self.transport.fetch_bytes(message, target.path()).await {
                Ok(()) => {
                    let path = self.settle(&original, target).await;
                    info!("Download of '{}' finished", display_name(&path));

                    // Pace the release of the limiter slot
                    tokio::time::sleep(self.config.success_cooldown).await;
                    return DownloadOutcome::Completed { path, attempts };
                }
                Err(e) => e,
            };

            if error.is_file_contention() {
                if attempts < self.config.max_attempts {
                    target = renamed_target(&original);
                    debug!(
                        "File contention on message {}, retrying as {}: {}",
                        message.id,
                        target.path().display(),
                        error
                    );
                    tokio::time::sleep(self.config.retry_cooldown).await;
                    continue;
                }

                error!(
                    "Download of {} failed after {} attempts: {}",
                    original.display(),
                    attempts,
                    error
                );
            } else if matches!(target, Target::Renamed { .. }) {
                debug!(
                    "Retry target {} abandoned: {}",
                    target.path().display(),
                    error
                );
            } else {
                error!("Download of {} failed: {}", original.display(), error);
            }

            return DownloadOutcome::Abandoned {
                attempts,
                reason: error.to_string(),
            };
        }
    }

    /// Move a file written under a retry name to a permanent name
    ///
    /// The `.temp` name would otherwise be swept at the end of the run. If the
    /// rename fails the file stays where it is.
    async fn settle(&self, original: &Path, target: Target) -> PathBuf {
        let (temp, suffix) = match target {
            Target::Original(path) => return path,
            Target::Renamed { path, suffix } => (path, suffix),
        };

        let permanent = permanent_name(original, &suffix);
        match tokio::fs::rename(&temp, &permanent).await {
            Ok(()) => permanent,
            Err(e) => {
                warn!(
                    "Could not move {} to {}; it will be removed by the temp sweep: {}",
                    temp.display(),
                    permanent.display(),
                    e
                );
                temp
            }
        }
    }
}

impl std::fmt::Debug for DownloadWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadWorker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `{original}.{unique}.temp`
fn renamed_target(original: &Path) -> Target {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let mut name = original.as_os_str().to_owned();
    name.push(format!(".{}{}", suffix, files::TEMP_MARKER));
    Target::Renamed {
        path: PathBuf::from(name),
        suffix,
    }
}

/// `{stem}-{short suffix}.{ext}` next to the original
fn permanent_name(original: &Path, suffix: &str) -> PathBuf {
    let short = &suffix[..suffix.len().min(8)];
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match original.extension() {
        Some(ext) => format!("{}-{}.{}", stem, short, ext.to_string_lossy()),
        None => format!("{}-{}", stem, short),
    };
    original.with_file_name(name)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
