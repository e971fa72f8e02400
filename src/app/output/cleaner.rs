//! Removal of retry artifacts
//!
//! Workers that retry under a renamed target can leave `*.temp` files behind.
//! The cleaner removes them once a run has finished.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::constants::files;

/// Sweeps `.temp` files from the top level of an output directory
#[derive(Debug, Clone)]
pub struct TempCleaner {
    dir: PathBuf,
}

impl TempCleaner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete every regular `*.temp` file in the directory (non-recursive)
    ///
    /// Files that are already gone count as removed. Returns the number of
    /// files removed.
    pub async fn sweep(&self) -> io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !is_temp_marker(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let is_file = match entry.file_type().await {
                Ok(file_type) => file_type.is_file(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    removed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !is_file {
                continue;
            }

            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed temp file {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => removed += 1,
                Err(e) => warn!("Could not remove temp file {}: {}", path.display(), e),
            }
        }

        Ok(removed)
    }
}

/// Whether a file name carries the retry marker extension
pub fn is_temp_marker(name: &str) -> bool {
    name.ends_with(files::TEMP_MARKER)
}
