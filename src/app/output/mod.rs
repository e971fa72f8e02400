//! Output directory layout
//!
//! Every run writes into `{root}/{catalog}/{DD.MM}/`. The directory is created
//! once at startup; afterwards the [`PathResolver`] hands out target paths in it
//! and the [`TempCleaner`] sweeps retry artifacts out of it.
//!
//! # Module Organization
//!
//! - [`path`] - collision-avoiding target path resolution
//! - [`cleaner`] - removal of `.temp` retry artifacts

pub mod cleaner;
pub mod path;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::constants::files;
use crate::errors::{ConfigError, ConfigResult};

pub use cleaner::TempCleaner;
pub use path::{sanitize_file_name, PathResolver};

/// Where and how a run writes its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Base directory the catalog lives in
    pub root: PathBuf,
    /// Catalog directory name under the root
    pub catalog: String,
    /// File name of the links file inside the day directory
    pub links_filename: String,
    /// Try to open links in the desktop viewer
    pub open_links: bool,
}

impl OutputConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog: files::DEFAULT_CATALOG.to_string(),
            links_filename: files::DEFAULT_LINKS_FILENAME.to_string(),
            open_links: true,
        }
    }

    /// Validate the configuration
    ///
    /// Catalog and links file names must be plain file names.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("output.catalog", &self.catalog),
            ("output.links_filename", &self.links_filename),
        ] {
            if sanitize_file_name(value).as_deref() != Some(value.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                    reason: "Must be a plain file name".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Day directory for `date`
    pub fn directory_for(&self, date: NaiveDate) -> OutputDirectory {
        OutputDirectory::for_date(&self.root, &self.catalog, date)
    }

    /// Day directory for today's local date
    pub fn today(&self) -> OutputDirectory {
        OutputDirectory::today(&self.root, &self.catalog)
    }

    /// Links file inside `dir`
    pub fn links_file(&self, dir: &OutputDirectory) -> PathBuf {
        dir.path().join(&self.links_filename)
    }
}

/// Date-scoped output directory of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirectory {
    path: PathBuf,
}

impl OutputDirectory {
    /// Directory for `date` under `{root}/{catalog}`
    pub fn for_date(root: &Path, catalog: &str, date: NaiveDate) -> Self {
        let day = date.format(files::DAY_DIR_FORMAT).to_string();
        Self {
            path: root.join(catalog).join(day),
        }
    }

    /// Directory for today's local date
    pub fn today(root: &Path, catalog: &str) -> Self {
        Self::for_date(root, catalog, Local::now().date_naive())
    }

    /// Wrap an existing directory path as-is
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the directory and its parents
    pub async fn create(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.path).await?;
        info!("Output directory ready: {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
