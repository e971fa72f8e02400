//! Configuration management for Chat Harvest
//!
//! This module provides unified configuration management with multi-source
//! loading: built-in defaults, a TOML file, `CHAT_HARVEST_*` environment
//! variables and finally CLI flags (applied by the command handlers).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CoordinatorConfig, OutputConfig, WorkerConfig};
use crate::constants::{concurrency, config as paths, download, env, files, source};
use crate::errors::{AppError, ConfigError, ConfigResult, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// History source settings
    pub source: SourceConfigToml,
    /// Download slot settings
    pub concurrency: ConcurrencyConfigToml,
    /// Retry and pacing settings
    pub download: DownloadConfigToml,
    /// Output layout settings
    pub output: OutputConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly history source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfigToml {
    /// Chat export directory
    pub export: Option<PathBuf>,
    /// Chat id to harvest (required for multi-chat exports)
    pub target: Option<i64>,
    /// Age cutoff in days
    pub days: u32,
    /// Maximum messages read from the history
    pub limit: usize,
}

impl Default for SourceConfigToml {
    fn default() -> Self {
        Self {
            export: None,
            target: None,
            days: source::DEFAULT_DAYS,
            limit: source::DEFAULT_FETCH_LIMIT,
        }
    }
}

/// TOML-friendly concurrency configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfigToml {
    /// Concurrent photo and document downloads
    pub default: usize,
    /// Concurrent video downloads
    pub heavy: usize,
}

impl Default for ConcurrencyConfigToml {
    fn default() -> Self {
        Self {
            default: concurrency::DEFAULT_CAPACITY,
            heavy: concurrency::DEFAULT_HEAVY_CAPACITY,
        }
    }
}

/// TOML-friendly download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfigToml {
    /// Attempts per item, including the first
    pub max_attempts: u32,
    /// Pause after each successful download
    #[serde(with = "humantime_serde")]
    pub success_cooldown: Duration,
    /// Pause before a renamed retry
    #[serde(with = "humantime_serde")]
    pub retry_cooldown: Duration,
}

impl Default for DownloadConfigToml {
    fn default() -> Self {
        Self {
            max_attempts: download::MAX_ATTEMPTS,
            success_cooldown: download::SUCCESS_COOLDOWN,
            retry_cooldown: download::RETRY_COOLDOWN,
        }
    }
}

/// TOML-friendly output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfigToml {
    /// Base directory (home directory when unset)
    pub root: Option<PathBuf>,
    /// Catalog directory name under the root
    pub catalog: String,
    /// Links file name inside the day directory
    pub links_filename: String,
    /// Open links in the desktop viewer as they are found
    pub open_links: bool,
}

impl Default for OutputConfigToml {
    fn default() -> Self {
        Self {
            root: None,
            catalog: files::DEFAULT_CATALOG.to_string(),
            links_filename: files::DEFAULT_LINKS_FILENAME.to_string(),
            open_links: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> ConfigResult<(CoordinatorConfig, OutputConfig)> {
        let coordinator = self.coordinator_config();
        coordinator.validate()?;

        let output = self.output.to_runtime_config()?;
        output.validate()?;

        Ok((coordinator, output))
    }

    fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            chat_id: self.source.target,
            days: self.source.days,
            fetch_limit: self.source.limit,
            default_capacity: self.concurrency.default,
            heavy_capacity: self.concurrency.heavy,
            worker_config: self.download.to_runtime_config(),
        }
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// CLI flags are applied on top by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound { path }.into());
            }
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CHAT_HARVEST_*` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env::TARGET) {
            self.source.target = Some(parse_override(env::TARGET, &value)?);
        }
        if let Some(value) = lookup(env::DAYS) {
            self.source.days = parse_override(env::DAYS, &value)?;
        }
        if let Some(value) = lookup(env::LIMIT) {
            self.source.limit = parse_override(env::LIMIT, &value)?;
        }
        if let Some(value) = lookup(env::CONCURRENCY) {
            self.concurrency.default = parse_override(env::CONCURRENCY, &value)?;
        }
        if let Some(value) = lookup(env::VIDEO_CONCURRENCY) {
            self.concurrency.heavy = parse_override(env::VIDEO_CONCURRENCY, &value)?;
        }
        if let Some(value) = lookup(env::CATALOG) {
            self.output.catalog = value;
        }
        if let Some(value) = lookup(env::LINKS_FILENAME) {
            self.output.links_filename = value;
        }

        Ok(())
    }

    /// Write the commented default configuration to the user config path
    ///
    /// An existing file is only replaced with `force`.
    pub async fn initialize(force: bool) -> Result<PathBuf> {
        let config_path = Self::default_config_path()?;
        Self::write_default_config(&config_path, force).await?;
        Ok(config_path)
    }

    /// Write the commented default configuration to `path`
    pub async fn write_default_config(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(AppError::generic(format!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(path, Self::generate_default_config_content()).await?;
        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(paths::LOCAL_FILE)];
        if let Ok(user_config) = Self::default_config_path() {
            search_paths.push(user_config);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::MissingDirectory { which: "config" })?;
        Ok(config_dir.join(paths::APP_DIR).join(paths::FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# Chat Harvest Configuration
# Every setting is optional; missing values fall back to these defaults.
# Environment variables (CHAT_HARVEST_*) and CLI flags take precedence.

[source]
# Telegram Desktop export directory (the folder holding result.json)
# export = "/path/to/ChatExport_2024-03-07"

# Chat id to harvest; required when the export contains several chats
# target = -1001234567890

# Stop at the first message older than this many days
days = {days}

# Maximum number of messages read from the history
limit = {limit}

[concurrency]
# Concurrent photo and document downloads
default = {default}

# Concurrent video downloads
heavy = {heavy}

[download]
# Attempts per item; permission errors retry under a temporary name
max_attempts = {attempts}
success_cooldown = "{success}"
retry_cooldown = "{retry}"

[output]
# Files land in <root>/<catalog>/<DD.MM>/ (root defaults to the home directory)
# root = "/path/to/downloads"
catalog = "{catalog}"
links_filename = "{links}"

# Open links in the browser as they are found; otherwise only save them
open_links = true

[logging]
level = "info"  # error, warn, info, debug, trace
"#,
            days = source::DEFAULT_DAYS,
            limit = source::DEFAULT_FETCH_LIMIT,
            default = concurrency::DEFAULT_CAPACITY,
            heavy = concurrency::DEFAULT_HEAVY_CAPACITY,
            attempts = download::MAX_ATTEMPTS,
            success = format!("{}s", download::SUCCESS_COOLDOWN.as_secs()),
            retry = format!("{}s", download::RETRY_COOLDOWN.as_secs()),
            catalog = files::DEFAULT_CATALOG,
            links = files::DEFAULT_LINKS_FILENAME,
        )
    }
}

impl DownloadConfigToml {
    /// Convert to runtime WorkerConfig
    pub fn to_runtime_config(&self) -> WorkerConfig {
        WorkerConfig {
            max_attempts: self.max_attempts,
            success_cooldown: self.success_cooldown,
            retry_cooldown: self.retry_cooldown,
        }
    }
}

impl OutputConfigToml {
    /// Convert to runtime OutputConfig, resolving the home directory if needed
    pub fn to_runtime_config(&self) -> ConfigResult<OutputConfig> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => dirs::home_dir().ok_or(ConfigError::MissingDirectory { which: "home" })?,
        };

        Ok(OutputConfig {
            root,
            catalog: self.catalog.clone(),
            links_filename: self.links_filename.clone(),
            open_links: self.open_links,
        })
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field: key.to_string(),
            value: value.to_string(),
            reason: "Not a valid number".to_string(),
        })
}
