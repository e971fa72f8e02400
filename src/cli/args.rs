//! Command-line argument parsing for Chat Harvest
//!
//! This module defines the CLI structure using clap derive macros: harvesting
//! media from a chat export, sweeping retry leftovers and managing the
//! configuration file.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;

/// Chat Harvest - Download recent media from a chat history
#[derive(Parser, Debug)]
#[command(
    name = "chat_harvest",
    version,
    about = "Download recent media from a chat history into a dated folder",
    long_about = "Reads a chat history newest first, downloads photos, videos and documents from the last few days
into <root>/<catalog>/<DD.MM>/ with separate concurrency limits for videos, and collects web links for review."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Harvest media from a chat history
    Run(RunArgs),

    /// Remove leftover .temp files from a day directory
    Clean(CleanArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Telegram Desktop export directory (the folder holding result.json)
    #[arg(short, long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Chat id to harvest; required for multi-chat exports
    #[arg(short, long, allow_hyphen_values = true)]
    pub target: Option<i64>,

    /// Stop at the first message older than this many days
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Maximum number of messages to read
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Concurrent photo and document downloads
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Concurrent video downloads
    #[arg(long)]
    pub video_concurrency: Option<usize>,

    /// Save links to the links file without opening them
    #[arg(long)]
    pub no_open: bool,

    /// Base directory for the catalog (defaults to the home directory)
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,

    /// Print the run summary as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the clean command
#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Day directory to clean, as DD.MM (defaults to today)
    #[arg(long, value_name = "DD.MM")]
    pub date: Option<String>,

    /// Base directory for the catalog (defaults to the home directory)
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    ///
    /// Without a verbosity flag the configured level applies.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl RunArgs {
    /// Check flag values before anything is loaded
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == Some(0) {
            return Err("Concurrency must be greater than 0".to_string());
        }

        if self.video_concurrency == Some(0) {
            return Err("Video concurrency must be greater than 0".to_string());
        }

        if self.limit == Some(0) {
            return Err("Limit must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Layer the flags that were given over `config`
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(export) = &self.export {
            config.source.export = Some(export.clone());
        }
        if let Some(target) = self.target {
            config.source.target = Some(target);
        }
        if let Some(days) = self.days {
            config.source.days = days;
        }
        if let Some(limit) = self.limit {
            config.source.limit = limit;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency.default = concurrency;
        }
        if let Some(video_concurrency) = self.video_concurrency {
            config.concurrency.heavy = video_concurrency;
        }
        if self.no_open {
            config.output.open_links = false;
        }
        if let Some(root) = &self.output_root {
            config.output.root = Some(root.clone());
        }
    }
}

impl CleanArgs {
    /// Resolve `--date` against `today`'s year
    pub fn day(&self, today: NaiveDate) -> Result<NaiveDate, String> {
        let Some(raw) = &self.date else {
            return Ok(today);
        };

        let with_year = format!("{}.{}", raw.trim(), today.format("%Y"));
        NaiveDate::parse_from_str(&with_year, "%d.%m.%Y")
            .map_err(|_| format!("Invalid date '{}', expected DD.MM", raw))
    }
}
