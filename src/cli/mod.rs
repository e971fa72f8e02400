//! Command-line interface components
//!
//! This module contains CLI-specific code for the Chat Harvest application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    CleanArgs, Cli, Commands, ConfigAction, ConfigArgs, GlobalArgs, RunArgs,
};
pub use commands::{handle_clean, handle_config, handle_run};
pub use progress::{ProgressConfig, ProgressDisplay, ProgressTally};
