//! Download worker
//!
//! One worker invocation downloads one media item. Scheduling, limiter
//! permits and result counting belong to the coordinator; the worker only
//! owns the retry policy for a single item.
//!
//! # Key Features
//!
//! - **Retry-with-rename**: permission and file-lock errors retry under a
//!   fresh `{path}.{unique}.temp` target
//! - **Bounded attempts**: at most [`WorkerConfig::max_attempts`] tries
//! - **Contained failures**: errors are logged and reported as an outcome,
//!   never raised
//! - **Pacing**: a cooldown after success keeps the limiter slot busy
//!
//! # Module Organization
//!
//! - [`config`] - Worker configuration with validation and presets
//! - [`core`] - The retry loop

pub mod config;
pub mod core;

pub use config::{ConfigPresets, WorkerConfig};
pub use core::{DownloadOutcome, DownloadWorker};
