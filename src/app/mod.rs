//! Core application logic for chat_harvest
//!
//! This module contains the harvest pipeline: the message model, the
//! transports that serve chat histories, output path handling, link
//! collection, the download worker and the coordinator that ties them
//! together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chat_harvest::app::{ExportTransport, Transport};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ExportTransport::new("ChatExport_2024-03-07");
//! let mut history = transport.history(None, 100).await?;
//!
//! while let Some(message) = history.next().await {
//!     let message = message?;
//!     println!("{} {} {}", message.id, message.date, message.kind());
//! }
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod links;
pub mod models;
pub mod output;
pub mod transport;
pub mod worker;

// Re-export main public API
pub use coordinator::{
    Coordinator, CoordinatorConfig, DownloadEvent, ResultAggregator, RunPhase, RunStats,
    RunSummary,
};
pub use links::{LinkCollector, LinkOpener, SystemOpener};
pub use models::{DownloadTask, MediaClass, MediaKind, Message, MessageMedia};
pub use output::{OutputConfig, OutputDirectory, PathResolver, TempCleaner};
pub use transport::{ExportTransport, MemoryTransport, MessageStream, ScriptedFailure, Transport};
pub use worker::{DownloadOutcome, DownloadWorker, WorkerConfig};
