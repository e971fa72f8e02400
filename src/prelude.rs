//! Prelude module for Chat Harvest Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use chat_harvest::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use chat_harvest::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let output = OutputDirectory::at("/tmp/harvest");
//!     output.create().await?;
//!
//!     let links = LinkCollector::new(Arc::new(SystemOpener), output.path().join("links.txt"));
//!     let transport = Arc::new(ExportTransport::new("ChatExport_2024-03-07"));
//!     let summary = Coordinator::new(CoordinatorConfig::default(), transport, output, links)
//!         .run()
//!         .await?;
//!
//!     println!("{}", summary.report);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    // Core orchestration
    Coordinator,
    CoordinatorConfig,
    DownloadEvent,
    RunSummary,

    // Transports
    ExportTransport,
    MemoryTransport,
    Transport,

    // Data types
    MediaKind,
    Message,
    MessageMedia,

    // Output and links
    LinkCollector,
    OutputConfig,
    OutputDirectory,
    SystemOpener,
    WorkerConfig,
};

// Configuration
pub use crate::config::AppConfig;

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
