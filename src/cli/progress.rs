//! Real-time progress display for harvest runs
//!
//! A single indicatif bar counts finished downloads against scheduled ones.
//! The total is not known up front: it grows as the coordinator queues
//! downloads while streaming the history.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chat_harvest::cli::{ProgressConfig, ProgressDisplay};
//! use tokio::sync::mpsc;
//!
//! # async fn example() {
//! let (events_tx, events_rx) = mpsc::unbounded_channel();
//! let display = ProgressDisplay::new(ProgressConfig::default()).spawn(events_rx);
//!
//! // hand `events_tx` to `Coordinator::with_events`, run, then:
//! drop(events_tx);
//! let tally = display.await.unwrap_or_default();
//! println!("{} of {} downloads finished", tally.completed, tally.queued);
//! # }
//! ```

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::DownloadEvent;

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable the visual progress bar
    pub enable_progress_bar: bool,
    /// Spinner tick rate
    pub tick_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bar: true,
            tick_interval: Duration::from_millis(120),
        }
    }
}

impl ProgressConfig {
    /// Progress bar only on an interactive terminal and outside quiet mode
    pub fn for_terminal(quiet: bool) -> Self {
        Self {
            enable_progress_bar: !quiet && atty::is(atty::Stream::Stderr),
            ..Default::default()
        }
    }
}

/// Event counts seen by the display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTally {
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ProgressTally {
    /// Fold one event into the counts
    pub fn record(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Queued { .. } => self.queued += 1,
            DownloadEvent::Finished {
                completed: true, ..
            } => self.completed += 1,
            DownloadEvent::Finished {
                completed: false, ..
            } => self.failed += 1,
        }
    }

    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }
}

/// Progress display fed by coordinator events
pub struct ProgressDisplay {
    config: ProgressConfig,
}

impl ProgressDisplay {
    pub fn new(config: ProgressConfig) -> Self {
        Self { config }
    }

    /// Consume events until every sender is dropped
    pub fn spawn(self, events: mpsc::UnboundedReceiver<DownloadEvent>) -> JoinHandle<ProgressTally> {
        let bar = if self.config.enable_progress_bar {
            Some(self.create_bar())
        } else {
            debug!("Progress bar disabled");
            None
        };

        tokio::spawn(drive(events, bar))
    }

    fn create_bar(&self) -> ProgressBar {
        let bar = ProgressBar::new(0);
        match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            Ok(style) => bar.set_style(style.progress_chars("##-")),
            Err(e) => debug!("Progress bar template error: {}", e),
        }
        bar.enable_steady_tick(self.config.tick_interval);
        bar.set_message("Harvesting media");
        bar
    }
}

async fn drive(
    mut events: mpsc::UnboundedReceiver<DownloadEvent>,
    bar: Option<ProgressBar>,
) -> ProgressTally {
    let mut tally = ProgressTally::default();

    while let Some(event) = events.recv().await {
        tally.record(event);

        if let Some(bar) = &bar {
            match event {
                DownloadEvent::Queued { .. } => bar.inc_length(1),
                DownloadEvent::Finished { .. } => bar.inc(1),
            }
            if tally.failed > 0 {
                bar.set_message(format!("{} failed", tally.failed));
            }
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    tally
}
