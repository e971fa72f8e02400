//! Download statistics tracking and aggregation
//!
//! This module tallies queued and completed downloads per media kind and
//! renders the end-of-run report.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::app::models::MediaKind;

/// Per-kind download counters of one run
#[derive(Debug, Clone)]
pub struct RunStats {
    completed: BTreeMap<MediaKind, usize>,
    queued: BTreeMap<MediaKind, usize>,
    started: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            completed: BTreeMap::new(),
            queued: BTreeMap::new(),
            started: Instant::now(),
        }
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a download task as enqueued
    pub fn record_queued(&mut self, kind: MediaKind) {
        *self.queued.entry(kind).or_insert(0) += 1;
    }

    /// Count a successful download
    pub fn record_completed(&mut self, kind: MediaKind) {
        *self.completed.entry(kind).or_insert(0) += 1;
    }

    /// Successful downloads of `kind`
    pub fn completed(&self, kind: MediaKind) -> usize {
        self.completed.get(&kind).copied().unwrap_or(0)
    }

    /// Enqueued downloads of `kind`
    pub fn queued(&self, kind: MediaKind) -> usize {
        self.queued.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_completed(&self) -> usize {
        self.completed.values().sum()
    }

    pub fn total_queued(&self) -> usize {
        self.queued.values().sum()
    }

    /// Downloads that were enqueued but never completed
    pub fn failed(&self) -> usize {
        self.total_queued().saturating_sub(self.total_completed())
    }

    /// Wall time since the counters were created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Report lines for a run that took `elapsed`
    ///
    /// Kinds without a successful download are left out; kinds appear in
    /// their declaration order.
    pub fn report_lines(&self, elapsed: Duration) -> Vec<String> {
        let mut lines = vec![format!("Total downloads: {}", self.total_completed())];

        lines.extend(
            self.completed
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(kind, count)| format!("  {}: {}", kind, count)),
        );

        let failed = self.failed();
        if failed > 0 {
            lines.push(format!("Failed downloads: {}", failed));
        }

        lines.push(format!("Elapsed time: {:.2} s", elapsed.as_secs_f64()));
        lines
    }
}

/// Shared, serialized access to the run counters
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    stats: Arc<Mutex<RunStats>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_queued(&self, kind: MediaKind) {
        self.stats.lock().await.record_queued(kind);
    }

    pub async fn record_completed(&self, kind: MediaKind) {
        self.stats.lock().await.record_completed(kind);
    }

    /// Copy of the current counters
    pub async fn snapshot(&self) -> RunStats {
        self.stats.lock().await.clone()
    }

    /// Render the run report and log each line
    pub async fn report(&self) -> String {
        let stats = self.stats.lock().await;
        let lines = stats.report_lines(stats.elapsed());
        for line in &lines {
            info!("{}", line.trim_start());
        }
        lines.join("\n")
    }
}

/// Final result of a harvest run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Directory the run wrote to
    pub output_dir: PathBuf,
    /// Messages pulled from the history, including the one that ended streaming
    pub scanned: usize,
    /// Successful downloads per kind
    pub completed: BTreeMap<MediaKind, usize>,
    /// Enqueued downloads per kind
    pub queued: BTreeMap<MediaKind, usize>,
    /// Links file written at the end of the run, if any link was buffered
    pub links_file: Option<PathBuf>,
    /// Retry artifacts removed by the final sweep
    pub temp_removed: usize,
    /// Wall time of the whole run
    pub elapsed: Duration,
    /// Rendered report
    pub report: String,
}

impl RunSummary {
    pub(crate) fn from_stats(stats: &RunStats, output_dir: PathBuf, report: String) -> Self {
        Self {
            output_dir,
            scanned: 0,
            completed: stats.completed.clone(),
            queued: stats.queued.clone(),
            links_file: None,
            temp_removed: 0,
            elapsed: stats.elapsed(),
            report,
        }
    }

    pub fn total_completed(&self) -> usize {
        self.completed.values().sum()
    }

    pub fn total_queued(&self) -> usize {
        self.queued.values().sum()
    }

    pub fn failed(&self) -> usize {
        self.total_queued().saturating_sub(self.total_completed())
    }

    /// One-line outcome for the CLI
    pub fn summary(&self) -> String {
        if self.failed() == 0 {
            format!(
                "Harvest completed: {} files in {:.2} s",
                self.total_completed(),
                self.elapsed.as_secs_f64()
            )
        } else {
            format!(
                "Harvest completed with failures: {} of {} files in {:.2} s",
                self.total_completed(),
                self.total_queued(),
                self.elapsed.as_secs_f64()
            )
        }
    }
}
