//! Download orchestration
//!
//! The coordinator drives one harvest run: it streams the chat history
//! newest first, classifies each message, schedules downloads under two
//! independent concurrency limiters and aggregates the results.
//!
//! # Key Features
//!
//! - **Age cutoff**: the first message older than the configured window ends
//!   streaming
//! - **Per-class limiters**: videos run under the heavy limiter, photos and
//!   documents under the default one
//! - **Two-phase drain**: all default-class downloads are awaited before the
//!   heavy ones
//! - **Link collection**: web pages and link-bearing text go to the
//!   [`LinkCollector`]
//! - **Fatal transport errors**: a failing history aborts the run and every
//!   download still in flight
//!
//! # Architecture
//!
//! - [`config`] - Configuration structures and validation
//! - [`stats`] - Per-kind counters, report rendering and the run summary
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chat_harvest::app::{
//!     Coordinator, CoordinatorConfig, ExportTransport, LinkCollector, OutputDirectory,
//!     SystemOpener,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let output = OutputDirectory::today(std::path::Path::new("/tmp"), "harvest");
//! output.create().await?;
//!
//! let links = LinkCollector::new(Arc::new(SystemOpener), output.path().join("links.txt"));
//! let transport = Arc::new(ExportTransport::new("ChatExport_2024-03-07"));
//!
//! let summary = Coordinator::new(CoordinatorConfig::default(), transport, output, links)
//!     .run()
//!     .await?;
//! println!("{}", summary.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod stats;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::app::links::LinkCollector;
use crate::app::models::{DownloadTask, MediaClass, MediaKind, Message, MessageMedia};
use crate::app::output::{OutputDirectory, PathResolver, TempCleaner};
use crate::app::transport::Transport;
use crate::app::worker::DownloadWorker;
use crate::constants::files;
use crate::errors::Result;

pub use config::CoordinatorConfig;
pub use stats::{ResultAggregator, RunStats, RunSummary};

/// Stage of a run, logged on entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Streaming,
    Draining,
    Finalizing,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Streaming => "streaming",
            RunPhase::Draining => "draining",
            RunPhase::Finalizing => "finalizing",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Progress notification for display layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadEvent {
    /// A download task was scheduled
    Queued { kind: MediaKind },
    /// A download task ended
    Finished { kind: MediaKind, completed: bool },
}

/// One concurrency class: its limiter and the tasks spawned under it
struct Lane {
    limiter: Arc<Semaphore>,
    tasks: JoinSet<()>,
}

impl Lane {
    fn new(capacity: usize) -> Self {
        Self {
            limiter: Arc::new(Semaphore::new(capacity)),
            tasks: JoinSet::new(),
        }
    }

    /// Await every task of this lane
    async fn drain(&mut self, class: MediaClass) {
        debug!("Awaiting {} {:?}-class downloads", self.tasks.len(), class);
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!("Download task for {:?} class ended abnormally: {}", class, e);
            }
        }
    }
}

/// Orchestrates a single harvest run
pub struct Coordinator {
    config: CoordinatorConfig,
    transport: Arc<dyn Transport>,
    output: OutputDirectory,
    resolver: PathResolver,
    cleaner: TempCleaner,
    links: LinkCollector,
    aggregator: ResultAggregator,
    events: Option<mpsc::UnboundedSender<DownloadEvent>>,
    reference_time: Option<DateTime<Utc>>,
    phase: RunPhase,
}

impl Coordinator {
    /// Create a coordinator writing into `output`
    ///
    /// The output directory is expected to exist already. The links file name
    /// is reserved so no download resolves onto it.
    pub fn new(
        config: CoordinatorConfig,
        transport: Arc<dyn Transport>,
        output: OutputDirectory,
        links: LinkCollector,
    ) -> Self {
        let resolver = PathResolver::new(output.path());
        if let Some(name) = links.links_file().file_name() {
            resolver.reserve(&name.to_string_lossy());
        }

        Self {
            resolver,
            cleaner: TempCleaner::new(output.path()),
            config,
            transport,
            output,
            links,
            aggregator: ResultAggregator::new(),
            events: None,
            reference_time: None,
            phase: RunPhase::Streaming,
        }
    }

    /// Measure the age cutoff from `now` instead of the wall clock
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    /// Send progress events to `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run the harvest to completion
    ///
    /// Download failures are logged and counted, never returned. A transport
    /// error while opening or reading the history ends the run with `Err`;
    /// downloads still in flight are aborted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid configuration and
    /// `AppError::Transport` when the history cannot be read.
    pub async fn run(mut self) -> Result<RunSummary> {
        self.config.validate()?;

        let now = self.reference_time.unwrap_or_else(Utc::now);
        let cutoff = now - chrono::Duration::days(i64::from(self.config.days));
        let worker = DownloadWorker::new(self.config.worker_config.clone(), self.transport.clone());
        let mut default_lane = Lane::new(self.config.default_capacity);
        let mut heavy_lane = Lane::new(self.config.heavy_capacity);

        info!(
            "Starting harvest into {} ({} default, {} heavy download slots)",
            self.output.path().display(),
            self.config.default_capacity,
            self.config.heavy_capacity
        );

        self.enter(RunPhase::Streaming);
        let mut history = self
            .transport
            .history(self.config.chat_id, self.config.fetch_limit)
            .await?;

        let mut scanned = 0;
        while let Some(item) = history.next().await {
            let message = item?;
            scanned += 1;

            if message.is_older_than(cutoff) {
                info!(
                    "Message {} from {} is older than {} days, stopping",
                    message.id, message.date, self.config.days
                );
                break;
            }

            let Some((task, class)) = self.classify(message) else {
                continue;
            };
            let lane = match class {
                MediaClass::Default => &mut default_lane,
                MediaClass::Heavy => &mut heavy_lane,
            };
            self.schedule(task, &worker, lane).await;
        }
        drop(history);

        self.enter(RunPhase::Draining);
        default_lane.drain(MediaClass::Default).await;
        heavy_lane.drain(MediaClass::Heavy).await;

        self.enter(RunPhase::Finalizing);
        let links_file = match self.links.flush().await {
            Ok(path) => path,
            Err(e) => {
                error!("Could not save collected links: {}", e);
                None
            }
        };
        let temp_removed = match self.cleaner.sweep().await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Temp file sweep failed: {}", e);
                0
            }
        };
        let report = self.aggregator.report().await;
        let stats = self.aggregator.snapshot().await;

        self.enter(RunPhase::Done);
        let mut summary = RunSummary::from_stats(&stats, self.output.path().to_path_buf(), report);
        summary.scanned = scanned;
        summary.links_file = links_file;
        summary.temp_removed = temp_removed;
        Ok(summary)
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        info!("Entering {} phase", phase);
    }

    /// Build a download task, or route the message to the link collector
    fn classify(&mut self, message: Message) -> Option<(DownloadTask, MediaClass)> {
        let path = match &message.media {
            MessageMedia::Video { file_name } => self
                .resolver
                .resolve_with_extension(file_name.as_deref(), files::VIDEO_EXTENSION),
            MessageMedia::Document { file_name } => self.resolver.resolve(file_name.as_deref()),
            MessageMedia::Photo => self.resolver.resolve(None),
            MessageMedia::WebPage { url } => {
                self.links.offer(url);
                return None;
            }
            MessageMedia::Text { text } => {
                if text.contains("http") {
                    warn!(
                        "Message {} contains a link in plain text, follow it up manually",
                        message.id
                    );
                    self.links.offer(text);
                }
                return None;
            }
            MessageMedia::None => return None,
        };

        let task = DownloadTask::new(message, path);
        let class = task.kind.class()?;
        Some((task, class))
    }

    /// Count and spawn a download under the lane's limiter
    async fn schedule(&self, task: DownloadTask, worker: &DownloadWorker, lane: &mut Lane) {
        let kind = task.kind;
        self.aggregator.record_queued(kind).await;
        self.emit(DownloadEvent::Queued { kind });
        debug!(
            "Queued {} from message {} as {}",
            kind,
            task.message.id,
            task.path.display()
        );

        let limiter = Arc::clone(&lane.limiter);
        let worker = worker.clone();
        let aggregator = self.aggregator.clone();
        let events = self.events.clone();

        lane.tasks.spawn(async move {
            let _permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let outcome = worker.download(&task.message, task.path).await;
            let completed = outcome.is_completed();
            if completed {
                aggregator.record_completed(kind).await;
            }
            if let Some(events) = events {
                let _ = events.send(DownloadEvent::Finished { kind, completed });
            }
        });
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("output", &self.output)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
