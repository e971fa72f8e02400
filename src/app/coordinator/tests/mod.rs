//! Unit tests for the coordinator
//!
//! Runs are driven through a [`MemoryTransport`] with scripted failures and a
//! recording link opener. End-to-end runs over an export live in the
//! top-level tests directory.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;
use tempfile::TempDir;
use tracing::Level;

use super::*;
use crate::app::links::tests::RecordingOpener;
use crate::app::transport::{MemoryTransport, ScriptedFailure};
use crate::app::worker::tests::{capture_logs, CapturedLogs};
use crate::app::worker::ConfigPresets;
use crate::errors::{AppError, TransportError};

fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap()
}

fn at_hours_ago(hours: i64) -> DateTime<Utc> {
    reference_time() - chrono::Duration::hours(hours)
}

fn photo(id: i64, hours_ago: i64) -> Message {
    Message::new(id, at_hours_ago(hours_ago), MessageMedia::Photo)
}

fn video(id: i64, hours_ago: i64, name: Option<&str>) -> Message {
    Message::new(
        id,
        at_hours_ago(hours_ago),
        MessageMedia::Video {
            file_name: name.map(str::to_string),
        },
    )
}

fn document(id: i64, hours_ago: i64, name: &str) -> Message {
    Message::new(
        id,
        at_hours_ago(hours_ago),
        MessageMedia::Document {
            file_name: Some(name.to_string()),
        },
    )
}

fn text(id: i64, hours_ago: i64, body: &str) -> Message {
    Message::new(
        id,
        at_hours_ago(hours_ago),
        MessageMedia::Text {
            text: body.to_string(),
        },
    )
}

fn web_page(id: i64, hours_ago: i64, url: &str) -> Message {
    Message::new(
        id,
        at_hours_ago(hours_ago),
        MessageMedia::WebPage {
            url: url.to_string(),
        },
    )
}

/// Create test coordinator configuration
///
/// No pacing between downloads so tests finish quickly.
fn test_config(default_capacity: usize, heavy_capacity: usize) -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_capacities(default_capacity, heavy_capacity)
        .with_worker_config(ConfigPresets::testing())
}

fn coordinator(
    dir: &TempDir,
    config: CoordinatorConfig,
    transport: Arc<MemoryTransport>,
    opener: Arc<RecordingOpener>,
) -> Coordinator {
    let links = LinkCollector::new(opener, dir.path().join("links.txt"));
    Coordinator::new(config, transport, OutputDirectory::at(dir.path()), links)
        .with_reference_time(reference_time())
}

/// Test that the first message past the age window ends streaming
///
/// Four messages, the third older than the window: three are pulled and
/// only the two recent ones are downloaded.
#[tokio::test]
async fn test_cutoff_stops_streaming() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(
        1,
        vec![
            photo(1, 1),
            video(2, 2, Some("clip.mp4")),
            photo(3, 24 * 10),
            document(4, 24 * 11, "old.pdf"),
        ],
    ));

    let summary = coordinator(
        &dir,
        test_config(4, 2),
        transport.clone(),
        Arc::new(RecordingOpener::default()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(transport.pulled(), 3);
    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.total_queued(), 2);
    assert_eq!(summary.total_completed(), 2);
    assert_eq!(summary.completed.get(&MediaKind::Photo), Some(&1));
    assert_eq!(summary.completed.get(&MediaKind::Video), Some(&1));
    assert!(dir.path().join("clip.mp4").exists());
    assert!(!dir.path().join("old.pdf").exists());
}

/// Test that web pages are buffered when the viewer is unavailable
#[tokio::test]
async fn test_web_page_buffered_and_flushed() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(
        1,
        vec![web_page(1, 1, "https://example.com")],
    ));
    let opener = Arc::new(RecordingOpener::unavailable());

    let summary = coordinator(&dir, test_config(4, 2), transport, opener.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.total_queued(), 0);
    let links_file = summary.links_file.expect("links file written");
    assert_eq!(links_file, dir.path().join("links.txt"));
    let content = tokio::fs::read_to_string(&links_file).await.unwrap();
    assert_eq!(content, "https://example.com\n");
    assert_eq!(opener.revealed.lock().unwrap().as_slice(), [links_file]);
}

/// Test that link-bearing text is offered whole and plain text is ignored
#[tokio::test]
async fn test_text_routing_keeps_full_text() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(
        1,
        vec![
            text(1, 1, "check http://x"),
            text(2, 2, "no links here"),
            text(3, 3, "mirror at https://example.org/a please"),
        ],
    ));
    let opener = Arc::new(RecordingOpener::unavailable());

    let summary = coordinator(&dir, test_config(4, 2), transport, opener)
        .run()
        .await
        .unwrap();

    let content = tokio::fs::read_to_string(summary.links_file.unwrap())
        .await
        .unwrap();
    assert_eq!(
        content,
        "check http://x\nmirror at https://example.org/a please\n"
    );
}

/// Test that opened links are not written to the links file
#[tokio::test]
async fn test_opened_links_leave_no_file() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(
        1,
        vec![web_page(1, 1, "https://example.com/post")],
    ));
    let opener = Arc::new(RecordingOpener::default());

    let summary = coordinator(&dir, test_config(4, 2), transport, opener.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.links_file, None);
    assert_eq!(
        opener.opened.lock().unwrap().as_slice(),
        ["https://example.com/post".to_string()]
    );
    assert!(!dir.path().join("links.txt").exists());
}

/// Test that counters match the transport's successes at several capacities
///
/// Some downloads fail terminally and one succeeds only after a rename; the
/// per-kind totals must equal the successful fetches and the limiters must
/// never be exceeded.
#[tokio::test]
async fn test_stats_match_successes_across_capacities() {
    for capacity in [1usize, 2, 10] {
        let dir = TempDir::new().unwrap();
        let mut messages = Vec::new();
        for id in 0..12 {
            messages.push(match id % 3 {
                0 => photo(id, 1),
                1 => video(id, 1, None),
                _ => document(id, 1, "report.pdf"),
            });
        }
        let transport = Arc::new(
            MemoryTransport::new(1, messages)
                .with_fetch_delay(Duration::from_millis(5))
                .script_failures(0, [ScriptedFailure::Transfer])
                .script_failures(4, [ScriptedFailure::Transfer])
                .script_failures(5, [ScriptedFailure::PermissionDenied]),
        );

        let summary = coordinator(
            &dir,
            test_config(capacity, capacity),
            transport.clone(),
            Arc::new(RecordingOpener::default()),
        )
        .run()
        .await
        .unwrap();

        assert_eq!(summary.total_queued(), 12, "capacity {}", capacity);
        assert_eq!(
            summary.total_completed(),
            transport.successful_fetches(),
            "capacity {}",
            capacity
        );
        assert_eq!(summary.total_completed(), 10);
        assert_eq!(summary.failed(), 2);
        assert!(transport.peak_in_flight(MediaClass::Default) <= capacity);
        assert!(transport.peak_in_flight(MediaClass::Heavy) <= capacity);
    }
}

/// Test that the heavy limiter is independent of the default one
#[tokio::test]
async fn test_limiters_bound_each_class() {
    let dir = TempDir::new().unwrap();
    let mut messages = Vec::new();
    for id in 0..6 {
        messages.push(photo(id, 1));
        messages.push(video(100 + id, 1, None));
    }
    let transport =
        Arc::new(MemoryTransport::new(1, messages).with_fetch_delay(Duration::from_millis(20)));

    coordinator(
        &dir,
        test_config(3, 1),
        transport.clone(),
        Arc::new(RecordingOpener::default()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(transport.peak_in_flight(MediaClass::Heavy), 1);
    assert!(transport.peak_in_flight(MediaClass::Default) <= 3);
    assert!(transport.peak_in_flight(MediaClass::Default) > 1);
}

/// Test that a run returns only after every download has ended
#[tokio::test]
async fn test_drain_awaits_all_downloads() {
    let dir = TempDir::new().unwrap();
    let messages = (0..8)
        .map(|id| {
            if id % 2 == 0 {
                video(id, 1, None)
            } else {
                photo(id, 1)
            }
        })
        .collect();
    let transport =
        Arc::new(MemoryTransport::new(1, messages).with_fetch_delay(Duration::from_millis(10)));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let summary = coordinator(
        &dir,
        test_config(2, 1),
        transport.clone(),
        Arc::new(RecordingOpener::default()),
    )
    .with_events(tx)
    .run()
    .await
    .unwrap();

    assert_eq!(transport.fetches().len(), 8);
    assert_eq!(summary.total_completed(), 8);

    let mut queued = 0;
    let mut finished = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            DownloadEvent::Queued { .. } => queued += 1,
            DownloadEvent::Finished { completed, .. } => {
                assert!(completed);
                finished += 1;
            }
        }
    }
    assert_eq!((queued, finished), (8, 8));
}

/// Test that exhausted retries log one error and leave no temp files
#[tokio::test]
async fn test_exhausted_download_is_swept() {
    let dir = TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("stale.png.abc.temp"), b"")
        .await
        .unwrap();
    let transport = Arc::new(
        MemoryTransport::new(1, vec![photo(1, 1), document(2, 1, "kept.pdf")])
            .script_failures(1, [ScriptedFailure::PermissionDenied; 3]),
    );
    let logs = CapturedLogs::default();

    let summary = {
        let _guard = capture_logs(&logs);
        coordinator(
            &dir,
            test_config(4, 2),
            transport.clone(),
            Arc::new(RecordingOpener::default()),
        )
        .run()
        .await
        .unwrap()
    };

    assert_eq!(logs.count(Level::ERROR), 1);
    assert_eq!(summary.total_completed(), 1);
    assert_eq!(summary.failed(), 1);
    assert!(summary.report.contains("Failed downloads: 1"));
    assert_eq!(summary.temp_removed, 1);

    let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        assert!(!entry.file_name().to_string_lossy().ends_with(".temp"));
    }
    assert!(dir.path().join("kept.pdf").exists());
}

/// Test that a history error mid-stream fails the run
#[tokio::test]
async fn test_stream_error_is_fatal() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(
        MemoryTransport::new(1, vec![photo(1, 1), photo(2, 2), photo(3, 3)]).fail_stream_after(1),
    );

    let result = coordinator(
        &dir,
        test_config(4, 2),
        transport,
        Arc::new(RecordingOpener::default()),
    )
    .run()
    .await;

    assert!(matches!(
        result,
        Err(AppError::Transport(TransportError::Connection { .. }))
    ));
}

/// Test that an unknown chat fails before anything is scheduled
#[tokio::test]
async fn test_unknown_chat_is_fatal() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(1, vec![photo(1, 1)]));

    let result = coordinator(
        &dir,
        test_config(4, 2).with_chat(99),
        transport.clone(),
        Arc::new(RecordingOpener::default()),
    )
    .run()
    .await;

    assert!(matches!(
        result,
        Err(AppError::Transport(TransportError::ChatNotFound { chat_id: 99 }))
    ));
    assert!(transport.fetches().is_empty());
}

/// Test that an invalid configuration is rejected up front
#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(1, vec![photo(1, 1)]));

    let result = coordinator(
        &dir,
        test_config(0, 2),
        transport.clone(),
        Arc::new(RecordingOpener::default()),
    )
    .run()
    .await;

    assert!(matches!(result, Err(AppError::Config(_))));
    assert_eq!(transport.pulled(), 0);
}

/// Test that unnamed videos get a video extension and names never collide
#[tokio::test]
async fn test_resolved_names() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(
        1,
        vec![
            video(1, 1, None),
            document(2, 2, "report.pdf"),
            document(3, 3, "report.pdf"),
        ],
    ));

    coordinator(
        &dir,
        test_config(4, 2),
        transport.clone(),
        Arc::new(RecordingOpener::default()),
    )
    .run()
    .await
    .unwrap();

    let fetches = transport.fetches();
    let video_path = &fetches.iter().find(|f| f.message_id == 1).unwrap().path;
    assert_eq!(video_path.extension().unwrap(), "mp4");
    assert!(dir.path().join("report.pdf").exists());
    assert!(dir.path().join("report (1).pdf").exists());
}

/// Test that a document named like the links file keeps its content
#[tokio::test]
async fn test_document_does_not_clash_with_links_file() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(
        1,
        vec![
            document(1, 1, "links.txt"),
            web_page(2, 2, "https://example.com"),
        ],
    ));

    let summary = coordinator(
        &dir,
        test_config(4, 2),
        transport,
        Arc::new(RecordingOpener::unavailable()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.total_completed(), 1);
    let links = tokio::fs::read_to_string(dir.path().join("links.txt"))
        .await
        .unwrap();
    assert_eq!(links, "https://example.com\n");
    let document = tokio::fs::read_to_string(dir.path().join("links (1).txt"))
        .await
        .unwrap();
    assert_eq!(document, "message 1");
}

/// Test that a document whose name ends in .temp survives the final sweep
#[tokio::test]
async fn test_temp_named_document_survives_sweep() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(MemoryTransport::new(
        1,
        vec![document(1, 1, "backup.temp")],
    ));

    let summary = coordinator(
        &dir,
        test_config(4, 2),
        transport,
        Arc::new(RecordingOpener::default()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.total_completed(), 1);
    assert_eq!(summary.temp_removed, 0);
    let content = tokio::fs::read_to_string(dir.path().join("backup_temp"))
        .await
        .unwrap();
    assert_eq!(content, "message 1");
}
