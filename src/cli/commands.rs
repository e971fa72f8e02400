//! Command handlers for Chat Harvest CLI
//!
//! This module implements the command handlers that turn CLI arguments and
//! the loaded configuration into calls on the core application.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::{
    Coordinator, ExportTransport, LinkCollector, RunSummary, SystemOpener, TempCleaner,
};
use crate::cli::{
    CleanArgs, ConfigAction, ConfigArgs, GlobalArgs, ProgressConfig, ProgressDisplay, RunArgs,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle the run command
///
/// Loads the configuration, layers the flags over it, prepares today's output
/// directory and runs the coordinator over the chat export.
pub async fn handle_run(args: RunArgs, global: &GlobalArgs) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let mut config = AppConfig::load(global.config.clone()).await?;
    args.apply_to(&mut config);

    let export = config.source.export.clone().ok_or_else(|| {
        AppError::generic("No chat export given; pass --export or set source.export in the config")
    })?;
    let (coordinator_config, output_config) = config.to_runtime_config()?;

    let output = output_config.today();
    output.create().await?;

    let links = LinkCollector::new(Arc::new(SystemOpener), output_config.links_file(&output))
        .with_open_links(output_config.open_links);
    let transport = Arc::new(ExportTransport::new(&export));
    info!("Reading chat export from {}", export.display());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let display = ProgressDisplay::new(ProgressConfig::for_terminal(global.quiet)).spawn(events_rx);

    // The coordinator owns the only sender; the display ends once it is dropped
    let result = Coordinator::new(coordinator_config, transport, output, links)
        .with_events(events_tx)
        .run()
        .await;

    match display.await {
        Ok(tally) => debug!(
            "Progress display saw {} queued, {} finished",
            tally.queued,
            tally.finished()
        ),
        Err(e) => warn!("Progress display ended abnormally: {}", e),
    }

    let summary = result?;
    if args.json {
        println!("{}", summary_json(&summary)?);
    } else if !global.quiet {
        print_summary(&summary);
    }

    Ok(())
}

fn summary_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary)
        .map_err(|e| AppError::generic(format!("Could not serialize run summary: {}", e)))
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Harvest Summary:");
    for line in summary.report.lines() {
        println!("  {}", line);
    }
    println!("  Messages scanned: {}", summary.scanned);
    println!("  Output: {}", summary.output_dir.display());
    if let Some(links_file) = &summary.links_file {
        println!("  Links saved to: {}", links_file.display());
    }
    if summary.temp_removed > 0 {
        println!("  Temp files removed: {}", summary.temp_removed);
    }
    println!("\n{}", summary.summary());
}

/// Handle the clean command
pub async fn handle_clean(args: CleanArgs, global: &GlobalArgs) -> Result<()> {
    let day = args.day(Local::now().date_naive()).map_err(AppError::generic)?;

    let mut config = AppConfig::load(global.config.clone()).await?;
    if let Some(root) = &args.output_root {
        config.output.root = Some(root.clone());
    }
    let output_config = config.output.to_runtime_config()?;
    output_config.validate()?;

    let dir = output_config.directory_for(day);
    let removed = TempCleaner::new(dir.path()).sweep().await?;
    info!("Removed {} temp files from {}", removed, dir.path().display());

    if !global.quiet {
        println!(
            "🧹 Removed {} temp file{} from {}",
            removed,
            if removed == 1 { "" } else { "s" },
            dir.path().display()
        );
    }

    Ok(())
}

/// Handle configuration commands
pub async fn handle_config(args: ConfigArgs, global: &GlobalArgs) -> Result<()> {
    match args.action {
        ConfigAction::Init { force } => {
            let path = match &global.config {
                Some(path) => {
                    AppConfig::write_default_config(path, force).await?;
                    path.clone()
                }
                None => AppConfig::initialize(force).await?,
            };

            println!("📁 Created default configuration file:");
            println!("   {}", path.display());
            println!("   You can customize settings by editing this file.");
            Ok(())
        }
        ConfigAction::Show => {
            let config = AppConfig::load(global.config.clone()).await?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
