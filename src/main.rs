//! Chat Harvest CLI application
//!
//! Command-line interface for harvesting recent media from a chat export.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use chat_harvest::cli::{handle_clean, handle_config, handle_run, Cli, Commands};
use chat_harvest::config::AppConfig;
use chat_harvest::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Fatal {} error: {}", e.category(), e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(&cli).await;

    info!("Chat Harvest v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => {
            info!("Executing run command");
            handle_run(args, &cli.global).await
        }
        Commands::Clean(args) => {
            info!("Executing clean command");
            handle_clean(args, &cli.global).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args, &cli.global).await
        }
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
async fn init_logging(cli: &Cli) {
    let level = match cli.log_level() {
        Some(level) => level.to_string().to_lowercase(),
        None => AppConfig::load(cli.global.config.clone())
            .await
            .map(|config| config.logging.level)
            .unwrap_or_else(|_| "info".to_string()),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chat_harvest={}", level)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
