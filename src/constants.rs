//! Application constants for Chat Harvest
//!
//! Centralizes defaults and fixed values, organized by functional domain.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Target chat identifier
    pub const TARGET: &str = "CHAT_HARVEST_TARGET";

    /// Age cutoff in days
    pub const DAYS: &str = "CHAT_HARVEST_DAYS";

    /// Message fetch limit
    pub const LIMIT: &str = "CHAT_HARVEST_LIMIT";

    /// Default-class concurrency capacity
    pub const CONCURRENCY: &str = "CHAT_HARVEST_CONCURRENCY";

    /// Heavy-class (video) concurrency capacity
    pub const VIDEO_CONCURRENCY: &str = "CHAT_HARVEST_VIDEO_CONCURRENCY";

    /// Output catalog name
    pub const CATALOG: &str = "CHAT_HARVEST_CATALOG";

    /// Links file name
    pub const LINKS_FILENAME: &str = "CHAT_HARVEST_LINKS_FILENAME";
}

/// History window defaults
pub mod source {
    /// Messages older than this many days end the stream
    pub const DEFAULT_DAYS: u32 = 6;

    /// Maximum number of messages requested from the transport
    pub const DEFAULT_FETCH_LIMIT: usize = 1000;
}

/// Concurrency limiter defaults
pub mod concurrency {
    /// Parallel photo/document downloads
    pub const DEFAULT_CAPACITY: usize = 4;

    /// Parallel video downloads
    pub const DEFAULT_HEAVY_CAPACITY: usize = 2;

    /// Upper bound accepted for either limiter
    pub const MAX_CAPACITY: usize = 64;
}

/// Download worker retry policy
pub mod download {
    use super::Duration;

    /// Total attempts per item, including the first
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Pause after a successful download before the slot is released
    pub const SUCCESS_COOLDOWN: Duration = Duration::from_secs(1);

    /// Pause before retrying under a renamed target
    pub const RETRY_COOLDOWN: Duration = Duration::from_secs(2);
}

/// File naming constants
pub mod files {
    /// Marker extension for retry artifacts
    pub const TEMP_MARKER: &str = ".temp";

    /// Extension for synthesized photo names
    pub const PHOTO_EXTENSION: &str = "png";

    /// Extension for synthesized video names
    pub const VIDEO_EXTENSION: &str = "mp4";

    /// Length of synthesized names (without extension)
    pub const SYNTHESIZED_NAME_LEN: usize = 5;

    /// Characters stripped from requested file names
    pub const FORBIDDEN_CHARS: &[char] = &['/', '\\', '*', ':', '|', '"', '<', '>', '?', '\n', '\r'];

    /// Default name of the links file
    pub const DEFAULT_LINKS_FILENAME: &str = "links.txt";

    /// Default output catalog under the output root
    pub const DEFAULT_CATALOG: &str = "chat-harvest";

    /// Date format of the per-day output directory
    pub const DAY_DIR_FORMAT: &str = "%d.%m";
}

/// Configuration file locations
pub mod config {
    /// Project-local config file name
    pub const LOCAL_FILE: &str = "chat-harvest.toml";

    /// Directory under the user config dir
    pub const APP_DIR: &str = "chat-harvest";

    /// File name under the app config dir
    pub const FILE_NAME: &str = "config.toml";
}

/// Telegram Desktop export format
pub mod export {
    /// Name of the JSON file inside an export directory
    pub const RESULT_FILE: &str = "result.json";

    /// Placeholder Telegram Desktop writes when media was not exported
    pub const NOT_INCLUDED_PREFIX: &str = "(File not included";
}

// Re-export commonly used constants for convenience
pub use concurrency::{DEFAULT_CAPACITY, DEFAULT_HEAVY_CAPACITY};
pub use download::MAX_ATTEMPTS;
pub use files::{DEFAULT_LINKS_FILENAME, TEMP_MARKER};
pub use source::{DEFAULT_DAYS, DEFAULT_FETCH_LIMIT};
