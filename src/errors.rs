//! Error types for Chat Harvest
//!
//! Errors are grouped by the component that raises them. Only transport errors
//! are allowed to end a run; download and link errors are absorbed per item by
//! the worker and the link collector and surface as log lines.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Message transport errors (fatal for the run)
#[derive(Error, Debug)]
pub enum TransportError {
    /// Export directory or file is missing
    #[error("Chat export not found: {path}")]
    ExportNotFound { path: PathBuf },

    /// Export JSON could not be parsed
    #[error("Invalid chat export format")]
    InvalidExport(#[from] serde_json::Error),

    /// Requested chat is not part of the history source
    #[error("Chat {chat_id} not found in history source")]
    ChatNotFound { chat_id: i64 },

    /// A message in the history source could not be interpreted
    #[error("Invalid message {message_id}: {reason}")]
    InvalidMessage { message_id: i64, reason: String },

    /// Several chats are available and none was selected
    #[error("History source contains {count} chats; set a target chat id to pick one")]
    AmbiguousChat { count: usize },

    /// Connection or authentication to the history source failed
    #[error("Transport connection failed: {reason}")]
    Connection { reason: String },

    /// I/O error while reading the history source
    #[error("Transport I/O error")]
    Io(#[from] io::Error),
}

/// Errors raised while fetching the bytes of a single message
#[derive(Error, Debug)]
pub enum DownloadError {
    /// I/O error writing the target file
    #[error("File I/O error: {0}")]
    Io(#[from] io::Error),

    /// The message carries no fetchable media
    #[error("Message {message_id} has no downloadable media")]
    NoMedia { message_id: i64 },

    /// The transport knows the media but cannot deliver it
    #[error("Media for message {message_id} is unavailable: {reason}")]
    SourceUnavailable { message_id: i64, reason: String },

    /// Transport-side failure during the transfer
    #[error("Transfer failed: {0}")]
    Transfer(String),
}

impl DownloadError {
    /// Whether this is a permission or file-lock error that a renamed retry can clear
    pub fn is_file_contention(&self) -> bool {
        match self {
            DownloadError::Io(e) => is_contention_io(e),
            DownloadError::NoMedia { .. }
            | DownloadError::SourceUnavailable { .. }
            | DownloadError::Transfer(_) => false,
        }
    }
}

fn is_contention_io(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }

    // ERROR_SHARING_VIOLATION and ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    if matches!(error.raw_os_error(), Some(32) | Some(33)) {
        return true;
    }

    false
}

/// Link collection errors
#[derive(Error, Debug)]
pub enum LinkError {
    /// The external viewer could not open the link
    #[error("Could not open {target}: {reason}")]
    OpenFailed { target: String, reason: String },

    /// The link is not something a viewer can open
    #[error("Not an openable URL: {link}")]
    NotOpenable { link: String },

    /// Writing the links file failed
    #[error("Failed to write links file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be rendered
    #[error("Configuration could not be serialized")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Home or config directory could not be determined
    #[error("Could not determine the {which} directory")]
    MissingDirectory { which: &'static str },

    /// Configuration validation failed
    #[error("Configuration validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<String> },
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Link collection error
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(e) => e.is_file_contention(),
            AppError::Link(LinkError::OpenFailed { .. }) => true,
            AppError::Transport(_)
            | AppError::Link(_)
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::Generic { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Transport(_) => "transport",
            AppError::Download(_) => "download",
            AppError::Link(_) => "links",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Link result type alias
pub type LinkResult<T> = std::result::Result<T, LinkError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
