//! Chat Harvest Library
//!
//! A Rust library for harvesting recent media from a chat history. Messages
//! are streamed newest first, downloads run under separate concurrency limits
//! for videos and other media, and web links are collected for review.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
