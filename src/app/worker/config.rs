//! Worker configuration management
//!
//! Retry policy and pacing for download workers, with validation and presets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::download;
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for download workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Total attempts per item, including the first
    pub max_attempts: u32,
    /// Pause after a successful download before the limiter slot is released
    pub success_cooldown: Duration,
    /// Pause before retrying under a renamed target
    pub retry_cooldown: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: download::MAX_ATTEMPTS,
            success_cooldown: download::SUCCESS_COOLDOWN,
            retry_cooldown: download::RETRY_COOLDOWN,
        }
    }
}

impl WorkerConfig {
    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "download.max_attempts".to_string(),
                value: self.max_attempts.to_string(),
                reason: "At least one attempt is required".to_string(),
            });
        }

        Ok(())
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set both cooldowns
    pub fn with_cooldowns(mut self, success: Duration, retry: Duration) -> Self {
        self.success_cooldown = success;
        self.retry_cooldown = retry;
        self
    }
}

/// Configuration presets for common scenarios
pub struct ConfigPresets;

impl ConfigPresets {
    /// No pacing at all, for tests and local sources
    pub fn testing() -> WorkerConfig {
        WorkerConfig {
            max_attempts: download::MAX_ATTEMPTS,
            success_cooldown: Duration::ZERO,
            retry_cooldown: Duration::ZERO,
        }
    }

    /// Slower pacing for rate-sensitive remote sources
    pub fn gentle() -> WorkerConfig {
        WorkerConfig {
            max_attempts: download::MAX_ATTEMPTS,
            success_cooldown: Duration::from_secs(3),
            retry_cooldown: Duration::from_secs(5),
        }
    }
}
