//! Configuration structures for the download coordinator
//!
//! This module defines the history window, the per-class limiter capacities
//! and the worker policy a run is scheduled with.

use serde::{Deserialize, Serialize};

use crate::app::worker::WorkerConfig;
use crate::constants::{concurrency, source};
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for the download coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Chat to read; `None` lets the transport pick its only chat
    pub chat_id: Option<i64>,
    /// Messages older than this many days end streaming
    pub days: u32,
    /// Upper bound on messages requested from the transport
    pub fetch_limit: usize,
    /// Concurrent photo and document downloads
    pub default_capacity: usize,
    /// Concurrent video downloads
    pub heavy_capacity: usize,
    /// Retry policy for each download
    pub worker_config: WorkerConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            chat_id: None,
            days: source::DEFAULT_DAYS,
            fetch_limit: source::DEFAULT_FETCH_LIMIT,
            default_capacity: concurrency::DEFAULT_CAPACITY,
            heavy_capacity: concurrency::DEFAULT_HEAVY_CAPACITY,
            worker_config: WorkerConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Read a specific chat
    pub fn with_chat(mut self, chat_id: i64) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    /// Set the age cutoff in days
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// Set the fetch limit
    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }

    /// Set both limiter capacities
    pub fn with_capacities(mut self, default: usize, heavy: usize) -> Self {
        self.default_capacity = default;
        self.heavy_capacity = heavy;
        self
    }

    /// Replace the worker policy
    pub fn with_worker_config(mut self, worker_config: WorkerConfig) -> Self {
        self.worker_config = worker_config;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("concurrency.default", self.default_capacity),
            ("concurrency.heavy", self.heavy_capacity),
        ] {
            if value == 0 || value > concurrency::MAX_CAPACITY {
                errors.push(format!(
                    "{} must be between 1 and {}, got {}",
                    field,
                    concurrency::MAX_CAPACITY,
                    value
                ));
            }
        }

        if self.fetch_limit == 0 {
            errors.push("source.limit must be positive".to_string());
        }

        if let Err(e) = self.worker_config.validate() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that default configuration is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.days, 6);
        assert_eq!(config.default_capacity, concurrency::DEFAULT_CAPACITY);
        assert_eq!(config.heavy_capacity, concurrency::DEFAULT_HEAVY_CAPACITY);
        assert_eq!(config.chat_id, None);
    }

    /// Test configuration builder methods
    ///
    /// Verifies that the builder methods modify the options they name and
    /// leave the result valid.
    #[test]
    fn test_config_builder_methods() {
        let config = CoordinatorConfig::default()
            .with_chat(-100)
            .with_days(2)
            .with_fetch_limit(50)
            .with_capacities(8, 1);

        assert_eq!(config.chat_id, Some(-100));
        assert_eq!(config.days, 2);
        assert_eq!(config.fetch_limit, 50);
        assert_eq!(config.default_capacity, 8);
        assert_eq!(config.heavy_capacity, 1);
        assert!(config.validate().is_ok());
    }

    /// Test that every invalid field is reported at once
    #[test]
    fn test_config_validation_collects_errors() {
        let config = CoordinatorConfig::default()
            .with_capacities(0, concurrency::MAX_CAPACITY + 1)
            .with_fetch_limit(0)
            .with_worker_config(WorkerConfig::default().with_max_attempts(0));

        match config.validate() {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}
