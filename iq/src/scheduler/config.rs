//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Items per batch (the last batch of a job may be shorter)
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Idle time after each batch before the worker takes the next one
    #[serde(rename = "rate-limit-ms", default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Longest the worker sleeps on an empty queue before polling again
    #[serde(rename = "idle-poll-ms", default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Back-off after a batch fails
    #[serde(rename = "error-backoff-ms", default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

fn default_batch_size() -> usize {
    3
}

fn default_rate_limit_ms() -> u64 {
    5_000
}

fn default_idle_poll_ms() -> u64 {
    100
}

fn default_error_backoff_ms() -> u64 {
    1_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            rate_limit_ms: default_rate_limit_ms(),
            idle_poll_ms: default_idle_poll_ms(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.rate_limit(), Duration::from_secs(5));
        assert_eq!(config.idle_poll(), Duration::from_millis(100));
        assert_eq!(config.error_backoff(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: SchedulerConfig = serde_yaml::from_str("rate-limit-ms: 250").unwrap();
        assert_eq!(config.rate_limit(), Duration::from_millis(250));
        assert_eq!(config.batch_size, 3);
    }
}
