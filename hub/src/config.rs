use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Tickers polled every cycle
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,

    /// Extra pause after a cycle in which every ticker failed, in seconds
    #[serde(default = "default_error_backoff_sec")]
    pub error_backoff_sec: u64,

    /// Pending events a session may hold before it is dropped as lagging
    #[serde(default = "default_session_queue_capacity")]
    pub session_queue_capacity: usize,

    /// Subscriber reconnect policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl HubConfig {
    /// Get error backoff as Duration
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_sec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_queue_capacity == 0 {
            return Err(HubError::ConfigError(
                "session_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.watchlist.iter().any(|t| t.trim().is_empty()) {
            return Err(HubError::ConfigError("watchlist contains an empty ticker".to_string()));
        }
        Ok(())
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| HubError::ConfigError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HubConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }
}

/// Reconnect policy for subscriber sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Attempts before a session gives up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl ReconnectConfig {
    /// Get delay as Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

// Default value functions
fn default_watchlist() -> Vec<String> {
    ["AAPL", "MSFT", "GOOGL", "AMZN"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

fn default_error_backoff_sec() -> u64 {
    10
}

fn default_session_queue_capacity() -> usize {
    256
}

fn default_max_attempts() -> u32 {
    10
}

fn default_delay_ms() -> u64 {
    2000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            watchlist: default_watchlist(),
            error_backoff_sec: default_error_backoff_sec(),
            session_queue_capacity: default_session_queue_capacity(),
            reconnect: ReconnectConfig::default(),
        }
    }
}
