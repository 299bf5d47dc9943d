//! Application settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ads::MIN_MATCH_RATIO;
use crate::debounce::DEFAULT_TIMEOUT_TICKS;
use crate::inline::{DEFAULT_CACHE_TIME_SECS, DEFAULT_IDLE_TICKS};

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to the exported category sheets.
    #[serde(default = "default_sheets_path")]
    pub sheets_path: PathBuf,

    /// Command prefix for admin console commands.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Milliseconds between heartbeat ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Quiet ticks before a user's query is resolved.
    #[serde(default = "default_debounce_ticks")]
    pub debounce_ticks: u32,

    /// Similarity a category must exceed to match a query.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Seconds clients may cache an answer.
    #[serde(default = "default_cache_time")]
    pub cache_time_secs: u32,

    /// Ticks without a pending query before a user's session is evicted.
    #[serde(default = "default_session_idle_ticks")]
    pub session_idle_ticks: u32,
}

fn default_sheets_path() -> PathBuf {
    PathBuf::from("sheets.json")
}

fn default_command_prefix() -> String {
    "/ads".to_owned()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_debounce_ticks() -> u32 {
    DEFAULT_TIMEOUT_TICKS
}

fn default_match_threshold() -> f64 {
    MIN_MATCH_RATIO
}

fn default_cache_time() -> u32 {
    DEFAULT_CACHE_TIME_SECS
}

fn default_session_idle_ticks() -> u32 {
    DEFAULT_IDLE_TICKS
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            sheets_path: default_sheets_path(),
            command_prefix: default_command_prefix(),
            tick_interval_ms: default_tick_interval_ms(),
            debounce_ticks: default_debounce_ticks(),
            match_threshold: default_match_threshold(),
            cache_time_secs: default_cache_time(),
            session_idle_ticks: default_session_idle_ticks(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            sheets_path: std::env::var("SHEETS_PATH")
                .map_or_else(|_| default_sheets_path(), PathBuf::from),
            command_prefix: std::env::var("COMMAND_PREFIX")
                .unwrap_or_else(|_| default_command_prefix()),
            tick_interval_ms: parse_env("TICK_INTERVAL_MS").unwrap_or_else(default_tick_interval_ms),
            debounce_ticks: parse_env("DEBOUNCE_TICKS").unwrap_or_else(default_debounce_ticks),
            match_threshold: parse_env("MATCH_THRESHOLD").unwrap_or_else(default_match_threshold),
            cache_time_secs: parse_env("CACHE_TIME_SECS").unwrap_or_else(default_cache_time),
            session_idle_ticks: parse_env("SESSION_IDLE_TICKS")
                .unwrap_or_else(default_session_idle_ticks),
        }
    }

    /// Checks the settings for values the bot cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero tick interval or idle timeout, or a
    /// threshold outside `[0, 1)`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }

        if self.session_idle_ticks == 0 {
            return Err(ConfigError::ZeroIdleTicks);
        }

        if !(0.0..1.0).contains(&self.match_threshold) {
            return Err(ConfigError::InvalidThreshold(self.match_threshold));
        }

        Ok(())
    }

    /// Time between heartbeat ticks.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Tick interval must be greater than zero")]
    ZeroTickInterval,

    #[error("Session idle timeout must be at least one tick")]
    ZeroIdleTicks,

    #[error("Invalid match threshold {0} (must be at least 0 and below 1)")]
    InvalidThreshold(f64),
}
