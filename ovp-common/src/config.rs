//! Bootstrap configuration for the OVP player
//!
//! A single TOML file configures logging and the playback policy knobs.
//! Everything else (segment duration, track layout) is derived from the
//! manifest at session init and never configured here.
//!
//! All fields have built-in defaults; an absent file yields the default
//! configuration rather than an error.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level TOML configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Playback policy (optional)
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Playback policy knobs consumed by the player engine at init
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Ceiling on buffered look-ahead, in milliseconds.
    ///
    /// The scheduler never lets buffered-ahead media exceed this by more
    /// than one segment duration.
    #[serde(default = "default_buffer_budget_ms")]
    pub buffer_budget_ms: u64,

    /// Restart playback from segment 1 when the content ends
    #[serde(default = "default_loop_playback")]
    pub loop_playback: bool,

    /// Consecutive divergent track resolutions required before a track
    /// switch is committed. Damps single-frame gaze jitter.
    #[serde(default = "default_switch_hysteresis")]
    pub switch_hysteresis: u32,

    /// Interval of the handoff readiness poll, in milliseconds
    #[serde(default = "default_handoff_poll_interval_ms")]
    pub handoff_poll_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_budget_ms: default_buffer_budget_ms(),
            loop_playback: default_loop_playback(),
            switch_hysteresis: default_switch_hysteresis(),
            handoff_poll_interval_ms: default_handoff_poll_interval_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_buffer_budget_ms() -> u64 {
    6000
}

fn default_loop_playback() -> bool {
    true
}

fn default_switch_hysteresis() -> u32 {
    2
}

fn default_handoff_poll_interval_ms() -> u64 {
    100
}

impl TomlConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.playback.buffer_budget_ms == 0 {
            return Err(Error::Config(
                "playback.buffer_budget_ms must be greater than zero".to_string(),
            ));
        }
        if self.playback.switch_hysteresis == 0 {
            return Err(Error::Config(
                "playback.switch_hysteresis must be at least 1".to_string(),
            ));
        }
        if self.playback.handoff_poll_interval_ms == 0 {
            return Err(Error::Config(
                "playback.handoff_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
