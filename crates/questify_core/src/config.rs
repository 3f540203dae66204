//! Engine configuration.
//!
//! # Responsibility
//! - Hold every tunable the progression engine reads (quest count, XP
//!   bonuses, day-bucketing offset, retry budget, credential rules).
//! - Load and validate configuration from JSON files.
//!
//! # Invariants
//! - A validated config always yields a representable day offset.
//! - Missing JSON fields fall back to [`EngineConfig::default`].

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Tunables passed into the progress service at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quests drawn per daily rotation.
    pub daily_task_count: usize,
    /// XP awarded for completing one daily quest.
    pub daily_quest_xp: u64,
    /// XP awarded for completing one ad-hoc task.
    pub ad_hoc_task_xp: u64,
    /// Reference zone for calendar days, as minutes east of UTC.
    pub day_offset_minutes: i32,
    /// Read-modify-write attempts before a version conflict is surfaced.
    pub max_write_attempts: u32,
    pub min_password_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            daily_task_count: 3,
            daily_quest_xp: 15,
            ad_hoc_task_xp: 10,
            day_offset_minutes: 0,
            max_write_attempts: 3,
            min_password_len: 6,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daily_task_count == 0 {
            return Err(ConfigError::Invalid(
                "daily_task_count must be at least 1".to_string(),
            ));
        }
        if self.day_offset_minutes.abs() >= MINUTES_PER_DAY {
            return Err(ConfigError::Invalid(format!(
                "day_offset_minutes must be within +/-{MINUTES_PER_DAY} (exclusive), got {}",
                self.day_offset_minutes
            )));
        }
        if self.max_write_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_write_attempts must be at least 1".to_string(),
            ));
        }
        if self.min_password_len == 0 {
            return Err(ConfigError::Invalid(
                "min_password_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Fixed offset used to bucket timestamps into calendar days.
    ///
    /// Falls back to UTC for an out-of-range offset; `validate()` rejects
    /// those up front.
    pub fn day_zone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.day_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Parses and validates a JSON config document.
pub fn parse_config(json: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Reads, parses and validates a JSON config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    parse_config(&raw)
}
