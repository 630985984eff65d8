//! Configuration for the neighbor database.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CAIRN_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/cairn/config.toml
//!   3. ~/.config/cairn/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    pub neighbor: NeighborConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborConfig {
    /// Concurrent outstanding transfers allowed per neighbor.
    pub max_transfer_slots: usize,
    /// Free slots at or below this count mean the neighbor is near capacity.
    pub transfer_low_water: usize,
    /// Summary vector requests allowed before a new filter arrives.
    pub filter_request_budget: u32,
    /// Seconds after which an unanswered summary vector request is written
    /// off and the budget refilled. 0 = wait for a reply or a reset.
    pub filter_request_timeout_secs: u64,
    /// Seconds between expire sweeps.
    pub expire_interval_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            max_transfer_slots: 5,
            transfer_low_water: 2,
            filter_request_budget: 1,
            filter_request_timeout_secs: 120,
            expire_interval_secs: 60,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("cairn")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl CairnConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::file_path())
    }

    /// Load from an explicit path, then apply env overrides and validate.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            CairnConfig::default()
        };
        config.apply_env_overrides();
        config.neighbor.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CAIRN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&CairnConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CAIRN_* env var overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("CAIRN_NEIGHBOR__MAX_TRANSFER_SLOTS") {
            self.neighbor.max_transfer_slots = v;
        }
        if let Some(v) = env_parse("CAIRN_NEIGHBOR__TRANSFER_LOW_WATER") {
            self.neighbor.transfer_low_water = v;
        }
        if let Some(v) = env_parse("CAIRN_NEIGHBOR__FILTER_REQUEST_BUDGET") {
            self.neighbor.filter_request_budget = v;
        }
        if let Some(v) = env_parse("CAIRN_NEIGHBOR__FILTER_REQUEST_TIMEOUT_SECS") {
            self.neighbor.filter_request_timeout_secs = v;
        }
        if let Some(v) = env_parse("CAIRN_NEIGHBOR__EXPIRE_INTERVAL_SECS") {
            self.neighbor.expire_interval_secs = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl NeighborConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_transfer_slots == 0 {
            return Err(ConfigError::Invalid(
                "max_transfer_slots must be at least 1".into(),
            ));
        }
        if self.transfer_low_water > self.max_transfer_slots {
            return Err(ConfigError::Invalid(format!(
                "transfer_low_water ({}) exceeds max_transfer_slots ({})",
                self.transfer_low_water, self.max_transfer_slots
            )));
        }
        if self.expire_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "expire_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
