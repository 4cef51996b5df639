//! Configuration loader and validator for the playlist harvester.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;
use crate::scanner::ScanPolicy;
use crate::writer::{VerifyPolicy, WritePolicy};

pub const ACCESS_TOKEN_ENV: &str = "YOUTUBE_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Unknown channel category: {0}")]
    UnknownCategory(String),
    #[error("No collection configured under name: {0}")]
    MissingCollection(String),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub youtube: YouTube,
    pub files: Files,
    pub run: Run,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub writer: Writer,
}

/// Where run artifacts go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub logs_dir: String,
    pub ledger_dir: String,
    #[serde(default = "default_keep_logs")]
    pub keep_logs: usize,
}

/// Upstream access. The token is obtained out of band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YouTube {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Static JSON inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Files {
    pub channels: String,
    pub collections: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Run {
    pub category: String,
    pub short_collection: String,
    pub long_collection: String,
    #[serde(default = "default_threshold_minutes")]
    pub long_threshold_minutes: u64,
    #[serde(default)]
    pub ignored_channels: Vec<String>,
    #[serde(default)]
    pub exception_channels: Vec<String>,
    #[serde(default = "default_fallback_days")]
    pub fallback_window_days: i64,
}

/// Cost units per the upstream's quota accounting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Budget {
    pub per_item_cost: u64,
    pub channel_cost_cap: u64,
    pub run_cost_warning: u64,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            per_item_cost: 50,
            channel_cost_cap: 2000,
            run_cost_warning: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Writer {
    pub pacing_base_ms: u64,
    pub pacing_step_ms: u64,
    pub backoff_seconds: u64,
    /// Absent means retry transient failures without limit.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub verify: VerifyPolicy,
}

impl Default for Writer {
    fn default() -> Self {
        Self {
            pacing_base_ms: 1000,
            pacing_step_ms: 100,
            backoff_seconds: 5,
            max_attempts: None,
            verify: VerifyPolicy::Record,
        }
    }
}

fn default_keep_logs() -> usize {
    crate::runlog::DEFAULT_KEEP
}

fn default_threshold_minutes() -> u64 {
    10
}

fn default_fallback_days() -> i64 {
    7
}

impl Config {
    /// Ensure the log and ledger directories exist.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.app.logs_dir)?;
        fs::create_dir_all(&self.app.ledger_dir)
    }

    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from(&self.app.logs_dir)
    }

    pub fn ledger_dir(&self) -> PathBuf {
        PathBuf::from(&self.app.ledger_dir)
    }

    pub fn access_token(&self) -> Option<String> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(self.youtube.access_token.clone()).filter(|t| !t.trim().is_empty()))
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.run.long_threshold_minutes * 60)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_secs(self.writer.backoff_seconds),
            max_attempts: self.writer.max_attempts,
        }
    }

    pub fn scan_policy(&self) -> ScanPolicy {
        ScanPolicy {
            ignored: self.run.ignored_channels.iter().cloned().collect::<HashSet<_>>(),
            exceptions: self.run.exception_channels.iter().cloned().collect::<HashSet<_>>(),
            per_item_cost: self.budget.per_item_cost,
            channel_cost_cap: self.budget.channel_cost_cap,
            run_cost_warning: self.budget.run_cost_warning,
        }
    }

    pub fn write_policy(&self) -> WritePolicy {
        WritePolicy {
            pacing_base: Duration::from_millis(self.writer.pacing_base_ms),
            pacing_step: Duration::from_millis(self.writer.pacing_step_ms),
            retry: self.retry_policy(),
            verify: self.writer.verify,
            per_item_cost: self.budget.per_item_cost,
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.logs_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.logs_dir must be non-empty"));
    }
    if cfg.app.ledger_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.ledger_dir must be non-empty"));
    }
    if cfg.app.keep_logs == 0 {
        return Err(ConfigError::Invalid("app.keep_logs must be > 0"));
    }

    if cfg.files.channels.trim().is_empty() {
        return Err(ConfigError::Invalid("files.channels must be non-empty"));
    }
    if cfg.files.collections.trim().is_empty() {
        return Err(ConfigError::Invalid("files.collections must be non-empty"));
    }

    if cfg.run.category.trim().is_empty() {
        return Err(ConfigError::Invalid("run.category must be non-empty"));
    }
    if cfg.run.short_collection.trim().is_empty() {
        return Err(ConfigError::Invalid("run.short_collection must be non-empty"));
    }
    if cfg.run.long_collection.trim().is_empty() {
        return Err(ConfigError::Invalid("run.long_collection must be non-empty"));
    }
    if cfg.run.long_threshold_minutes == 0 {
        return Err(ConfigError::Invalid("run.long_threshold_minutes must be > 0"));
    }
    if cfg.run.fallback_window_days <= 0 {
        return Err(ConfigError::Invalid("run.fallback_window_days must be > 0"));
    }

    if cfg.budget.per_item_cost == 0 {
        return Err(ConfigError::Invalid("budget.per_item_cost must be > 0"));
    }
    if cfg.writer.max_attempts == Some(0) {
        return Err(ConfigError::Invalid("writer.max_attempts must be > 0 when set"));
    }

    Ok(())
}

/// Returns the example YAML shipped with the tool.
pub fn example() -> &'static str {
    r#"app:
  logs_dir: "./Logs"
  ledger_dir: "./files"
  keep_logs: 9

youtube:
  # Overridden by YOUTUBE_ACCESS_TOKEN when set.
  access_token: "YOUR_OAUTH_ACCESS_TOKEN"

files:
  channels: "./files/PocketTube_DB.json"
  collections: "./files/temp_playlist.json"

run:
  category: "MUSIQUE"
  short_collection: "music"
  long_collection: "mix"
  long_threshold_minutes: 10
  ignored_channels: []
  exception_channels:
    - "UC4YCVy0ggUoFd2NVU2z04WA"
  fallback_window_days: 7

budget:
  per_item_cost: 50
  channel_cost_cap: 2000
  run_cost_warning: 8000

writer:
  pacing_base_ms: 1000
  pacing_step_ms: 100
  backoff_seconds: 5
  max_attempts: 60
  verify: "record"
"#
}
