//! Run log text, log-directory bookkeeping and not-added ledgers.
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info};

use crate::model::Window;

pub const DEFAULT_KEEP: usize = 9;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LOG_PREFIX: &str = "Log_";
const LOG_EXT: &str = "txt";
const EXECUTION_LABEL: &str = "Date of execution:";

static EXECUTION_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").expect("static date regex"));

/// Append-only text for one run. The first line is always the execution
/// timestamp; the next run derives its window from it.
#[derive(Debug, Clone)]
pub struct RunLog {
    executed_at: DateTime<Utc>,
    text: String,
}

impl RunLog {
    pub fn new(executed_at: DateTime<Utc>, window: &Window) -> Self {
        let text = format!(
            "{} {} UTC\nLatest Date: {} UTC\nOldest Date: {} UTC\n\n",
            EXECUTION_LABEL,
            executed_at.format(TIMESTAMP_FORMAT),
            window.latest.format(TIMESTAMP_FORMAT),
            window.oldest.format(TIMESTAMP_FORMAT),
        );
        Self { executed_at, text }
    }

    pub fn push(&mut self, section: &str) {
        self.text.push_str(section);
        if !section.ends_with('\n') {
            self.text.push('\n');
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}{}.{}",
            LOG_PREFIX,
            self.executed_at.format("%Y-%m-%d_%H.%M.%S"),
            LOG_EXT
        )
    }

    pub async fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create log dir: {}", dir.display()))?;
        let path = dir.join(self.file_name());
        fs::write(&path, &self.text)
            .await
            .with_context(|| format!("failed to write run log: {}", path.display()))?;
        info!(path = %path.display(), "run log written");
        Ok(path)
    }
}

/// Extract the execution timestamp from a log's first line.
pub fn parse_execution_line(line: &str) -> Option<DateTime<Utc>> {
    let found = EXECUTION_DATE.find(line)?;
    NaiveDateTime::parse_from_str(found.as_str(), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn is_log_file(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(LOG_PREFIX))
        .unwrap_or(false);
    name_ok && path.extension().and_then(|e| e.to_str()) == Some(LOG_EXT)
}

/// Log files oldest first, by creation time (modification time where the
/// filesystem does not record creation), then by name.
async fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read log dir: {}", dir.display()))
        }
    };

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let meta = entry.metadata().await?;
        if !meta.is_file() || !is_log_file(&path) {
            continue;
        }
        let created = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((created, path));
    }
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Timestamp recorded in the most recent log, if any log exists.
pub async fn last_execution(dir: &Path) -> Result<Option<DateTime<Utc>>> {
    let Some(latest) = log_files(dir).await?.pop() else {
        return Ok(None);
    };
    let content = fs::read_to_string(&latest)
        .await
        .with_context(|| format!("failed to read log: {}", latest.display()))?;
    let first_line = content.lines().next().unwrap_or_default();
    let parsed = parse_execution_line(first_line);
    debug!(path = %latest.display(), ?parsed, "last execution");
    Ok(parsed)
}

/// Delete all but the `keep` newest logs, oldest first. Returns the removed paths.
pub async fn prune(dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let files = log_files(dir).await?;
    let excess = files.len().saturating_sub(keep);
    let mut removed = Vec::with_capacity(excess);
    for path in files.into_iter().take(excess) {
        fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to remove log: {}", path.display()))?;
        info!(path = %path.display(), "old log removed");
        removed.push(path);
    }
    Ok(removed)
}

/// Log lines for the files removed by [`prune`].
pub fn prune_report(removed: &[PathBuf]) -> String {
    if removed.is_empty() {
        return "\nNo log removed.\n".to_string();
    }
    let mut out = String::from("\n");
    for path in removed {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        out.push_str(&format!("{} removed!\n", name));
    }
    out
}

pub fn ledger_path(dir: &Path, collection_id: &str) -> PathBuf {
    dir.join(format!("NOT_ADDED_{}.json", collection_id))
}

pub async fn write_ledger(dir: &Path, collection_id: &str, ids: &[String]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create ledger dir: {}", dir.display()))?;
    let path = ledger_path(dir, collection_id);
    let body = serde_json::to_string_pretty(ids)?;
    fs::write(&path, body)
        .await
        .with_context(|| format!("failed to write ledger: {}", path.display()))?;
    Ok(path)
}
