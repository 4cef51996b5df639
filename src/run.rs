//! End-to-end run: scan channels, classify what was selected, write both
//! target collections, then persist the log and ledgers.
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

use crate::catalog::CollectionMap;
use crate::classify::{Classification, DurationClassifier};
use crate::config::{Config, ConfigError};
use crate::model::{Channel, Window};
use crate::notify::Notification;
use crate::retry::RetryPolicy;
use crate::runlog::{self, RunLog};
use crate::scanner::{ChannelScanner, ScanPolicy, ScanReport};
use crate::writer::{CollectionWriter, WritePolicy, WriteReport};
use crate::youtube::VideoService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub collection_id: String,
}

/// Short items go to `short`, long items to `long`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    pub short: Target,
    pub long: Target,
}

impl Targets {
    pub fn resolve(map: &CollectionMap, short_name: &str, long_name: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            short: Target {
                name: short_name.to_string(),
                collection_id: map.resolve(short_name)?.to_string(),
            },
            long: Target {
                name: long_name.to_string(),
                collection_id: map.resolve(long_name)?.to_string(),
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub executed_at: DateTime<Utc>,
    pub window: Window,
    pub scan: ScanPolicy,
    pub retry: RetryPolicy,
    pub write: WritePolicy,
    pub threshold: Duration,
    pub logs_dir: PathBuf,
    pub ledger_dir: PathBuf,
    pub keep_logs: usize,
}

impl RunSettings {
    pub fn from_config(cfg: &Config, window: Window, executed_at: DateTime<Utc>) -> Self {
        Self {
            executed_at,
            window,
            scan: cfg.scan_policy(),
            retry: cfg.retry_policy(),
            write: cfg.write_policy(),
            threshold: cfg.threshold(),
            logs_dir: cfg.logs_dir(),
            ledger_dir: cfg.ledger_dir(),
            keep_logs: cfg.app.keep_logs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub scan: ScanReport,
    pub classification: Classification,
    pub short: WriteReport,
    pub long: WriteReport,
    pub log_path: PathBuf,
    pub ledgers: Vec<PathBuf>,
    pub pruned: Vec<PathBuf>,
    /// Dormant channels in scan order, then the short and long collections.
    pub notifications: Vec<Notification>,
}

/// `oldest` precedence: explicit value, then the last run's execution
/// timestamp, then `latest - fallback_days`.
pub async fn resolve_window(
    latest: DateTime<Utc>,
    oldest: Option<DateTime<Utc>>,
    logs_dir: &Path,
    fallback_days: i64,
) -> Result<Window> {
    let oldest = match oldest {
        Some(oldest) => oldest,
        None => match runlog::last_execution(logs_dir).await? {
            Some(previous) => previous,
            None => {
                info!(fallback_days, "no previous run log; using fallback window");
                latest - ChronoDuration::days(fallback_days)
            }
        },
    };
    Ok(Window::new(oldest, latest))
}

#[instrument(skip_all, fields(channels = channels.len()))]
pub async fn execute(
    service: &dyn VideoService,
    channels: &[Channel],
    targets: &Targets,
    settings: &RunSettings,
) -> Result<RunOutcome> {
    let mut log = RunLog::new(settings.executed_at, &settings.window);
    info!(
        oldest = %settings.window.oldest,
        latest = %settings.window.latest,
        "starting run"
    );

    let scan = ChannelScanner::new(service, settings.retry, &settings.scan)
        .scan(channels, &settings.window)
        .await
        .context("channel scan failed")?;
    log.push(&scan.log);

    let ids = ordered_unique_ids(&scan);
    let classification = DurationClassifier::new(service, settings.retry, settings.threshold)
        .classify(&ids)
        .await;
    log.push(&classification.summary());

    log.push("Adding videos into playlists...\n");
    let writer = CollectionWriter::new(service, settings.write);
    let mut reports = Vec::with_capacity(2);
    for (target, bucket) in [
        (&targets.short, &classification.short),
        (&targets.long, &classification.long),
    ] {
        log.push(&format!("Collection \"{}\" ({})", target.name, target.collection_id));
        let report = writer.write(&target.collection_id, bucket).await;
        log.push(&report.log);
        reports.push(report);
    }
    let long = reports.pop().unwrap_or_default();
    let short = reports.pop().unwrap_or_default();

    log.push("- ALL DONE! -");

    let mut ledgers = Vec::with_capacity(2);
    for report in [&short, &long] {
        ledgers.push(runlog::write_ledger(&settings.ledger_dir, &report.collection_id, &report.not_added()).await?);
    }

    // The new log must exist before pruning; it counts toward `keep_logs`.
    let log_path = log.write(&settings.logs_dir).await?;
    let pruned = runlog::prune(&settings.logs_dir, settings.keep_logs).await?;
    log.push(&runlog::prune_report(&pruned));
    log.write(&settings.logs_dir).await?;

    let mut notifications = scan.notifications.clone();
    for target in [&targets.short, &targets.long] {
        notifications.push(Notification::Collection {
            name: target.name.clone(),
            collection_id: target.collection_id.clone(),
        });
    }

    info!(
        short_added = short.added(),
        long_added = long.added(),
        not_added = short.not_added().len() + long.not_added().len(),
        "run complete"
    );

    Ok(RunOutcome {
        scan,
        classification,
        short,
        long,
        log_path,
        ledgers,
        pruned,
        notifications,
    })
}

/// Aggregate ids oldest-first by publish time, first occurrence kept.
fn ordered_unique_ids(scan: &ScanReport) -> Vec<String> {
    let mut items = scan.aggregate.clone();
    items.sort_by_key(|item| item.published_at);
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .map(|item| item.id)
        .collect()
}
