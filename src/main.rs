use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use tube_harvest::catalog::{ChannelDatabase, CollectionMap};
use tube_harvest::config;
use tube_harvest::notify::{self, BrowserNotifier, LogNotifier, Notifier};
use tube_harvest::run::{self, RunSettings, Targets};
use tube_harvest::youtube::YouTubeClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Collect newly published videos from a channel list into short/long playlists"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Upper bound of the window (RFC 3339); defaults to now
    #[arg(long)]
    latest: Option<DateTime<Utc>>,

    /// Lower bound of the window (RFC 3339); defaults to the last run's execution time
    #[arg(long)]
    oldest: Option<DateTime<Utc>>,

    /// Channel category to scan, overriding `run.category`
    #[arg(long)]
    category: Option<String>,

    /// Log notification links instead of opening them in a browser
    #[arg(long)]
    no_browser: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    // Everything static is read and checked before the first upstream call.
    let category = args.category.as_deref().unwrap_or(cfg.run.category.as_str());
    let channels = ChannelDatabase::load(Path::new(&cfg.files.channels))?.channels(category)?;
    let collections = CollectionMap::load(Path::new(&cfg.files.collections))?;
    let targets = Targets::resolve(&collections, &cfg.run.short_collection, &cfg.run.long_collection)?;
    let client = YouTubeClient::from_config(&cfg)?;

    let executed_at = Utc::now();
    let latest = args.latest.unwrap_or(executed_at);
    let window = run::resolve_window(latest, args.oldest, &cfg.logs_dir(), cfg.run.fallback_window_days).await?;
    if window.oldest > window.latest {
        warn!(oldest = %window.oldest, latest = %window.latest, "window is inverted; nothing will be selected");
    }

    info!(category, channels = channels.len(), "starting harvest");
    let settings = RunSettings::from_config(&cfg, window, executed_at);
    let outcome = run::execute(&client, &channels, &targets, &settings).await?;

    info!(
        log = %outcome.log_path.display(),
        pruned = outcome.pruned.len(),
        short_added = outcome.short.added(),
        long_added = outcome.long.added(),
        "harvest finished"
    );

    let notifier: Box<dyn Notifier> = if args.no_browser {
        Box::new(LogNotifier)
    } else {
        Box::new(BrowserNotifier)
    };
    notify::dispatch(notifier.as_ref(), &outcome.notifications);

    Ok(())
}
