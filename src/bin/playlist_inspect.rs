use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use tube_harvest::config;
use tube_harvest::paginator::Paginator;
use tube_harvest::window::parse_timestamp;
use tube_harvest::youtube::YouTubeClient;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print every item of a playlist, oldest page first")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Playlist ID to inspect
    #[arg(long)]
    playlist: String,
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
    let client = YouTubeClient::from_config(&cfg)?;

    let items = Paginator::new(&client, cfg.retry_policy())
        .collect(&args.playlist)
        .await?;
    println!("Playlist ID: {}", args.playlist);
    println!("Items: {}", items.len());
    for (idx, item) in items.iter().enumerate() {
        let published = item
            .published_at
            .as_deref()
            .and_then(parse_timestamp)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "<unknown>".into());
        println!(
            "  {:>4}. {} {} ({})",
            idx + 1,
            item.video_id,
            published,
            item.channel_title.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
