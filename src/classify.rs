//! Duration classification of selected items into short/long buckets.
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::duration::parse_iso8601;
use crate::model::{watch_url, DurationRecord};
use crate::retry::{retry_transient, RetryPolicy};
use crate::youtube::{VideoService, MAX_BATCH};

pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub short: Vec<String>,
    pub long: Vec<String>,
    /// Requested ids the metadata call did not return (deleted, private, or
    /// the whole batch failed).
    pub missing: Vec<String>,
    /// Ids whose duration text could not be parsed.
    pub unparseable: Vec<String>,
    pub batch_calls: usize,
}

impl Classification {
    pub fn summary(&self) -> String {
        let mut out = String::from("- END OF THE RETRIEVING PROCESS -\n\n");
        let _ = writeln!(out, "Number of short videos: {}", self.short.len());
        for id in &self.short {
            let _ = writeln!(out, "  {}", watch_url(id));
        }
        let _ = writeln!(out, "\nNumber of long videos: {}", self.long.len());
        for id in &self.long {
            let _ = writeln!(out, "  {}", watch_url(id));
        }
        if !self.missing.is_empty() || !self.unparseable.is_empty() {
            let _ = writeln!(
                out,
                "\nNot classified: {} missing, {} unparseable duration",
                self.missing.len(),
                self.unparseable.len()
            );
        }
        out
    }
}

pub struct DurationClassifier<'a> {
    service: &'a dyn VideoService,
    retry: RetryPolicy,
    threshold: Duration,
    batch_size: usize,
}

impl<'a> DurationClassifier<'a> {
    pub fn new(service: &'a dyn VideoService, retry: RetryPolicy, threshold: Duration) -> Self {
        Self {
            service,
            retry,
            threshold,
            batch_size: MAX_BATCH,
        }
    }

    /// Clamped to the upstream ceiling.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH);
        self
    }

    /// `duration <= threshold` is short, anything longer is long. Output
    /// buckets keep the input order. A failed batch leaves its ids missing.
    #[instrument(skip_all, fields(ids = ids.len()))]
    pub async fn classify(&self, ids: &[String]) -> Classification {
        let mut out = Classification::default();
        let mut durations: HashMap<String, Duration> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(self.batch_size) {
            out.batch_calls += 1;
            let fetched = retry_transient(&self.retry, "video metadata", || {
                self.service.video_metadata(chunk)
            })
            .await;

            let metadata = match fetched {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(batch = chunk.len(), %err, "metadata batch failed; ids left unclassified");
                    Vec::new()
                }
            };

            for meta in metadata {
                match parse_iso8601(&meta.duration) {
                    Ok(duration) => {
                        durations.insert(meta.id, duration);
                    }
                    Err(err) => {
                        warn!(video_id = %meta.id, %err, "skipping item with unparseable duration");
                        out.unparseable.push(meta.id);
                    }
                }
            }
        }

        for record in ids.iter().filter_map(|id| {
            durations.get(id).map(|d| DurationRecord {
                id: id.clone(),
                duration: *d,
            })
        }) {
            if record.duration <= self.threshold {
                out.short.push(record.id);
            } else {
                out.long.push(record.id);
            }
        }

        out.missing = ids
            .iter()
            .filter(|id| !durations.contains_key(*id) && !out.unparseable.contains(*id))
            .cloned()
            .collect();
        if !out.missing.is_empty() {
            warn!(missing = out.missing.len(), "ids absent from metadata responses");
        }

        info!(
            short = out.short.len(),
            long = out.long.len(),
            missing = out.missing.len(),
            calls = out.batch_calls,
            "classification done"
        );
        out
    }
}
