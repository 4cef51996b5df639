//! Paced, retrying, verified insertion of items into a target collection.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::model::watch_url;
use crate::paginator::Paginator;
use crate::retry::{retry_transient, RetryPolicy};
use crate::youtube::{UpstreamError, VideoService};

/// What to do after an insert call reports success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyPolicy {
    /// Trust the insert response.
    Off,
    /// Re-list the collection; ledger the item if it is not there.
    #[default]
    Record,
    /// Like `Record`, but insert once more before giving up on the item.
    RetryOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    pub pacing_base: Duration,
    pub pacing_step: Duration,
    pub retry: RetryPolicy,
    pub verify: VerifyPolicy,
    pub per_item_cost: u64,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            pacing_base: Duration::from_secs(1),
            pacing_step: Duration::from_millis(100),
            retry: RetryPolicy::default(),
            verify: VerifyPolicy::default(),
            per_item_cost: 50,
        }
    }
}

impl WritePolicy {
    /// Delay before the insert at 0-based `position`.
    pub fn pacing(&self, position: usize) -> Duration {
        let steps = u32::try_from(position).unwrap_or(u32::MAX);
        self.pacing_base + self.pacing_step.saturating_mul(steps)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    /// Already in the collection before this insert (or earlier in the same
    /// input); no call was made.
    AlreadyPresent,
    Rejected(String),
    /// Insert succeeded but the item did not show up when re-listing.
    Unverified,
    /// Transient failures outlasted the retry policy.
    GaveUp(String),
}

impl InsertOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            InsertOutcome::Rejected(_) | InsertOutcome::Unverified | InsertOutcome::GaveUp(_)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub collection_id: String,
    pub outcomes: Vec<(String, InsertOutcome)>,
    pub log: String,
}

impl WriteReport {
    /// Ids that did not make it into the collection, input order, no repeats.
    pub fn not_added(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .filter(|(id, _)| seen.insert(id.clone()))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn added(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == InsertOutcome::Added)
            .count()
    }
}

pub struct CollectionWriter<'a> {
    service: &'a dyn VideoService,
    policy: WritePolicy,
}

impl<'a> CollectionWriter<'a> {
    pub fn new(service: &'a dyn VideoService, policy: WritePolicy) -> Self {
        Self { service, policy }
    }

    /// Inserts `ids` in order. Every failure is recorded in the report and
    /// none aborts the batch. When the current members cannot be read, the
    /// collection is written as if it were empty.
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    pub async fn write(&self, collection_id: &str, ids: &[String]) -> WriteReport {
        let mut report = WriteReport {
            collection_id: collection_id.to_string(),
            ..Default::default()
        };

        if ids.is_empty() {
            report.log.push_str("No video in this list.\n");
            return report;
        }

        let estimated = (ids.len() as u64).saturating_mul(self.policy.per_item_cost);
        let _ = writeln!(report.log, "Estimated cost: {}\n", estimated);
        info!(collection_id, items = ids.len(), estimated, "writing collection");

        let paginator = Paginator::new(self.service, self.policy.retry);
        let mut present = match paginator.member_ids(collection_id).await {
            Ok(members) => members,
            Err(err) => {
                warn!(collection_id, %err, "could not read current members; duplicates are not skipped");
                let _ = writeln!(report.log, "Could not read the current content: {}\n", err);
                HashSet::new()
            }
        };

        for (position, id) in ids.iter().enumerate() {
            if present.contains(id) {
                info!(collection_id, video_id = %id, "already in collection; skipping");
                let _ = writeln!(report.log, "{:02}. Already present: {}", position + 1, watch_url(id));
                report.outcomes.push((id.clone(), InsertOutcome::AlreadyPresent));
                continue;
            }

            let delay = self.policy.pacing(position);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            info!(position = position + 1, video_id = %id, "adding item");
            let outcome = self.insert_verified(&paginator, collection_id, id).await;
            match &outcome {
                InsertOutcome::Added => {
                    present.insert(id.clone());
                    let _ = writeln!(report.log, "{:02}. Added: {}", position + 1, watch_url(id));
                }
                InsertOutcome::Rejected(msg) | InsertOutcome::GaveUp(msg) => {
                    warn!(video_id = %id, error = %msg, "item not added");
                    let _ = writeln!(
                        report.log,
                        "Problem encountered with this video: {} ({})",
                        watch_url(id),
                        msg
                    );
                }
                InsertOutcome::Unverified => {
                    warn!(video_id = %id, "item missing from collection after insert");
                    let _ = writeln!(report.log, "Not found after insertion: {}", watch_url(id));
                }
                InsertOutcome::AlreadyPresent => {}
            }
            report.outcomes.push((id.clone(), outcome));
        }

        let failed = report.not_added().len();
        let _ = writeln!(
            report.log,
            "\nAdded: {} / {} (not added: {})",
            report.added(),
            ids.len(),
            failed
        );
        report
    }

    async fn insert_verified(&self, paginator: &Paginator<'_>, collection_id: &str, id: &str) -> InsertOutcome {
        let attempts = match self.policy.verify {
            VerifyPolicy::RetryOnce => 2,
            VerifyPolicy::Off | VerifyPolicy::Record => 1,
        };

        for _ in 0..attempts {
            if let Err(err) = retry_transient(&self.policy.retry, "insert item", || {
                self.service.insert_item(collection_id, id)
            })
            .await
            {
                return match err {
                    UpstreamError::Transient(msg) => InsertOutcome::GaveUp(msg),
                    other => InsertOutcome::Rejected(other.to_string()),
                };
            }

            if self.policy.verify == VerifyPolicy::Off {
                return InsertOutcome::Added;
            }
            match paginator.member_ids(collection_id).await {
                Ok(members) if members.contains(id) => return InsertOutcome::Added,
                Ok(_) => {}
                Err(err) => warn!(collection_id, %err, "verification listing failed"),
            }
        }
        InsertOutcome::Unverified
    }
}
