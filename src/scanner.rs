//! Channel scanning: selection per channel plus admission and dormancy rules.
use std::collections::HashSet;
use std::fmt::Write as _;
use tracing::{info, instrument, warn};

use crate::model::{Channel, ChannelStatus, IgnoreCause, SelectedItem, Window};
use crate::notify::Notification;
use crate::paginator::{Listing, Paginator};
use crate::retry::{retry_transient, RetryPolicy};
use crate::window::{self, Selection};
use crate::youtube::{UpstreamError, VideoService};

const SEPARATOR_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    pub ignored: HashSet<String>,
    /// Inactive channels that should not produce a dormancy notification.
    pub exceptions: HashSet<String>,
    /// Cost units charged per inserted item.
    pub per_item_cost: u64,
    pub channel_cost_cap: u64,
    pub run_cost_warning: u64,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            ignored: HashSet::new(),
            exceptions: HashSet::new(),
            per_item_cost: 50,
            channel_cost_cap: 2000,
            run_cost_warning: 8000,
        }
    }
}

impl ScanPolicy {
    pub fn cost_of(&self, items: usize) -> u64 {
        (items as u64).saturating_mul(self.per_item_cost)
    }

    /// `complete` is false when the channel lookup or its listing stopped
    /// early; a channel with no activity seen is then unavailable, not dormant.
    fn admit(&self, channel_id: &str, selection: &Selection, complete: bool) -> ChannelStatus {
        if self.ignored.contains(channel_id) {
            ChannelStatus::Ignored(IgnoreCause::Listed)
        } else if self.cost_of(selection.selected.len()) > self.channel_cost_cap {
            ChannelStatus::Ignored(IgnoreCause::TooExpensive)
        } else if selection.trailing_year > 0 {
            ChannelStatus::Active
        } else if !complete {
            ChannelStatus::Ignored(IgnoreCause::Unavailable)
        } else {
            ChannelStatus::Inactive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub channel_id: String,
    pub channel_name: String,
    pub status: ChannelStatus,
    pub selected: usize,
    pub trailing_year: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub aggregate: Vec<SelectedItem>,
    pub channels: Vec<ChannelReport>,
    pub notifications: Vec<Notification>,
    pub cost_warning: bool,
    pub log: String,
}

impl ScanReport {
    pub fn with_status(&self, status: ChannelStatus) -> impl Iterator<Item = &ChannelReport> {
        self.channels.iter().filter(move |c| c.status == status)
    }

    pub fn ignored(&self) -> impl Iterator<Item = &ChannelReport> {
        self.channels
            .iter()
            .filter(|c| matches!(c.status, ChannelStatus::Ignored(_)))
    }
}

pub struct ChannelScanner<'a> {
    service: &'a dyn VideoService,
    retry: RetryPolicy,
    policy: &'a ScanPolicy,
}

impl<'a> ChannelScanner<'a> {
    pub fn new(service: &'a dyn VideoService, retry: RetryPolicy, policy: &'a ScanPolicy) -> Self {
        Self {
            service,
            retry,
            policy,
        }
    }

    /// Channels are processed one at a time in configuration order; the
    /// upstream quota is shared, so there is no fan-out.
    #[instrument(skip_all, fields(channels = channels.len()))]
    pub async fn scan(&self, channels: &[Channel], window: &Window) -> Result<ScanReport, UpstreamError> {
        let paginator = Paginator::new(self.service, self.retry);
        let mut report = ScanReport::default();
        let total = channels.len();

        for (idx, channel) in channels.iter().enumerate() {
            let position = idx + 1;
            let percent = position as f64 * 100.0 / total as f64;
            info!(channel = %channel.id, position, total, percent = %format!("{:.2}", percent), "scanning channel");

            let (title, listing) = match retry_transient(&self.retry, "channel details", || {
                self.service.channel_details(&channel.id)
            })
            .await
            {
                Ok(details) => (
                    Some(details.title),
                    paginator.drain(&details.uploads_collection).await?,
                ),
                Err(err @ UpstreamError::Fatal(_)) => return Err(err),
                Err(err) => {
                    warn!(channel = %channel.id, %err, "channel lookup failed");
                    (
                        None,
                        Listing {
                            items: Vec::new(),
                            interrupted: Some(err),
                        },
                    )
                }
            };
            let complete = listing.interrupted.is_none();
            let candidates = listing.items;

            let channel_name = candidates
                .iter()
                .find_map(|c| c.channel_title.clone())
                .or(title)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| channel.id.clone());

            let selection = window::select(&candidates, window);
            let status = self.policy.admit(&channel.id, &selection, complete);

            match status {
                ChannelStatus::Active => report.aggregate.extend(selection.selected.iter().cloned()),
                ChannelStatus::Inactive if !self.policy.exceptions.contains(&channel.id) => {
                    report.notifications.push(Notification::DormantChannel {
                        channel_id: channel.id.clone(),
                        channel_name: channel_name.clone(),
                    });
                }
                ChannelStatus::Inactive | ChannelStatus::Ignored(_) => {}
            }

            let entry = ChannelReport {
                channel_id: channel.id.clone(),
                channel_name,
                status,
                selected: selection.selected.len(),
                trailing_year: selection.trailing_year,
                skipped: selection.skipped,
            };
            info!(
                channel = %entry.channel_name,
                status = %entry.status,
                selected = entry.selected,
                trailing_year = entry.trailing_year,
                "channel scanned"
            );
            write_channel_block(&mut report.log, position, total, percent, &entry, report.aggregate.len());
            report.channels.push(entry);
        }

        let ignored_lines: Vec<String> = report
            .ignored()
            .map(|ignored| {
                let cause = match ignored.status {
                    ChannelStatus::Ignored(cause) => cause.as_str(),
                    _ => "",
                };
                format!(
                    "Channel \"{}\" ({}) ignored - Cause: {} - N_Videos: {}\n",
                    ignored.channel_name, ignored.channel_id, cause, ignored.selected
                )
            })
            .collect();
        for line in ignored_lines {
            report.log.push_str(&line);
        }

        let projected = self.policy.cost_of(report.aggregate.len());
        if projected > self.policy.run_cost_warning {
            warn!(projected, threshold = self.policy.run_cost_warning, "projected cost over budget");
            report.cost_warning = true;
            let _ = writeln!(
                report.log,
                "\nWarning! API cost could be higher than {} (estimated {}).",
                self.policy.run_cost_warning, projected
            );
        }

        Ok(report)
    }
}

fn write_channel_block(
    log: &mut String,
    position: usize,
    total: usize,
    percent: f64,
    entry: &ChannelReport,
    running_total: usize,
) {
    let _ = writeln!(log, "Channel {} out of {} ({:.2} %).\n", position, total, percent);
    let _ = writeln!(log, "Channel ID: {}", entry.channel_id);
    let _ = writeln!(log, "Channel Name: {}\n", entry.channel_name);
    let _ = writeln!(log, "Number of selected videos: {}", entry.selected);
    let _ = writeln!(log, "Number of videos uploaded in a year: {}", entry.trailing_year);
    let _ = writeln!(log, "STATUS: {}", entry.status);
    let _ = writeln!(log, "\nTotal number of videos selected so far: {}", running_total);
    let _ = writeln!(log, "{}\n", "/".repeat(SEPARATOR_WIDTH));
}
