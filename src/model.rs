use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub category: String,
}

/// One entry of a collection as returned by the upstream listing call.
/// `published_at` is kept as raw text; the window selector parses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub video_id: String,
    pub published_at: Option<String>,
    pub channel_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedItem {
    pub id: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationRecord {
    pub id: String,
    pub duration: std::time::Duration,
}

/// Inclusive `[oldest, latest]` selection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub oldest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl Window {
    pub fn new(oldest: DateTime<Utc>, latest: DateTime<Utc>) -> Self {
        Self { oldest, latest }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.oldest <= t && t <= self.latest
    }

    /// `[latest - 365 days, latest]`, evaluated independently of `oldest`.
    pub fn trailing_year(&self) -> Window {
        Window {
            oldest: self.latest - Duration::days(365),
            latest: self.latest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreCause {
    Listed,
    TooExpensive,
    /// Lookup or listing failed, so dormancy cannot be judged.
    Unavailable,
}

impl IgnoreCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreCause::Listed => "In ignored set.",
            IgnoreCause::TooExpensive => "Too many videos selected",
            IgnoreCause::Unavailable => "Channel unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    Active,
    Inactive,
    Ignored(IgnoreCause),
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Active => "ACTIVE",
            ChannelStatus::Inactive => "INACTIVE",
            ChannelStatus::Ignored(_) => "IGNORED",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

pub fn channel_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/channel/{}", channel_id)
}

pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", playlist_id)
}
