//! Time-window selection over a channel's candidate items.
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::model::{PlaylistEntry, SelectedItem, Window};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// In-window items, source order preserved.
    pub selected: Vec<SelectedItem>,
    /// Items published in `[latest - 365 days, latest]`.
    pub trailing_year: usize,
    /// Candidates whose timestamp was missing or unparseable.
    pub skipped: usize,
}

/// Parse an upstream RFC 3339 timestamp (`Z` or explicit offset) into UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

pub fn select(items: &[PlaylistEntry], window: &Window) -> Selection {
    let year = window.trailing_year();
    let mut selection = Selection::default();

    for item in items {
        let Some(published_at) = item.published_at.as_deref().and_then(parse_timestamp) else {
            warn!(
                video_id = %item.video_id,
                raw = item.published_at.as_deref().unwrap_or("<missing>"),
                "skipping candidate with unusable publish timestamp"
            );
            selection.skipped += 1;
            continue;
        };

        if window.contains(published_at) {
            selection.selected.push(SelectedItem {
                id: item.video_id.clone(),
                published_at,
            });
        }
        if year.contains(published_at) {
            selection.trailing_year += 1;
        }
    }

    selection
}
