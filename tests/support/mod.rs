#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use tube_harvest::model::PlaylistEntry;
use tube_harvest::retry::RetryPolicy;
use tube_harvest::writer::{VerifyPolicy, WritePolicy};
use tube_harvest::youtube::{ChannelDetails, ItemPage, UpstreamError, VideoMetadata, VideoService};

/// In-memory upstream that records every call. Inserted items become
/// visible to later listings unless the id is marked as swallowed.
pub struct FakeTube {
    page_size: usize,
    channels: Mutex<HashMap<String, ChannelDetails>>,
    playlists: Mutex<HashMap<String, Vec<PlaylistEntry>>>,
    durations: Mutex<HashMap<String, String>>,
    list_failures: Mutex<HashMap<String, VecDeque<Option<UpstreamError>>>>,
    metadata_failures: Mutex<VecDeque<UpstreamError>>,
    insert_script: Mutex<VecDeque<Result<(), UpstreamError>>>,
    swallowed: Mutex<HashSet<String>>,
    pub list_calls: Mutex<Vec<(String, Option<String>)>>,
    pub metadata_calls: Mutex<Vec<Vec<String>>>,
    pub insert_calls: Mutex<Vec<(String, String)>>,
}

impl Default for FakeTube {
    fn default() -> Self {
        Self {
            page_size: 50,
            channels: Mutex::default(),
            playlists: Mutex::default(),
            durations: Mutex::default(),
            list_failures: Mutex::default(),
            metadata_failures: Mutex::default(),
            insert_script: Mutex::default(),
            swallowed: Mutex::default(),
            list_calls: Mutex::default(),
            metadata_calls: Mutex::default(),
            insert_calls: Mutex::default(),
        }
    }
}

impl FakeTube {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    pub fn channel(mut self, id: &str, title: &str, entries: Vec<PlaylistEntry>) -> Self {
        let uploads = uploads_of(id);
        self.channels.get_mut().unwrap().insert(
            id.to_string(),
            ChannelDetails {
                title: title.to_string(),
                uploads_collection: uploads.clone(),
            },
        );
        self.playlists.get_mut().unwrap().insert(uploads, entries);
        self
    }

    pub fn playlist(mut self, id: &str, video_ids: &[&str]) -> Self {
        let entries = video_ids.iter().map(|v| plain_entry(v)).collect();
        self.playlists.get_mut().unwrap().insert(id.to_string(), entries);
        self
    }

    pub fn duration(mut self, video_id: &str, iso: &str) -> Self {
        self.durations
            .get_mut()
            .unwrap()
            .insert(video_id.to_string(), iso.to_string());
        self
    }

    pub fn fail_list(self, collection: &str, errors: Vec<UpstreamError>) -> Self {
        self.list_script(collection, errors.into_iter().map(Some).collect())
    }

    /// Per-call script for one collection: `None` serves the page normally.
    pub fn list_script(mut self, collection: &str, script: Vec<Option<UpstreamError>>) -> Self {
        self.list_failures
            .get_mut()
            .unwrap()
            .insert(collection.to_string(), VecDeque::from(script));
        self
    }

    pub fn fail_metadata(mut self, errors: Vec<UpstreamError>) -> Self {
        *self.metadata_failures.get_mut().unwrap() = VecDeque::from(errors);
        self
    }

    pub fn insert_responses(mut self, responses: Vec<Result<(), UpstreamError>>) -> Self {
        *self.insert_script.get_mut().unwrap() = VecDeque::from(responses);
        self
    }

    pub fn swallow(mut self, video_id: &str) -> Self {
        self.swallowed.get_mut().unwrap().insert(video_id.to_string());
        self
    }

    pub fn members(&self, collection: &str) -> Vec<String> {
        self.playlists
            .lock()
            .unwrap()
            .get(collection)
            .map(|items| items.iter().map(|e| e.video_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn insert_calls(&self) -> Vec<(String, String)> {
        self.insert_calls.lock().unwrap().clone()
    }

    pub fn metadata_batch_sizes(&self) -> Vec<usize> {
        self.metadata_calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoService for FakeTube {
    async fn channel_details(&self, channel_id: &str) -> Result<ChannelDetails, UpstreamError> {
        self.channels
            .lock()
            .unwrap()
            .get(channel_id)
            .cloned()
            .ok_or_else(|| UpstreamError::Rejected {
                status: 404,
                message: format!("channel {} not found", channel_id),
            })
    }

    async fn list_items(
        &self,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> Result<ItemPage, UpstreamError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((collection_id.to_string(), page_token.map(str::to_string)));

        if let Some(err) = self
            .list_failures
            .lock()
            .unwrap()
            .get_mut(collection_id)
            .and_then(VecDeque::pop_front)
            .flatten()
        {
            return Err(err);
        }

        let playlists = self.playlists.lock().unwrap();
        let all = playlists.get(collection_id).cloned().unwrap_or_default();
        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(all.len());
        let items = all.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_page_token = (end < all.len()).then(|| end.to_string());
        Ok(ItemPage {
            items,
            next_page_token,
        })
    }

    async fn video_metadata(&self, ids: &[String]) -> Result<Vec<VideoMetadata>, UpstreamError> {
        self.metadata_calls.lock().unwrap().push(ids.to_vec());
        if let Some(err) = self.metadata_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let durations = self.durations.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                durations.get(id).map(|d| VideoMetadata {
                    id: id.clone(),
                    duration: d.clone(),
                })
            })
            .collect())
    }

    async fn insert_item(&self, collection_id: &str, item_id: &str) -> Result<(), UpstreamError> {
        self.insert_calls
            .lock()
            .unwrap()
            .push((collection_id.to_string(), item_id.to_string()));
        if let Some(Err(err)) = self.insert_script.lock().unwrap().pop_front() {
            return Err(err);
        }
        if self.swallowed.lock().unwrap().contains(item_id) {
            return Ok(());
        }
        self.playlists
            .lock()
            .unwrap()
            .entry(collection_id.to_string())
            .or_default()
            .push(plain_entry(item_id));
        Ok(())
    }
}

pub fn uploads_of(channel_id: &str) -> String {
    format!("UU-{}", channel_id)
}

pub fn latest() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn entry(video_id: &str, published_at: DateTime<Utc>, channel: &str) -> PlaylistEntry {
    PlaylistEntry {
        video_id: video_id.to_string(),
        published_at: Some(published_at.to_rfc3339()),
        channel_title: Some(channel.to_string()),
    }
}

pub fn plain_entry(video_id: &str) -> PlaylistEntry {
    PlaylistEntry {
        video_id: video_id.to_string(),
        published_at: Some("2024-01-01T00:00:00Z".to_string()),
        channel_title: None,
    }
}

pub fn ids(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{:03}", prefix, i)).collect()
}

pub fn quick_retry() -> RetryPolicy {
    RetryPolicy::immediate(Some(5))
}

pub fn quick_write(verify: VerifyPolicy) -> WritePolicy {
    WritePolicy {
        pacing_base: std::time::Duration::ZERO,
        pacing_step: std::time::Duration::ZERO,
        retry: quick_retry(),
        verify,
        per_item_cost: 50,
    }
}

pub fn transient() -> UpstreamError {
    UpstreamError::Transient("connection reset by peer".into())
}

pub fn rejected(message: &str) -> UpstreamError {
    UpstreamError::Rejected {
        status: 403,
        message: message.to_string(),
    }
}
