//! Upstream video service: the capability trait the pipeline consumes and a
//! YouTube Data API v3 implementation of it.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, ACCESS_TOKEN_ENV};
use crate::model::PlaylistEntry;
use crate::youtube::model::{ChannelListResp, ErrorEnvelope, PlaylistItemListResp, VideoListResp};

pub mod model;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";

/// Upstream ceiling for ids per metadata call and items per listing page.
pub const MAX_BATCH: usize = 50;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("transient connection failure: {0}")]
    Transient(String),
    #[error("rejected by upstream ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected upstream response: {0}")]
    Fatal(String),
}

impl UpstreamError {
    pub fn is_transient(&self) -> bool {
        matches!(self, UpstreamError::Transient(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDetails {
    pub title: String,
    pub uploads_collection: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPage {
    pub items: Vec<PlaylistEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub id: String,
    /// ISO-8601 duration text, e.g. `PT4M13S`.
    pub duration: String,
}

#[async_trait]
pub trait VideoService: Send + Sync {
    async fn channel_details(&self, channel_id: &str) -> Result<ChannelDetails, UpstreamError>;

    async fn list_items(
        &self,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> Result<ItemPage, UpstreamError>;

    /// At most [`MAX_BATCH`] ids per call.
    async fn video_metadata(&self, ids: &[String]) -> Result<Vec<VideoMetadata>, UpstreamError>;

    async fn insert_item(&self, collection_id: &str, item_id: &str) -> Result<(), UpstreamError>;
}

#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    base_url: Url,
    access_token: String,
}

impl fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YouTubeClient {
    pub fn new(access_token: String) -> Result<Self> {
        let base_url = Url::parse(YOUTUBE_API_BASE).context("invalid default YouTube URL")?;
        Self::with_base_url(access_token, base_url)
    }

    pub fn with_base_url(access_token: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("tube-harvest/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            http,
            base_url,
            access_token,
        })
    }

    /// Client for the configured token and, when set, `youtube.base_url`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let token = cfg
            .access_token()
            .ok_or_else(|| anyhow!("no access token: set youtube.access_token or {}", ACCESS_TOKEN_ENV))?;
        match cfg.youtube.base_url.as_deref() {
            Some(base) => {
                let base = Url::parse(base).with_context(|| format!("invalid youtube.base_url: {}", base))?;
                Self::with_base_url(token, base)
            }
            None => Self::new(token),
        }
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> Result<reqwest::RequestBuilder> {
        let mut url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid YouTube endpoint: {}", path))?;
        url.query_pairs_mut().extend_pairs(query.iter().copied());
        Ok(self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Accept", "application/json"))
    }

    pub fn build_channel_request(&self, channel_id: &str) -> Result<reqwest::Request> {
        self.request(
            Method::GET,
            "channels",
            &[("part", "snippet,contentDetails"), ("id", channel_id)],
        )?
        .build()
        .context("failed to build channels request")
    }

    pub fn build_list_items_request(
        &self,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> Result<reqwest::Request> {
        let max = MAX_BATCH.to_string();
        let mut query = vec![
            ("part", "snippet,contentDetails"),
            ("playlistId", collection_id),
            ("maxResults", max.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.request(Method::GET, "playlistItems", &query)?
            .build()
            .context("failed to build playlistItems request")
    }

    pub fn build_metadata_request(&self, ids: &[String]) -> Result<reqwest::Request> {
        let joined = ids.join(",");
        let max = MAX_BATCH.to_string();
        self.request(
            Method::GET,
            "videos",
            &[
                ("part", "contentDetails"),
                ("id", joined.as_str()),
                ("maxResults", max.as_str()),
            ],
        )?
        .build()
        .context("failed to build videos request")
    }

    pub fn build_insert_request(&self, collection_id: &str, item_id: &str) -> Result<reqwest::Request> {
        self.request(Method::POST, "playlistItems", &[("part", "snippet")])?
            .json(&insert_body(collection_id, item_id))
            .build()
            .context("failed to build playlistItems insert request")
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: Result<reqwest::Request>,
    ) -> Result<T, UpstreamError> {
        let request = request.map_err(|err| UpstreamError::Fatal(format!("{:#}", err)))?;
        debug!(method = %request.method(), url = %request.url(), "youtube request");

        let res = self.http.execute(request).await.map_err(transport_error)?;
        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by YouTube: {}", body);
        }
        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|err| UpstreamError::Fatal(format!("invalid YouTube response JSON: {}", err)))
    }
}

#[async_trait]
impl VideoService for YouTubeClient {
    async fn channel_details(&self, channel_id: &str) -> Result<ChannelDetails, UpstreamError> {
        let resp: ChannelListResp = self.execute(self.build_channel_request(channel_id)).await?;
        let channel = resp
            .items
            .into_iter()
            .find(|c| c.id == channel_id)
            .ok_or_else(|| UpstreamError::Rejected {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("channel {} not found", channel_id),
            })?;
        let uploads = channel
            .content_details
            .map(|d| d.related_playlists.uploads)
            .ok_or_else(|| UpstreamError::Fatal(format!("channel {} has no uploads playlist", channel_id)))?;
        Ok(ChannelDetails {
            title: channel.snippet.map(|s| s.title).unwrap_or_default(),
            uploads_collection: uploads,
        })
    }

    async fn list_items(
        &self,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> Result<ItemPage, UpstreamError> {
        let resp: PlaylistItemListResp = self
            .execute(self.build_list_items_request(collection_id, page_token))
            .await?;
        let items = resp
            .items
            .into_iter()
            .map(|item| PlaylistEntry {
                video_id: item.content_details.video_id,
                published_at: item.content_details.video_published_at,
                channel_title: item.snippet.and_then(|s| s.channel_title),
            })
            .collect();
        Ok(ItemPage {
            items,
            next_page_token: resp.next_page_token,
        })
    }

    async fn video_metadata(&self, ids: &[String]) -> Result<Vec<VideoMetadata>, UpstreamError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let resp: VideoListResp = self.execute(self.build_metadata_request(ids)).await?;
        Ok(resp
            .items
            .into_iter()
            .map(|v| VideoMetadata {
                id: v.id,
                duration: v.content_details.duration,
            })
            .collect())
    }

    async fn insert_item(&self, collection_id: &str, item_id: &str) -> Result<(), UpstreamError> {
        let _: Value = self
            .execute(self.build_insert_request(collection_id, item_id))
            .await?;
        Ok(())
    }
}

pub fn insert_body(collection_id: &str, item_id: &str) -> Value {
    json!({
        "snippet": {
            "playlistId": collection_id,
            "resourceId": {
                "kind": "youtube#video",
                "videoId": item_id,
            }
        }
    })
}

fn transport_error(err: reqwest::Error) -> UpstreamError {
    if err.is_decode() || err.is_builder() {
        UpstreamError::Fatal(err.to_string())
    } else {
        UpstreamError::Transient(err.to_string())
    }
}

fn rejection(status: StatusCode, body: &str) -> UpstreamError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => match env.error.errors.first() {
            Some(detail) if !detail.reason.is_empty() => {
                format!("{}: {}", detail.reason, env.error.message)
            }
            _ => env.error.message,
        },
        Err(_) => body.to_string(),
    };
    UpstreamError::Rejected {
        status: status.as_u16(),
        message,
    }
}
