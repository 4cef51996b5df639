use std::collections::HashSet;
use tracing::{debug, instrument, warn};

use crate::model::PlaylistEntry;
use crate::retry::{retry_transient, RetryPolicy};
use crate::youtube::{UpstreamError, VideoService};

/// Everything one listing produced. `interrupted` holds the error that
/// ended it before the last page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub items: Vec<PlaylistEntry>,
    pub interrupted: Option<UpstreamError>,
}

/// Drains every page of a collection into one ordered sequence.
pub struct Paginator<'a> {
    service: &'a dyn VideoService,
    retry: RetryPolicy,
}

impl<'a> Paginator<'a> {
    pub fn new(service: &'a dyn VideoService, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    /// Only [`UpstreamError::Fatal`] escapes. A rejection, or a transient
    /// failure that outlived the retry policy, ends the listing early; the
    /// items gathered so far come back with the error that stopped it.
    #[instrument(skip(self))]
    pub async fn drain(&self, collection_id: &str) -> Result<Listing, UpstreamError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = retry_transient(&self.retry, "list items", || {
                self.service.list_items(collection_id, token.as_deref())
            })
            .await;

            match page {
                Ok(page) => {
                    pages += 1;
                    items.extend(page.items);
                    match page.next_page_token {
                        Some(next) => token = Some(next),
                        None => break,
                    }
                }
                Err(err @ UpstreamError::Fatal(_)) => return Err(err),
                Err(err) => {
                    warn!(collection_id, gathered = items.len(), %err, "listing stopped early");
                    return Ok(Listing {
                        items,
                        interrupted: Some(err),
                    });
                }
            }
        }

        debug!(collection_id, pages, items = items.len(), "collection drained");
        Ok(Listing {
            items,
            interrupted: None,
        })
    }

    pub async fn collect(&self, collection_id: &str) -> Result<Vec<PlaylistEntry>, UpstreamError> {
        Ok(self.drain(collection_id).await?.items)
    }

    pub async fn member_ids(&self, collection_id: &str) -> Result<HashSet<String>, UpstreamError> {
        Ok(self
            .collect(collection_id)
            .await?
            .into_iter()
            .map(|entry| entry.video_id)
            .collect())
    }
}
