use tracing::{info, warn};

use crate::model::{channel_url, playlist_url};

/// Outward-facing events produced by a run. The pipeline only collects
/// them; a [`Notifier`] decides what to do with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    DormantChannel { channel_id: String, channel_name: String },
    Collection { name: String, collection_id: String },
}

impl Notification {
    pub fn url(&self) -> String {
        match self {
            Notification::DormantChannel { channel_id, .. } => channel_url(channel_id),
            Notification::Collection { collection_id, .. } => playlist_url(collection_id),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Notification);
}

/// Opens each event's link in the system browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserNotifier;

impl Notifier for BrowserNotifier {
    fn notify(&self, event: &Notification) {
        let url = event.url();
        if let Err(err) = webbrowser::open(&url) {
            warn!(%url, ?err, "failed to open browser");
        }
    }
}

/// Logs events instead of opening anything (`--no-browser`).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Notification) {
        match event {
            Notification::DormantChannel { channel_name, .. } => {
                info!(channel = %channel_name, url = %event.url(), "dormant channel")
            }
            Notification::Collection { name, .. } => {
                info!(collection = %name, url = %event.url(), "collection updated")
            }
        }
    }
}

pub fn dispatch(notifier: &dyn Notifier, events: &[Notification]) {
    for event in events {
        notifier.notify(event);
    }
}
