//! Feed resource collaborator.
//!
//! A camera feed is an opaque, continuously-updating image resource; the
//! only things we can observe about it are "a frame arrived" and "the
//! fetch failed". [`FrameSource`] is that observation seam, and
//! [`HttpFrameSource`] is its production implementation: a polling HTTP
//! fetcher that cache-busts every request so an intermediary can never
//! replay a stale failure.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

// ── FeedEvent ───────────────────────────────────────────────────────

/// One observable fact about a bound feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    /// A frame was fetched successfully.
    Frame,
    /// The fetch failed — connection refused, HTTP error, truncated body.
    Faulted,
}

// ── FrameSource ─────────────────────────────────────────────────────

/// Attaches a background fetcher to a feed URL.
///
/// Implementations must stop promptly when `cancel` fires and must stop
/// on their own when the event receiver is dropped — after either, no
/// further events may be delivered.
pub trait FrameSource: Send + Sync {
    fn attach(&self, url: &Url, events: mpsc::Sender<FeedEvent>, cancel: CancellationToken);
}

// ── HttpFrameSource ─────────────────────────────────────────────────

/// Polls a feed URL over HTTP, reporting one [`FeedEvent`] per request.
pub struct HttpFrameSource {
    client: reqwest::Client,
    poll_interval: Duration,
}

impl HttpFrameSource {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            poll_interval,
        }
    }
}

impl Default for HttpFrameSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

impl FrameSource for HttpFrameSource {
    fn attach(&self, url: &Url, events: mpsc::Sender<FeedEvent>, cancel: CancellationToken) {
        let client = self.client.clone();
        let url = url.clone();
        let interval = self.poll_interval;

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = fetch_once(&client, &url) => event,
                };

                // Receiver dropped means the session tore down.
                if events.send(event).await.is_err() {
                    break;
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            tracing::debug!(url = %url, "frame source detached");
        });
    }
}

/// One fetch against a cache-busted copy of the feed URL.
async fn fetch_once(client: &reqwest::Client, url: &Url) -> FeedEvent {
    let request_url = cache_busted(url);

    match client.get(request_url).send().await {
        Ok(response) if response.status().is_success() => match response.bytes().await {
            Ok(_) => FeedEvent::Frame,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "feed body read failed");
                FeedEvent::Faulted
            }
        },
        Ok(response) => {
            tracing::debug!(url = %url, status = %response.status(), "feed returned error status");
            FeedEvent::Faulted
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "feed fetch failed");
            FeedEvent::Faulted
        }
    }
}

/// Append a millisecond-timestamp query parameter so no cache layer can
/// serve a stale response for this request.
fn cache_busted(url: &Url) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair("t", &chrono::Utc::now().timestamp_millis().to_string());
    busted
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_appends_timestamp_param() {
        let url = Url::parse("http://192.168.0.150/stream").unwrap();
        let busted = cache_busted(&url);

        let (key, value) = busted.query_pairs().next().unwrap();
        assert_eq!(key, "t");
        assert!(value.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn cache_buster_preserves_existing_query() {
        let url = Url::parse("http://192.168.0.150/stream?res=low").unwrap();
        let busted = cache_busted(&url);

        let pairs: Vec<(String, String)> = busted
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0].0, "res");
        assert_eq!(pairs[1].0, "t");
    }
}
