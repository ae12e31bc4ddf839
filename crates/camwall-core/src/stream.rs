// ── Reactive camera-list stream ──
//
// Subscription type for consuming camera-list changes from the store.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Camera;

/// A subscription to the camera collection.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via `changed()` or by converting to a `Stream`.
pub struct CamerasStream {
    current: Arc<Vec<Camera>>,
    receiver: watch::Receiver<Arc<Vec<Camera>>>,
}

impl CamerasStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Camera>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time.
    pub fn current(&self) -> &Arc<Vec<Camera>> {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Vec<Camera>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Camera>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> CamerasWatchStream {
        CamerasWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by the store's `watch::Receiver`.
pub struct CamerasWatchStream {
    inner: WatchStream<Arc<Vec<Camera>>>,
}

impl Stream for CamerasWatchStream {
    type Item = Arc<Vec<Camera>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
