// ── Camera store ──
//
// The one piece of shared mutable state in the system. Holds the
// ordered, deduplicated camera collection; mutated only by discovery
// and explicit edits; persists the full list on every mutation and
// publishes an order-sorted snapshot through a `watch` channel, so
// readers always observe a complete pre- or post-mutation list.

mod persist;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::discovery::stream_url;
use crate::error::CoreError;
use crate::model::{Camera, CameraId};
use crate::stream::CamerasStream;

pub use persist::{BUS_NAMESPACE, CAMERAS_NAMESPACE, MemoryStore, Persistence};

// ── DiscoveryOutcome ────────────────────────────────────────────────

/// Result of feeding one extracted address through the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// A new camera was appended.
    Added(Camera),

    /// An existing camera's address already contains the candidate.
    /// `quiet` is set while the store holds at most one camera — the
    /// first device tends to re-announce immediately after being added,
    /// and that echo is not worth a notification.
    AlreadyKnown { address: String, quiet: bool },
}

// ── CameraStore ─────────────────────────────────────────────────────

/// Ordered, deduplicated camera collection with reactive snapshots.
pub struct CameraStore {
    cameras: Mutex<Vec<Camera>>,
    snapshot: watch::Sender<Arc<Vec<Camera>>>,
    persistence: Arc<dyn Persistence>,
}

impl CameraStore {
    /// Load the persisted list (if any) and build the store around it.
    pub fn load(persistence: Arc<dyn Persistence>) -> Result<Self, CoreError> {
        let cameras: Vec<Camera> = match persistence.load(CAMERAS_NAMESPACE)? {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| CoreError::Persistence {
                    message: format!("persisted camera list is malformed: {e}"),
                })?
            }
            None => Vec::new(),
        };

        tracing::info!(count = cameras.len(), "camera store loaded");

        let (snapshot, _) = watch::channel(Arc::new(sorted_view(&cameras)));
        Ok(Self {
            cameras: Mutex::new(cameras),
            snapshot,
            persistence,
        })
    }

    // ── Read access ──────────────────────────────────────────────────

    /// Current order-sorted snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Camera>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a raw `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Camera>>> {
        self.snapshot.subscribe()
    }

    /// Subscribe through the higher-level [`CamerasStream`] interface.
    pub fn stream(&self) -> CamerasStream {
        CamerasStream::new(self.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // ── Discovery reducer ────────────────────────────────────────────

    /// Merge one extracted address into the collection.
    ///
    /// Decided against the latest committed list under the store lock,
    /// so back-to-back announcements of the same address can never both
    /// pass the duplicate check.
    pub fn discover(&self, candidate: &str) -> DiscoveryOutcome {
        let mut cameras = self.lock();

        if cameras.iter().any(|c| c.address.contains(candidate)) {
            return DiscoveryOutcome::AlreadyKnown {
                address: candidate.to_owned(),
                quiet: cameras.len() <= 1,
            };
        }

        let camera = Camera {
            id: next_id(&cameras),
            address: stream_url(candidate),
            order: next_order(&cameras),
        };
        cameras.push(camera.clone());
        self.commit(&cameras);

        DiscoveryOutcome::Added(camera)
    }

    // ── Manual edits ─────────────────────────────────────────────────

    /// Append a camera with a generated id and an empty address.
    pub fn add_blank(&self) -> Camera {
        let mut cameras = self.lock();
        let camera = Camera {
            id: next_id(&cameras),
            address: String::new(),
            order: next_order(&cameras),
        };
        cameras.push(camera.clone());
        self.commit(&cameras);
        camera
    }

    /// Replace a camera's feed address in place.
    pub fn set_address(&self, id: &CameraId, address: &str) -> Result<(), CoreError> {
        let mut cameras = self.lock();
        let camera = cameras
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| not_found(id))?;
        camera.address = address.to_owned();
        self.commit(&cameras);
        Ok(())
    }

    /// Swap the display ranks of two cameras (drag-reorder).
    pub fn swap_order(&self, a: &CameraId, b: &CameraId) -> Result<(), CoreError> {
        let mut cameras = self.lock();
        let pos_a = cameras
            .iter()
            .position(|c| c.id == *a)
            .ok_or_else(|| not_found(a))?;
        let pos_b = cameras
            .iter()
            .position(|c| c.id == *b)
            .ok_or_else(|| not_found(b))?;

        let order_a = cameras[pos_a].order;
        cameras[pos_a].order = cameras[pos_b].order;
        cameras[pos_b].order = order_a;
        self.commit(&cameras);
        Ok(())
    }

    /// Remove one camera.
    pub fn remove(&self, id: &CameraId) -> Result<(), CoreError> {
        let mut cameras = self.lock();
        let before = cameras.len();
        cameras.retain(|c| c.id != *id);
        if cameras.len() == before {
            return Err(not_found(id));
        }
        self.commit(&cameras);
        Ok(())
    }

    /// Remove every camera.
    pub fn clear(&self) {
        let mut cameras = self.lock();
        cameras.clear();
        self.commit(&cameras);
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Vec<Camera>> {
        self.cameras.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the full list and publish a fresh sorted snapshot.
    ///
    /// A persistence failure is logged and surfaced to nobody — the
    /// in-memory list is already committed and must not be unwound.
    fn commit(&self, cameras: &[Camera]) {
        match serde_json::to_value(cameras) {
            Ok(value) => {
                if let Err(e) = self.persistence.store(CAMERAS_NAMESPACE, &value) {
                    tracing::warn!(error = %e, "camera list persistence failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "camera list serialization failed"),
        }

        self.snapshot.send_replace(Arc::new(sorted_view(cameras)));
    }
}

/// Generated id for the next camera: `CAM-` + count+1, bumped past any
/// id still in use so an id is never reused while its camera exists.
fn next_id(cameras: &[Camera]) -> CameraId {
    let mut n = cameras.len() + 1;
    loop {
        let id = CameraId::numbered(n);
        if !cameras.iter().any(|c| c.id == id) {
            return id;
        }
        n += 1;
    }
}

fn next_order(cameras: &[Camera]) -> u32 {
    u32::try_from(cameras.len()).unwrap_or(u32::MAX)
}

fn not_found(id: &CameraId) -> CoreError {
    CoreError::CameraNotFound { id: id.to_string() }
}

/// Order-sorted copy for display. Stable, so rank ties keep insertion order.
fn sorted_view(cameras: &[Camera]) -> Vec<Camera> {
    let mut view = cameras.to_vec();
    view.sort_by_key(|c| c.order);
    view
}

// ── Tests ───────────────────────────────────────────────────────────
