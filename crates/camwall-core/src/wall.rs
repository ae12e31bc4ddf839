//! Wall supervisor — wires the bus to the store.
//!
//! Owns the camera store, the (optional) bus connection, and the notice
//! broadcast the UI surfaces as toasts. Exactly one message handler
//! consumes the bus subscription; messages are processed one at a time
//! in delivery order, each against the latest committed store state.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use camwall_net::{BusConfig, BusHandle, ConnectionStatus, ReconnectConfig, Subscription, Transport};

use crate::discovery::extract_address;
use crate::model::CameraId;
use crate::store::{CameraStore, DiscoveryOutcome};

const NOTICE_CHANNEL_CAPACITY: usize = 64;

// ── Notice ──────────────────────────────────────────────────────────

/// Non-fatal, user-facing events from the discovery pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A new camera was discovered and appended.
    Discovered { camera: CameraId, address: String },

    /// A message announced an address the wall already tracks.
    AlreadyKnown { address: String },

    /// A message carried no extractable address.
    NoAddress,

    /// The bus connection changed state.
    Bus(ConnectionStatus),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovered { camera, address } => {
                write!(f, "discovered {camera} at {address}")
            }
            Self::AlreadyKnown { address } => {
                write!(f, "camera at {address} already exists")
            }
            Self::NoAddress => write!(f, "no address found in message"),
            Self::Bus(status) => write!(f, "bus {status}"),
        }
    }
}

// ── Wall ────────────────────────────────────────────────────────────

/// Supervisor owning the store and the discovery pipeline.
///
/// Cheaply cloneable via `Arc<WallInner>`. The bus client is an owned
/// instance with an explicit start/stop lifecycle — there is no ambient
/// connection state.
#[derive(Clone)]
pub struct Wall {
    inner: Arc<WallInner>,
}

struct WallInner {
    store: Arc<CameraStore>,
    notice_tx: broadcast::Sender<Notice>,
    bus: Mutex<Option<BusHandle>>,
    discovery_task: Mutex<Option<JoinHandle<()>>>,
}

impl Wall {
    pub fn new(store: Arc<CameraStore>) -> Self {
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(WallInner {
                store,
                notice_tx,
                bus: Mutex::new(None),
                discovery_task: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &Arc<CameraStore> {
        &self.inner.store
    }

    /// Subscribe to the notice stream.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notice_tx.subscribe()
    }

    // ── Discovery lifecycle ──────────────────────────────────────────

    /// Connect to the bus and start consuming announcements.
    ///
    /// Replaces any previous connection. The single registered handler
    /// runs extraction and the reducer for every inbound message.
    pub async fn start_discovery(&self, config: BusConfig, transport: Arc<dyn Transport>) {
        self.stop_discovery().await;

        let handle = BusHandle::connect(config, transport, ReconnectConfig::default());
        let subscription = handle.subscribe();
        let status = handle.status();

        let store = Arc::clone(&self.inner.store);
        let notice_tx = self.inner.notice_tx.clone();
        let task = tokio::spawn(discovery_loop(subscription, status, store, notice_tx));

        *self.inner.bus.lock().await = Some(handle);
        *self.inner.discovery_task.lock().await = Some(task);
    }

    /// Tear the bus connection down and stop the handler.
    pub async fn stop_discovery(&self) {
        if let Some(handle) = self.inner.bus.lock().await.take() {
            handle.shutdown();
        }
        if let Some(task) = self.inner.discovery_task.lock().await.take() {
            let _ = task.await;
        }
    }

    /// Poll-able bus connection status, if a connection exists.
    pub async fn bus_status(&self) -> Option<watch::Receiver<ConnectionStatus>> {
        self.inner.bus.lock().await.as_ref().map(BusHandle::status)
    }
}

// ── Discovery pipeline task ─────────────────────────────────────────

async fn discovery_loop(
    mut subscription: Subscription,
    mut status: watch::Receiver<ConnectionStatus>,
    store: Arc<CameraStore>,
    notice_tx: broadcast::Sender<Notice>,
) {
    loop {
        tokio::select! {
            message = subscription.recv() => match message {
                Some(message) => handle_message(&message.payload, &store, &notice_tx),
                None => break,
            },

            changed = status.changed() => match changed {
                Ok(()) => {
                    let current = *status.borrow_and_update();
                    let _ = notice_tx.send(Notice::Bus(current));
                }
                Err(_) => break,
            },
        }
    }

    tracing::debug!("discovery loop exiting");
}

/// One bus message through the pipeline: extract → reduce → notify.
fn handle_message(
    payload: &[u8],
    store: &CameraStore,
    notice_tx: &broadcast::Sender<Notice>,
) {
    match extract_address(payload) {
        Some(address) => match store.discover(&address) {
            DiscoveryOutcome::Added(camera) => {
                tracing::info!(camera = %camera.id, %address, "camera discovered");
                let _ = notice_tx.send(Notice::Discovered {
                    camera: camera.id,
                    address,
                });
            }
            DiscoveryOutcome::AlreadyKnown { address, quiet } => {
                tracing::debug!(%address, "duplicate announcement");
                if !quiet {
                    let _ = notice_tx.send(Notice::AlreadyKnown { address });
                }
            }
        },
        None => {
            tracing::debug!("message carried no address");
            let _ = notice_tx.send(Notice::NoAddress);
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use camwall_net::MemoryBroker;

    async fn connected_wall(broker: &Arc<MemoryBroker>) -> Wall {
        let store = Arc::new(CameraStore::load(Arc::new(MemoryStore::new())).unwrap());
        let wall = Wall::new(store);
        wall.start_discovery(BusConfig::default(), Arc::clone(broker) as Arc<dyn Transport>)
            .await;

        let mut status = wall.bus_status().await.unwrap();
        while *status.borrow() != ConnectionStatus::Connected {
            status.changed().await.unwrap();
        }
        wall
    }

    async fn next_non_bus_notice(rx: &mut broadcast::Receiver<Notice>) -> Notice {
        loop {
            let notice = rx.recv().await.unwrap();
            if !matches!(notice, Notice::Bus(_)) {
                return notice;
            }
        }
    }

    #[tokio::test]
    async fn plain_text_announcement_adds_a_camera() {
        let broker = MemoryBroker::new();
        let wall = connected_wall(&broker).await;
        let mut notices = wall.notices();

        broker.publish("camera/ip", "camera at 192.168.0.150 online");

        let notice = next_non_bus_notice(&mut notices).await;
        assert_eq!(
            notice,
            Notice::Discovered {
                camera: CameraId::numbered(1),
                address: "192.168.0.150".into(),
            }
        );

        let snapshot = wall.store().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].address, "http://192.168.0.150/stream");

        wall.stop_discovery().await;
    }

    #[tokio::test]
    async fn json_announcement_adds_a_camera() {
        let broker = MemoryBroker::new();
        let wall = connected_wall(&broker).await;
        let mut notices = wall.notices();

        broker.publish("camera/ip", r#"{"ip":"192.168.0.151","model":"x"}"#);

        let notice = next_non_bus_notice(&mut notices).await;
        assert!(matches!(notice, Notice::Discovered { .. }));
        assert_eq!(wall.store().snapshot()[0].address, "http://192.168.0.151/stream");

        wall.stop_discovery().await;
    }

    #[tokio::test]
    async fn message_without_address_notifies_and_leaves_store_alone() {
        let broker = MemoryBroker::new();
        let wall = connected_wall(&broker).await;
        let mut notices = wall.notices();

        broker.publish("camera/ip", "no address here");

        assert_eq!(next_non_bus_notice(&mut notices).await, Notice::NoAddress);
        assert!(wall.store().is_empty());

        wall.stop_discovery().await;
    }

    #[tokio::test]
    async fn duplicate_announcement_is_reported_once_tracked() {
        let broker = MemoryBroker::new();
        let wall = connected_wall(&broker).await;
        let mut notices = wall.notices();

        broker.publish("camera/ip", "192.168.0.150");
        broker.publish("camera/ip", "192.168.0.151");
        broker.publish("camera/ip", "192.168.0.150");

        assert!(matches!(
            next_non_bus_notice(&mut notices).await,
            Notice::Discovered { .. }
        ));
        assert!(matches!(
            next_non_bus_notice(&mut notices).await,
            Notice::Discovered { .. }
        ));
        assert_eq!(
            next_non_bus_notice(&mut notices).await,
            Notice::AlreadyKnown {
                address: "192.168.0.150".into()
            }
        );
        assert_eq!(wall.store().len(), 2);

        wall.stop_discovery().await;
    }

    #[tokio::test]
    async fn rapid_repeated_announcements_yield_one_camera() {
        let broker = MemoryBroker::new();
        let wall = connected_wall(&broker).await;
        let mut notices = wall.notices();

        for _ in 0..5 {
            broker.publish("camera/ip", "10.0.0.7");
        }
        broker.publish("camera/ip", "sentinel 10.0.0.8");

        // Wait until the sentinel's camera lands — everything before it
        // has then been processed in order.
        loop {
            if let Notice::Discovered { address, .. } = next_non_bus_notice(&mut notices).await {
                if address == "10.0.0.8" {
                    break;
                }
            }
        }

        assert_eq!(wall.store().len(), 2);

        wall.stop_discovery().await;
    }

    #[tokio::test]
    async fn notice_text_reads_like_a_toast() {
        assert_eq!(
            Notice::Discovered {
                camera: CameraId::numbered(2),
                address: "10.0.0.2".into()
            }
            .to_string(),
            "discovered CAM-002 at 10.0.0.2"
        );
        assert_eq!(
            Notice::AlreadyKnown {
                address: "10.0.0.2".into()
            }
            .to_string(),
            "camera at 10.0.0.2 already exists"
        );
        assert_eq!(Notice::NoAddress.to_string(), "no address found in message");
        assert_eq!(
            Notice::Bus(ConnectionStatus::Connected).to_string(),
            "bus connected"
        );
    }
}
