//! Bus client with auto-reconnect.
//!
//! Opens a session through a [`Transport`], subscribes to the configured
//! topic, and fans inbound messages out through a [`tokio::sync::broadcast`]
//! channel. Reconnection with exponential backoff + jitter happens here;
//! consumers only ever observe the [`ConnectionStatus`] watch value.
//!
//! # Example
//!
//! ```rust,ignore
//! use camwall_net::{BusConfig, BusHandle, MemoryBroker, ReconnectConfig};
//!
//! let broker = MemoryBroker::new();
//! let handle = BusHandle::connect(BusConfig::default(), broker, ReconnectConfig::default());
//! let mut sub = handle.subscribe();
//!
//! while let Some(msg) = sub.recv().await {
//!     println!("{}: {} bytes", msg.topic, msg.payload.len());
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::error::NetError;
use crate::transport::{BusConfig, BusMessage, BusSession, ConnectionStatus, Transport};

// ── Channel capacities ──────────────────────────────────────────────

const MESSAGE_CHANNEL_CAPACITY: usize = 256;
const PUBLISH_CHANNEL_CAPACITY: usize = 64;

// ── ReconnectConfig ─────────────────────────────────────────────────

/// Exponential backoff configuration for broker reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── BusHandle ───────────────────────────────────────────────────────

/// Handle to a running bus client.
///
/// Explicitly constructed and owned by its consumer — there is no ambient
/// singleton. Drop all subscriptions and call [`shutdown`](Self::shutdown)
/// to tear down the background task.
pub struct BusHandle {
    message_rx: broadcast::Receiver<Arc<BusMessage>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    publish_tx: mpsc::Sender<OutboundMessage>,
    cancel: CancellationToken,
}

struct OutboundMessage {
    topic: String,
    payload: Bytes,
}

impl BusHandle {
    /// Spawn the connection loop against `transport` and return immediately.
    ///
    /// The first connection attempt happens asynchronously — watch
    /// [`status`](Self::status) or subscribe to start consuming messages.
    pub fn connect(
        config: BusConfig,
        transport: Arc<dyn Transport>,
        reconnect: ReconnectConfig,
    ) -> Self {
        let (message_tx, message_rx) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (publish_tx, publish_rx) = mpsc::channel(PUBLISH_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            bus_loop(
                config, transport, message_tx, status_tx, publish_rx, reconnect, task_cancel,
            )
            .await;
        });

        Self {
            message_rx,
            status_rx,
            publish_tx,
            cancel,
        }
    }

    /// Register a new consumer and hand back its subscription handle.
    ///
    /// Dropping the handle unregisters the consumer; there is no other
    /// bookkeeping to clean up.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.message_rx.resubscribe(),
        }
    }

    /// Poll-able connection status.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// The status value right now.
    pub fn current_status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Publish a payload through the live session.
    ///
    /// Fails fast with [`NetError::NotConnected`] when no session is up,
    /// mirroring the status value consumers already observe.
    pub async fn publish(
        &self,
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<(), NetError> {
        if self.current_status() != ConnectionStatus::Connected {
            return Err(NetError::NotConnected);
        }
        self.publish_tx
            .send(OutboundMessage {
                topic: topic.into(),
                payload: payload.into(),
            })
            .await
            .map_err(|_| NetError::NotConnected)
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for BusHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Subscription ────────────────────────────────────────────────────

/// Explicit subscription handle vended by [`BusHandle::subscribe`].
pub struct Subscription {
    rx: broadcast::Receiver<Arc<BusMessage>>,
}

impl Subscription {
    /// Next message in bus-delivery order, or `None` once the client has
    /// shut down. A lagging consumer skips to the oldest retained message
    /// rather than erroring out.
    pub async fn recv(&mut self) -> Option<Arc<BusMessage>> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "bus subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ── Background connection loop ──────────────────────────────────────

/// Main loop: open session → subscribe → pump → on failure, backoff → retry.
async fn bus_loop(
    config: BusConfig,
    transport: Arc<dyn Transport>,
    message_tx: broadcast::Sender<Arc<BusMessage>>,
    status_tx: watch::Sender<ConnectionStatus>,
    mut publish_rx: mpsc::Receiver<OutboundMessage>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let _ = status_tx.send(ConnectionStatus::Connecting);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = transport.open(&config) => result,
        };

        match opened {
            Ok(session) => match run_session(
                session,
                &config,
                &message_tx,
                &status_tx,
                &mut publish_rx,
                &cancel,
            )
            .await
            {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed => {
                    tracing::info!("bus session closed cleanly, reconnecting");
                    let _ = status_tx.send(ConnectionStatus::Disconnected);
                    attempt = 0;
                }
                SessionEnd::Failed(e) => {
                    tracing::warn!(error = %e, attempt, "bus session failed");
                    let _ = status_tx.send(ConnectionStatus::Error);
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, attempt, "broker connection failed");
                let _ = status_tx.send(ConnectionStatus::Error);
            }
        }

        if let Some(max) = reconnect.max_retries {
            if attempt >= max {
                tracing::error!(max_retries = max, "bus reconnection limit reached, giving up");
                break;
            }
        }

        let delay = calculate_backoff(attempt, &reconnect);
        tracing::info!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), attempt, "waiting before reconnect");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }

    let _ = status_tx.send(ConnectionStatus::Disconnected);
    tracing::debug!("bus loop exiting");
}

enum SessionEnd {
    Cancelled,
    Closed,
    Failed(NetError),
}

/// Drive a single session: subscribe to the configured topic, then pump
/// inbound messages and outbound publications until the session drops.
async fn run_session(
    session: BusSession,
    config: &BusConfig,
    message_tx: &broadcast::Sender<Arc<BusMessage>>,
    status_tx: &watch::Sender<ConnectionStatus>,
    publish_rx: &mut mpsc::Receiver<OutboundMessage>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let BusSession { mut reader, writer } = session;

    if let Err(e) = writer.subscribe(&config.topic).await {
        return SessionEnd::Failed(e);
    }

    let _ = status_tx.send(ConnectionStatus::Connected);
    tracing::info!(broker = %config.broker_url, topic = %config.topic, "connected to broker");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::Cancelled,

            outbound = publish_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if let Err(e) = writer.publish(&msg.topic, msg.payload).await {
                            tracing::warn!(error = %e, topic = %msg.topic, "publish failed");
                        }
                    }
                    // All handles dropped — nothing left to serve.
                    None => return SessionEnd::Cancelled,
                }
            }

            inbound = reader.next_message() => {
                match inbound {
                    Some(msg) => {
                        tracing::debug!(topic = %msg.topic, bytes = msg.payload.len(), "bus message");
                        // Ignore send errors — no active subscribers right now.
                        let _ = message_tx.send(Arc::new(msg));
                    }
                    None => return SessionEnd::Closed,
                }
            }
        }
    }
}

// ── Backoff calculation ─────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is ±25%, deterministically seeded from the attempt number, to
/// spread reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
    let capped = base.min(config.max_delay.as_secs_f64());

    let jitter_factor = 1.0 + 0.25 * ((f64::from(attempt) * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryBroker;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter up to 1.25x, the effective ceiling is 12.5s.
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[tokio::test]
    async fn subscription_receives_published_messages() {
        let broker = MemoryBroker::new();
        let handle = BusHandle::connect(
            BusConfig::default(),
            broker.clone(),
            ReconnectConfig::default(),
        );
        let mut sub = handle.subscribe();

        // Wait for the background task to reach Connected.
        let mut status = handle.status();
        while *status.borrow() != ConnectionStatus::Connected {
            status.changed().await.unwrap();
        }

        broker.publish("camera/ip", "192.168.0.150");

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.topic, "camera/ip");
        assert_eq!(&msg.payload[..], b"192.168.0.150");

        handle.shutdown();
    }

    #[tokio::test]
    async fn unsubscribed_topics_are_filtered() {
        let broker = MemoryBroker::new();
        let handle = BusHandle::connect(
            BusConfig::default(),
            broker.clone(),
            ReconnectConfig::default(),
        );
        let mut sub = handle.subscribe();

        let mut status = handle.status();
        while *status.borrow() != ConnectionStatus::Connected {
            status.changed().await.unwrap();
        }

        broker.publish("other/topic", "ignored");
        broker.publish("camera/ip", "10.0.0.9");

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.topic, "camera/ip");

        handle.shutdown();
    }

    /// A transport whose broker never answers — the client stays Connecting.
    struct UnreachableBroker;

    #[async_trait::async_trait]
    impl Transport for UnreachableBroker {
        async fn open(&self, _config: &BusConfig) -> Result<BusSession, NetError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn publish_requires_connection() {
        let handle = BusHandle::connect(
            BusConfig::default(),
            Arc::new(UnreachableBroker),
            ReconnectConfig::default(),
        );

        let err = handle.publish("camera/ip", "x").await.unwrap_err();
        assert!(matches!(err, NetError::NotConnected));

        handle.shutdown();
    }

    #[tokio::test]
    async fn shutdown_closes_subscriptions() {
        let broker = MemoryBroker::new();
        let handle = BusHandle::connect(
            BusConfig::default(),
            broker,
            ReconnectConfig::default(),
        );
        let mut sub = handle.subscribe();

        let mut status = handle.status();
        while *status.borrow() != ConnectionStatus::Connected {
            status.changed().await.unwrap();
        }

        handle.shutdown();

        // Once the loop exits, the broadcast sender drops and recv ends.
        assert!(sub.recv().await.is_none());
    }
}
