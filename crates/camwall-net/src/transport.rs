// ── Bus transport seam ──
//
// The wire protocol (MQTT over a socket, in production) is deliberately
// out of scope here. `Transport` is the whole contract: open a session
// against a broker, then read inbound messages and write subscriptions
// and publications through it. `BusHandle` consumes this seam and owns
// reconnection policy on top of it.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::NetError;

// ── BusConfig ───────────────────────────────────────────────────────

/// Broker connection settings.
///
/// Persisted as a JSON document under the `"bus"` namespace, so the
/// fields round-trip through serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Broker endpoint, e.g. `ws://127.0.0.1:8883`.
    pub broker_url: Url,

    /// Topic carrying camera announcements.
    pub topic: String,

    /// Client identifier presented to the broker.
    pub client_id: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            // Matches the WebSocket listener port of the dev broker.
            broker_url: Url::parse("ws://127.0.0.1:8883")
                .expect("default broker URL is valid"),
            topic: "camera/ip".into(),
            client_id: "camwall".into(),
        }
    }
}

// ── ConnectionStatus ────────────────────────────────────────────────

/// Connection state observable by consumers through a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// ── BusMessage ──────────────────────────────────────────────────────

/// One inbound message as delivered by the broker.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Bytes,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

// ── Transport traits ────────────────────────────────────────────────

/// Factory for broker sessions. Implementations own the wire protocol.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a fresh session against the broker named in `config`.
    async fn open(&self, config: &BusConfig) -> Result<BusSession, NetError>;
}

/// A live broker session, split into its read and write halves so the
/// client can poll for messages while publishing concurrently.
pub struct BusSession {
    pub reader: Box<dyn SessionReader>,
    pub writer: Box<dyn SessionWriter>,
}

/// Read half of a session.
#[async_trait]
pub trait SessionReader: Send {
    /// Next inbound message, or `None` once the session is closed.
    async fn next_message(&mut self) -> Option<BusMessage>;
}

/// Write half of a session.
#[async_trait]
pub trait SessionWriter: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<(), NetError>;

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), NetError>;
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_matches_dev_broker() {
        let config = BusConfig::default();
        assert_eq!(config.broker_url.as_str(), "ws://127.0.0.1:8883/");
        assert_eq!(config.topic, "camera/ip");
        assert_eq!(config.client_id, "camwall");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = BusConfig {
            broker_url: Url::parse("ws://10.0.0.2:1883").unwrap(),
            topic: "cams/announce".into(),
            client_id: "wall-7".into(),
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: BusConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn status_displays_lowercase() {
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionStatus::Error.to_string(), "error");
    }
}
