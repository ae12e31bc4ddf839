// ── In-process broker transport ──
//
// A broadcast-backed broker for tests and the demo publisher. Every
// session sees every published message; the read half filters down to
// the topics that session subscribed to.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

use crate::error::NetError;
use crate::transport::{
    BusConfig, BusMessage, BusSession, SessionReader, SessionWriter, Transport,
};

const BROKER_CHANNEL_CAPACITY: usize = 256;

/// An in-process message broker implementing the [`Transport`] seam.
///
/// Sessions opened against it behave like broker connections that never
/// fail; the broker itself can inject messages directly via
/// [`publish`](Self::publish), standing in for remote devices announcing
/// themselves.
pub struct MemoryBroker {
    bus: broadcast::Sender<BusMessage>,
}

impl MemoryBroker {
    pub fn new() -> Arc<Self> {
        let (bus, _) = broadcast::channel(BROKER_CHANNEL_CAPACITY);
        Arc::new(Self { bus })
    }

    /// Inject a message as if a remote client published it.
    pub fn publish(&self, topic: impl Into<String>, payload: impl Into<Bytes>) {
        // Ignore send errors — no open sessions right now.
        let _ = self.bus.send(BusMessage::new(topic, payload));
    }
}

#[async_trait]
impl Transport for MemoryBroker {
    async fn open(&self, _config: &BusConfig) -> Result<BusSession, NetError> {
        let topics = Arc::new(Mutex::new(HashSet::new()));

        Ok(BusSession {
            reader: Box::new(MemoryReader {
                rx: self.bus.subscribe(),
                topics: Arc::clone(&topics),
            }),
            writer: Box::new(MemoryWriter {
                tx: self.bus.clone(),
                topics,
            }),
        })
    }
}

struct MemoryReader {
    rx: broadcast::Receiver<BusMessage>,
    topics: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl SessionReader for MemoryReader {
    async fn next_message(&mut self) -> Option<BusMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => {
                    let subscribed = self
                        .topics
                        .lock()
                        .is_ok_and(|set| set.contains(&msg.topic));
                    if subscribed {
                        return Some(msg);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "memory broker session lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct MemoryWriter {
    tx: broadcast::Sender<BusMessage>,
    topics: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl SessionWriter for MemoryWriter {
    async fn subscribe(&self, topic: &str) -> Result<(), NetError> {
        self.topics
            .lock()
            .map_err(|_| NetError::SubscribeFailed {
                topic: topic.into(),
                reason: "subscription set poisoned".into(),
            })?
            .insert(topic.to_owned());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), NetError> {
        let _ = self.tx.send(BusMessage::new(topic, payload));
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_sees_subscribed_topic_only() {
        let broker = MemoryBroker::new();
        let session = broker.open(&BusConfig::default()).await.unwrap();
        let BusSession { mut reader, writer } = session;

        writer.subscribe("camera/ip").await.unwrap();

        broker.publish("camera/other", "skip me");
        broker.publish("camera/ip", "192.168.0.150");

        let msg = reader.next_message().await.unwrap();
        assert_eq!(msg.topic, "camera/ip");
        assert_eq!(&msg.payload[..], b"192.168.0.150");
    }

    #[tokio::test]
    async fn writer_publish_loops_back_to_readers() {
        let broker = MemoryBroker::new();

        let a = broker.open(&BusConfig::default()).await.unwrap();
        let b = broker.open(&BusConfig::default()).await.unwrap();

        a.writer.subscribe("camera/ip").await.unwrap();

        b.writer
            .publish("camera/ip", Bytes::from_static(b"10.0.0.5"))
            .await
            .unwrap();

        let BusSession { mut reader, .. } = a;
        let msg = reader.next_message().await.unwrap();
        assert_eq!(&msg.payload[..], b"10.0.0.5");
    }
}
