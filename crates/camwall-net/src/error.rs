// ── Transport error types ──
//
// Errors from the bus client and feed fetcher. Consumers upstream
// (camwall-core) translate these into domain-appropriate variants and
// never see protocol detail beyond what these messages carry.

use thiserror::Error;

/// Unified error type for the transport crate.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("cannot reach broker at {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("bus client is not connected")]
    NotConnected,

    #[error("subscribe to '{topic}' failed: {reason}")]
    SubscribeFailed { topic: String, reason: String },

    #[error("publish to '{topic}' failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("broker session closed")]
    SessionClosed,

    #[error("invalid broker URL: {0}")]
    InvalidUrl(String),
}
