//! Transport-layer collaborators for the camwall workspace.
//!
//! This crate owns every piece of I/O the core is *not* allowed to care
//! about:
//!
//! - **[`BusHandle`]** — an owned publish/subscribe bus client with
//!   auto-reconnect, explicit [`Subscription`] handles, and a poll-able
//!   [`ConnectionStatus`] watch channel. The actual wire protocol hides
//!   behind the [`Transport`] trait.
//!
//! - **[`MemoryBroker`]** — an in-process [`Transport`] used by tests and
//!   the demo publisher. A socket MQTT transport plugs into the same seam.
//!
//! - **[`HttpFrameSource`]** — drives a camera feed by fetching its stream
//!   URL in a loop (cache-busted per request) and reporting
//!   [`FeedEvent`]s to whoever is watching the feed's health.

pub mod bus;
pub mod error;
pub mod feed;
pub mod memory;
pub mod transport;

pub use bus::{BusHandle, ReconnectConfig, Subscription};
pub use error::NetError;
pub use feed::{FeedEvent, FrameSource, HttpFrameSource};
pub use memory::MemoryBroker;
pub use transport::{BusConfig, BusMessage, BusSession, ConnectionStatus, Transport};
