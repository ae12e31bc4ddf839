//! Reactive core of the camwall workspace.
//!
//! This crate owns the domain model and every non-trivial piece of
//! state or algorithm in the system:
//!
//! - **[`Wall`]** — Supervisor facade: owns the camera store and the
//!   discovery pipeline, with an explicit
//!   [`start_discovery()`](Wall::start_discovery) /
//!   [`stop_discovery()`](Wall::stop_discovery) bus lifecycle and a
//!   broadcast [`Notice`] stream for the UI's toasts.
//!
//! - **[`CameraStore`]** — The ordered, deduplicated camera collection.
//!   Persisted on every mutation, snapshot via `tokio::sync::watch`, so
//!   readers always see a complete pre- or post-mutation list.
//!
//! - **[`discovery`]** — Pure address extraction (JSON `ip` field first,
//!   dotted-quad scan second) feeding the store's reducer.
//!
//! - **[`StreamMonitor`]** — Per-feed health state machine
//!   (Loading → Online/Offline) with a 5-second liveness deadline and a
//!   rolling frames-per-second window.
//!
//! - **[`layout`]** — The tiling engine: an ordered camera list becomes
//!   a balanced binary space partition with alternating split axes.

pub mod discovery;
pub mod error;
pub mod layout;
pub mod model;
pub mod monitor;
pub mod store;
pub mod stream;
pub mod wall;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use layout::{Branch, SplitAxis, Tile, build_layout};
pub use model::{Camera, CameraId};
pub use monitor::{FeedHealth, FeedState, OfflineReason, StreamMonitor};
pub use store::{CameraStore, DiscoveryOutcome, MemoryStore, Persistence};
pub use stream::CamerasStream;
pub use wall::{Notice, Wall};
