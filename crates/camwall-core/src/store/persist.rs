// ── Persistence collaborator seam ──
//
// Key-value JSON persistence keyed by a namespace string. The camera
// list lives under one namespace, bus settings under another. Read once
// at startup, written on every camera-list mutation. The mechanics
// (files, platform dirs) belong to the implementor, not the core.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::CoreError;

/// Namespace for the persisted camera list.
pub const CAMERAS_NAMESPACE: &str = "cameras";

/// Namespace for persisted bus settings.
pub const BUS_NAMESPACE: &str = "bus";

/// JSON key-value persistence keyed by namespace string.
pub trait Persistence: Send + Sync {
    /// Stored document for `namespace`, or `None` if nothing was written.
    fn load(&self, namespace: &str) -> Result<Option<serde_json::Value>, CoreError>;

    /// Replace the document for `namespace`.
    fn store(&self, namespace: &str, value: &serde_json::Value) -> Result<(), CoreError>;
}

/// In-memory persistence for tests and ephemeral walls.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemoryStore {
    fn load(&self, namespace: &str) -> Result<Option<serde_json::Value>, CoreError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.get(namespace).cloned())
    }

    fn store(&self, namespace: &str, value: &serde_json::Value) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(namespace.to_owned(), value.clone());
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> CoreError {
    CoreError::Persistence {
        message: "memory store lock poisoned".into(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
