// ── Core identity types ──
//
// CameraId and Camera are the foundation of everything else: the store
// holds Cameras, the layout engine partitions them, and each stream
// monitor is bound to exactly one of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── CameraId ────────────────────────────────────────────────────────

/// Stable identifier for a tracked camera, formatted `CAM-NNN`.
///
/// Generated from the ordinal position at creation time and never
/// reused while the camera exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(String);

impl CameraId {
    /// Build the id for the `n`-th camera (1-based), zero-padded to
    /// three digits: `CAM-001`, `CAM-042`, `CAM-117`.
    pub fn numbered(n: usize) -> Self {
        Self(format!("CAM-{n:03}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CameraId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<&str> for CameraId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── Camera ──────────────────────────────────────────────────────────

/// A tracked camera feed.
///
/// `order` is a display rank, not an index — it need not be contiguous
/// or unique. The display sorts by it; ties keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub id: CameraId,

    /// Opaque resource locator for the feed, canonically
    /// `http://<ip>/stream` for discovered cameras. May be empty for a
    /// manually added camera awaiting an address.
    pub address: String,

    /// Display rank.
    pub order: u32,
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn numbered_ids_are_zero_padded() {
        assert_eq!(CameraId::numbered(1).as_str(), "CAM-001");
        assert_eq!(CameraId::numbered(42).as_str(), "CAM-042");
        assert_eq!(CameraId::numbered(117).as_str(), "CAM-117");
    }

    #[test]
    fn numbered_ids_grow_past_three_digits() {
        assert_eq!(CameraId::numbered(1000).as_str(), "CAM-1000");
    }

    #[test]
    fn camera_round_trips_through_json() {
        let camera = Camera {
            id: CameraId::numbered(3),
            address: "http://192.168.0.152/stream".into(),
            order: 2,
        };

        let json = serde_json::to_string(&camera).unwrap();
        let back: Camera = serde_json::from_str(&json).unwrap();
        assert_eq!(back, camera);
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let json = serde_json::to_string(&CameraId::numbered(7)).unwrap();
        assert_eq!(json, "\"CAM-007\"");
    }
}
