//! Address extraction from discovery messages.
//!
//! Cameras announce themselves on the bus either as a plain string that
//! contains a dotted-quad IPv4 address somewhere, or as a JSON object
//! with a string field `ip`. The structured form always wins. Anything
//! else extracts to nothing — malformed input never errors.

use std::sync::LazyLock;

use regex::Regex;

/// First dotted-quad in free text. Octets are deliberately unvalidated
/// (matches up to 999) — relaxed parsing is the contract here, not a bug.
static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("static pattern compiles")
});

/// Extract a candidate camera address from a raw message payload.
///
/// Tries structured (JSON `ip` field) parsing first, then falls back to
/// scanning the decoded text for the first dotted-quad.
pub fn extract_address(payload: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(payload);

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(ip) = value.get("ip").and_then(|v| v.as_str()) {
            return Some(ip.to_owned());
        }
    }

    DOTTED_QUAD.find(&text).map(|m| m.as_str().to_owned())
}

/// Canonical feed URL for a discovered address.
pub fn stream_url(address: &str) -> String {
    format!("http://{address}/stream")
}

// ── Tests ───────────────────────────────────────────────────────────
