// ── Core error types ──
//
// User-facing errors from camwall-core. Stream failures are NOT errors
// here — they surface through each feed's health value. Bus failures
// surface through the connection status and the notice stream.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("camera not found: {id}")]
    CameraNotFound { id: String },

    #[error("persistence error: {message}")]
    Persistence { message: String },
}
