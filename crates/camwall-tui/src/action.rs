//! Actions dispatched through the app's internal channel.

use std::sync::Arc;

use camwall_core::{Camera, Notice};

/// Everything that can change app state, from keys or from the bridge.
#[derive(Debug, Clone)]
pub enum Action {
    // ── UI intents ──
    Quit,
    AddCamera,
    DeleteSelected,
    ClearAll,
    SelectNext,
    SelectPrev,
    /// Swap the selected camera with its right neighbor.
    MoveSelectedForward,
    /// Swap the selected camera with its left neighbor.
    MoveSelectedBack,
    Resize(u16, u16),
    Tick,
    Render,

    // ── Bridge events ──
    CamerasUpdated(Arc<Vec<Camera>>),
    Notice(Notice),
}
