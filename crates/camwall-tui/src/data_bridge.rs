//! Data bridge — connects [`Wall`] streams to TUI actions.
//!
//! Runs as a background task: subscribes to the camera-list stream and
//! the notice broadcast, forwarding every change as an [`Action`]
//! through the TUI's action channel.

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use camwall_core::Wall;

use crate::action::Action;

/// Forward wall changes into the TUI action loop until cancelled.
pub async fn run_data_bridge(
    wall: Wall,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut cameras = wall.store().stream();
    let mut notices = wall.notices();

    // Push the initial snapshot so the wall has tiles immediately.
    let _ = action_tx.send(Action::CamerasUpdated(cameras.current().clone()));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(snapshot) = cameras.changed() => {
                let _ = action_tx.send(Action::CamerasUpdated(snapshot));
            }

            notice = notices.recv() => match notice {
                Ok(notice) => {
                    let _ = action_tx.send(Action::Notice(notice));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notice stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!("data bridge exiting");
}
