//! Stream health monitoring.
//!
//! One [`StreamMonitor`] per mounted feed view. It owns the session's
//! state machine (Loading → Online/Offline), a 5-second liveness
//! deadline, and a rolling one-second frames-per-second window, all
//! driven by [`FeedEvent`]s from an attached [`FrameSource`].
//!
//! Offline is terminal: the monitor never retries on its own. A feed
//! comes back only by rebinding — drop the monitor and bind a new one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use url::Url;

use camwall_net::{FeedEvent, FrameSource};

use crate::model::CameraId;

/// Maximum gap between frames before an online feed is declared dead.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Width of the frame-rate counting window.
const FPS_WINDOW: Duration = Duration::from_secs(1);

const SIGNAL_CHANNEL_CAPACITY: usize = 64;

// ── Health model ────────────────────────────────────────────────────

/// Why a feed went offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum OfflineReason {
    /// The fetch itself failed.
    #[strum(serialize = "stream unavailable")]
    Unavailable,

    /// Frames stopped arriving for [`LIVENESS_TIMEOUT`].
    #[strum(serialize = "stream disconnected")]
    Disconnected,
}

/// Coarse feed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Loading,
    Online,
    Offline(OfflineReason),
}

/// Everything the presentation layer may observe about one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedHealth {
    pub state: FeedState,

    /// Frames counted in the last closed one-second window.
    pub fps: u32,

    /// Arrival time of the most recent frame.
    pub last_frame: Option<DateTime<Utc>>,
}

impl FeedHealth {
    fn initial() -> Self {
        Self {
            state: FeedState::Loading,
            fps: 0,
            last_frame: None,
        }
    }
}

// ── StreamMonitor ───────────────────────────────────────────────────

/// Health state machine for one bound feed.
pub struct StreamMonitor {
    camera: CameraId,
    url: Url,
    health_rx: watch::Receiver<FeedHealth>,
    cancel: CancellationToken,
}

impl StreamMonitor {
    /// Bind to a feed URL. The source issues its first (cache-busted)
    /// fetch immediately; health starts at Loading.
    pub fn bind(camera: CameraId, url: Url, source: &dyn FrameSource) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        let (health_tx, health_rx) = watch::channel(FeedHealth::initial());
        let cancel = CancellationToken::new();

        source.attach(&url, signal_tx, cancel.child_token());

        let task_cancel = cancel.clone();
        tokio::spawn(monitor_loop(signal_rx, health_tx, task_cancel));

        tracing::debug!(camera = %camera, url = %url, "stream monitor bound");

        Self {
            camera,
            url,
            health_rx,
            cancel,
        }
    }

    pub fn camera(&self) -> &CameraId {
        &self.camera
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Subscribe to health changes.
    pub fn health(&self) -> watch::Receiver<FeedHealth> {
        self.health_rx.clone()
    }

    /// The health value right now.
    pub fn current_health(&self) -> FeedHealth {
        self.health_rx.borrow().clone()
    }

    /// Tear the session down: cancels the liveness timer, the fps
    /// window, and the frame source. No signal is attributed to this
    /// session afterwards.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for StreamMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── State machine task ──────────────────────────────────────────────

async fn monitor_loop(
    mut signals: mpsc::Receiver<FeedEvent>,
    health: watch::Sender<FeedHealth>,
    cancel: CancellationToken,
) {
    let mut window_frames: u32 = 0;
    let mut online = false;

    let mut fps_window =
        tokio::time::interval_at(tokio::time::Instant::now() + FPS_WINDOW, FPS_WINDOW);
    fps_window.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let liveness = tokio::time::sleep(LIVENESS_TIMEOUT);
    tokio::pin!(liveness);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            signal = signals.recv() => match signal {
                Some(FeedEvent::Frame) => {
                    online = true;
                    window_frames = window_frames.saturating_add(1);
                    liveness
                        .as_mut()
                        .reset(tokio::time::Instant::now() + LIVENESS_TIMEOUT);
                    health.send_modify(|h| {
                        h.state = FeedState::Online;
                        h.last_frame = Some(Utc::now());
                    });
                }
                Some(FeedEvent::Faulted) => {
                    go_offline(&health, OfflineReason::Unavailable);
                    break;
                }
                // Source detached on its own — nothing more will arrive.
                None => break,
            },

            () = &mut liveness, if online => {
                go_offline(&health, OfflineReason::Disconnected);
                break;
            }

            _ = fps_window.tick() => {
                health.send_modify(|h| h.fps = window_frames);
                window_frames = 0;
            }
        }
    }

    // Take the frame source down with the session.
    cancel.cancel();
    tracing::debug!("stream monitor stopped");
}

fn go_offline(health: &watch::Sender<FeedHealth>, reason: OfflineReason) {
    tracing::debug!(%reason, "feed went offline");
    health.send_modify(|h| {
        h.state = FeedState::Offline(reason);
        h.fps = 0;
    });
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Frame source scripted from the test body.
    #[derive(Default)]
    struct ScriptedSource {
        tx: Mutex<Option<mpsc::Sender<FeedEvent>>>,
    }

    impl ScriptedSource {
        async fn emit(&self, event: FeedEvent) -> bool {
            let tx = self
                .tx
                .lock()
                .unwrap()
                .clone()
                .expect("source not attached");
            tx.send(event).await.is_ok()
        }
    }

    impl FrameSource for ScriptedSource {
        fn attach(&self, _url: &Url, events: mpsc::Sender<FeedEvent>, _cancel: CancellationToken) {
            *self.tx.lock().unwrap() = Some(events);
        }
    }

    fn bind(source: &ScriptedSource) -> StreamMonitor {
        StreamMonitor::bind(
            CameraId::numbered(1),
            Url::parse("http://192.168.0.150/stream").unwrap(),
            source,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn starts_loading() {
        let source = ScriptedSource::default();
        let monitor = bind(&source);
        assert_eq!(monitor.current_health().state, FeedState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn frame_while_loading_moves_online() {
        let source = ScriptedSource::default();
        let monitor = bind(&source);
        let mut health = monitor.health();

        assert!(source.emit(FeedEvent::Frame).await);

        let snap = health
            .wait_for(|h| h.state == FeedState::Online)
            .await
            .unwrap()
            .clone();
        assert!(snap.last_frame.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn fault_while_loading_goes_unavailable() {
        let source = ScriptedSource::default();
        let monitor = bind(&source);
        let mut health = monitor.health();

        assert!(source.emit(FeedEvent::Faulted).await);

        health
            .wait_for(|h| h.state == FeedState::Offline(OfflineReason::Unavailable))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn fault_while_online_goes_unavailable() {
        let source = ScriptedSource::default();
        let monitor = bind(&source);
        let mut health = monitor.health();

        assert!(source.emit(FeedEvent::Frame).await);
        health
            .wait_for(|h| h.state == FeedState::Online)
            .await
            .unwrap();

        assert!(source.emit(FeedEvent::Faulted).await);
        health
            .wait_for(|h| h.state == FeedState::Offline(OfflineReason::Unavailable))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn silence_while_online_goes_disconnected() {
        let source = ScriptedSource::default();
        let monitor = bind(&source);
        let mut health = monitor.health();

        assert!(source.emit(FeedEvent::Frame).await);
        health
            .wait_for(|h| h.state == FeedState::Online)
            .await
            .unwrap();

        // No frames for the full liveness window.
        let snap = health
            .wait_for(|h| matches!(h.state, FeedState::Offline(_)))
            .await
            .unwrap()
            .clone();
        assert_eq!(
            snap.state,
            FeedState::Offline(OfflineReason::Disconnected)
        );
        assert_eq!(snap.fps, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_keep_the_deadline_fresh() {
        let source = ScriptedSource::default();
        let monitor = bind(&source);
        let mut health = monitor.health();

        // Three frames, 3s apart — total span exceeds the 5s timeout but
        // no single gap does.
        for _ in 0..3 {
            assert!(source.emit(FeedEvent::Frame).await);
            health
                .wait_for(|h| h.state == FeedState::Online)
                .await
                .unwrap();
            tokio::time::advance(Duration::from_secs(3)).await;
        }

        assert_eq!(monitor.current_health().state, FeedState::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn fps_reports_frames_per_closed_window() {
        let source = ScriptedSource::default();
        let monitor = bind(&source);
        let mut health = monitor.health();

        for _ in 0..3 {
            assert!(source.emit(FeedEvent::Frame).await);
        }
        health
            .wait_for(|h| h.state == FeedState::Online)
            .await
            .unwrap();

        // Window closes at t=1s with three frames counted.
        let snap = health.wait_for(|h| h.fps == 3).await.unwrap().clone();
        assert_eq!(snap.state, FeedState::Online);

        // The next window saw no frames.
        health.wait_for(|h| h.fps == 0).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_detaches_the_source() {
        let source = ScriptedSource::default();
        let monitor = bind(&source);
        let mut health = monitor.health();

        assert!(source.emit(FeedEvent::Frame).await);
        health
            .wait_for(|h| h.state == FeedState::Online)
            .await
            .unwrap();

        monitor.shutdown();
        // Give the monitor task a chance to observe the cancellation.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        // The signal channel is gone; nothing can reach the session.
        assert!(!source.emit(FeedEvent::Frame).await);
        assert_eq!(monitor.current_health().state, FeedState::Online);
    }
}
