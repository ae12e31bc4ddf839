//! Application core — event loop, monitor management, rendering.
//!
//! The wall redraws on a render tick; between ticks, bridge actions keep
//! the camera snapshot current and each [`StreamMonitor`] bound to the
//! right feed URL. Monitors are rebound whenever a camera's address
//! changes and dropped when the camera goes away — the old session's
//! timers and fetcher die with it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use camwall_core::layout::{SplitAxis, Tile, build_layout};
use camwall_core::{Camera, CameraId, Notice, StreamMonitor, Wall};
use camwall_net::{ConnectionStatus, HttpFrameSource};

use crate::action::Action;
use crate::data_bridge::run_data_bridge;
use crate::event::{Event, EventReader};
use crate::theme;
use crate::tui::Tui;
use crate::widgets::feed_tile;

const MAX_TOASTS: usize = 4;

/// Top-level application state and event loop.
pub struct App {
    wall: Wall,
    source: HttpFrameSource,

    /// Current order-sorted camera snapshot.
    cameras: Arc<Vec<Camera>>,
    /// Partition tree, rebuilt in full whenever the snapshot changes.
    layout: Option<Tile>,
    /// One live monitor per camera with a bound address.
    monitors: HashMap<CameraId, StreamMonitor>,
    /// Selection index into `cameras`.
    selected: usize,
    /// Recent notices, newest first.
    toasts: VecDeque<(DateTime<Utc>, String)>,
    bus_status: ConnectionStatus,

    running: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(wall: Wall, source: HttpFrameSource) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            wall,
            source,
            cameras: Arc::new(Vec::new()),
            layout: None,
            monitors: HashMap::new(),
            selected: 0,
            toasts: VecDeque::new(),
            bus_status: ConnectionStatus::Disconnected,
            running: true,
            action_tx,
            action_rx,
        }
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        let bridge_cancel = CancellationToken::new();
        tokio::spawn(run_data_bridge(
            self.wall.clone(),
            self.action_tx.clone(),
            bridge_cancel.clone(),
        ));

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(100), // 10 FPS render
        );

        info!("wall event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = map_key(key) {
                        let _ = self.action_tx.send(action);
                    }
                }
                Event::Resize(w, h) => {
                    let _ = self.action_tx.send(Action::Resize(w, h));
                }
                Event::Tick => {
                    let _ = self.action_tx.send(Action::Tick);
                }
                Event::Render => {
                    let _ = self.action_tx.send(Action::Render);
                }
            }

            // Drain and process all queued actions.
            while let Ok(action) = self.action_rx.try_recv() {
                let render = matches!(action, Action::Render);
                self.process_action(action);
                if render {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        bridge_cancel.cancel();
        events.stop();
        info!("wall event loop ended");
        Ok(())
    }

    // ── Action processing ────────────────────────────────────────────

    fn process_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,

            Action::AddCamera => {
                let camera = self.wall.store().add_blank();
                info!(camera = %camera.id, "camera added manually");
            }

            Action::DeleteSelected => {
                if let Some(camera) = self.cameras.get(self.selected) {
                    if let Err(e) = self.wall.store().remove(&camera.id) {
                        warn!(error = %e, "delete failed");
                    }
                }
            }

            Action::ClearAll => {
                self.wall.store().clear();
            }

            Action::SelectNext => {
                if !self.cameras.is_empty() {
                    self.selected = (self.selected + 1) % self.cameras.len();
                }
            }

            Action::SelectPrev => {
                if !self.cameras.is_empty() {
                    self.selected =
                        (self.selected + self.cameras.len() - 1) % self.cameras.len();
                }
            }

            Action::MoveSelectedForward => self.swap_with_neighbor(1),
            Action::MoveSelectedBack => self.swap_with_neighbor(-1),

            Action::CamerasUpdated(snapshot) => {
                self.cameras = snapshot;
                self.layout = build_layout(&self.cameras);
                if self.selected >= self.cameras.len() {
                    self.selected = self.cameras.len().saturating_sub(1);
                }
                self.sync_monitors();
            }

            Action::Notice(notice) => {
                if let Notice::Bus(status) = &notice {
                    self.bus_status = *status;
                }
                self.toasts.push_front((Utc::now(), notice.to_string()));
                self.toasts.truncate(MAX_TOASTS);
            }

            Action::Resize(_, _) | Action::Tick | Action::Render => {}
        }
    }

    /// Swap the selected camera's rank with a neighbor in display order.
    fn swap_with_neighbor(&mut self, offset: isize) {
        let Some(current) = self.cameras.get(self.selected) else {
            return;
        };
        let Some(neighbor_index) = self.selected.checked_add_signed(offset) else {
            return;
        };
        let Some(neighbor) = self.cameras.get(neighbor_index) else {
            return;
        };

        if let Err(e) = self.wall.store().swap_order(&current.id, &neighbor.id) {
            warn!(error = %e, "reorder failed");
        } else {
            self.selected = neighbor_index;
        }
    }

    // ── Monitor lifecycle ────────────────────────────────────────────

    /// Bind/rebind/drop monitors so they mirror the current snapshot.
    fn sync_monitors(&mut self) {
        let mut desired: HashMap<CameraId, Url> = HashMap::new();
        for camera in self.cameras.iter() {
            if camera.address.is_empty() {
                continue;
            }
            match camera.address.parse() {
                Ok(url) => {
                    desired.insert(camera.id.clone(), url);
                }
                Err(e) => {
                    warn!(camera = %camera.id, address = %camera.address, error = %e, "unusable feed address");
                }
            }
        }

        // Dropping a monitor cancels its timers and its frame source.
        self.monitors
            .retain(|id, monitor| desired.get(id) == Some(monitor.url()));

        for (id, url) in desired {
            if !self.monitors.contains_key(&id) {
                let monitor = StreamMonitor::bind(id.clone(), url, &self.source);
                self.monitors.insert(id, monitor);
            }
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut ratatui::Frame) {
        let chunks = Layout::new(
            Direction::Vertical,
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(u16::try_from(self.toasts.len()).unwrap_or(0) + 1),
            ],
        )
        .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_wall(frame, chunks[1]);
        self.render_footer(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut ratatui::Frame, area: Rect) {
        let status_color = match self.bus_status {
            ConnectionStatus::Connected => theme::ONLINE_GREEN,
            ConnectionStatus::Connecting => theme::LOADING_YELLOW,
            ConnectionStatus::Disconnected | ConnectionStatus::Error => theme::OFFLINE_RED,
        };

        let line = Line::from(vec![
            Span::styled(" camwall ", Style::default().fg(theme::ACCENT)),
            Span::styled(
                format!("· {} cameras ", self.cameras.len()),
                Style::default().fg(theme::DIM),
            ),
            Span::styled(
                format!("· bus {} ", self.bus_status),
                Style::default().fg(status_color),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_wall(&self, frame: &mut ratatui::Frame, area: Rect) {
        match &self.layout {
            Some(tile) => self.render_tile(frame, tile, area),
            None => {
                let hint = Paragraph::new(Line::from(Span::styled(
                    "no cameras — press a to add one, or wait for discovery",
                    Style::default().fg(theme::DIM),
                )));
                frame.render_widget(hint, area);
            }
        }
    }

    /// Walk the partition tree, carving the area 50/50 at each split.
    fn render_tile(&self, frame: &mut ratatui::Frame, tile: &Tile, area: Rect) {
        match tile {
            Tile::Leaf { camera } => {
                let Some(cam) = self.cameras.iter().find(|c| c.id == *camera) else {
                    return;
                };
                let health = self.monitors.get(camera).map(StreamMonitor::current_health);
                let selected = self
                    .cameras
                    .get(self.selected)
                    .is_some_and(|c| c.id == *camera);
                feed_tile::render(frame, area, cam, health.as_ref(), selected);
            }

            Tile::Split { axis, children } => {
                // Our Vertical split puts children side by side, which is
                // ratatui's Horizontal direction.
                let direction = match axis {
                    SplitAxis::Vertical => Direction::Horizontal,
                    SplitAxis::Horizontal => Direction::Vertical,
                };
                let [first, second] = children.as_ref();
                let areas = Layout::new(
                    direction,
                    [
                        Constraint::Percentage(u16::from(first.share)),
                        Constraint::Percentage(u16::from(second.share)),
                    ],
                )
                .split(area);

                self.render_tile(frame, &first.tile, areas[0]);
                self.render_tile(frame, &second.tile, areas[1]);
            }
        }
    }

    fn render_footer(&self, frame: &mut ratatui::Frame, area: Rect) {
        let mut lines = vec![Line::from(Span::styled(
            " q quit · a add · d delete · c clear · ←/→ select · [/] reorder",
            Style::default().fg(theme::DIM),
        ))];

        for (when, text) in &self.toasts {
            lines.push(Line::from(vec![
                Span::styled(
                    format!(" {} ", when.format("%H:%M:%S")),
                    Style::default().fg(theme::DIM),
                ),
                Span::raw(text.clone()),
            ]));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }
}

/// Map a key press to an action. `None` means the key is unbound.
fn map_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('a') => Some(Action::AddCamera),
        KeyCode::Char('d') | KeyCode::Delete => Some(Action::DeleteSelected),
        KeyCode::Char('c') => Some(Action::ClearAll),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::SelectNext),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::SelectPrev),
        KeyCode::Char(']') => Some(Action::MoveSelectedForward),
        KeyCode::Char('[') => Some(Action::MoveSelectedBack),
        _ => None,
    }
}
