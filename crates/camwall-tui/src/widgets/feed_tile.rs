//! One camera tile — status dot, frame rate, last update, address.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph};

use camwall_core::{Camera, FeedHealth, FeedState};

use crate::theme;

/// Render one leaf of the partition tree.
pub fn render(
    frame: &mut Frame,
    area: Rect,
    camera: &Camera,
    health: Option<&FeedHealth>,
    selected: bool,
) {
    let (dot, color, label) = match health.map(|h| h.state) {
        Some(FeedState::Online) => ("●", theme::ONLINE_GREEN, "online".to_owned()),
        Some(FeedState::Loading) => ("◐", theme::LOADING_YELLOW, "loading".to_owned()),
        Some(FeedState::Offline(reason)) => ("○", theme::OFFLINE_RED, reason.to_string()),
        None => ("○", theme::DIM, "no address".to_owned()),
    };

    let border_style = if selected {
        Style::default().fg(theme::ACCENT)
    } else {
        Style::default().fg(theme::DIM)
    };
    let border_type = if selected {
        BorderType::Thick
    } else {
        BorderType::Rounded
    };

    let block = Block::bordered()
        .border_type(border_type)
        .border_style(border_style)
        .title(Span::styled(
            format!(" {} ", camera.id),
            Style::default().add_modifier(Modifier::BOLD),
        ));

    let mut lines = vec![Line::from(vec![
        Span::styled(dot, Style::default().fg(color)),
        Span::raw(" "),
        Span::styled(label, Style::default().fg(color)),
    ])];

    if let Some(health) = health {
        lines.push(Line::from(format!("{} FPS", health.fps)));
        let seen = health
            .last_frame
            .map_or_else(|| "--:--:--".to_owned(), |t| t.format("%H:%M:%S").to_string());
        lines.push(Line::from(vec![
            Span::styled("seen ", Style::default().fg(theme::DIM)),
            Span::raw(seen),
        ]));
    }

    if camera.address.is_empty() {
        lines.push(Line::from(Span::styled(
            "no address set",
            Style::default().fg(theme::DIM),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            camera.address.clone(),
            Style::default().fg(theme::DIM),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
