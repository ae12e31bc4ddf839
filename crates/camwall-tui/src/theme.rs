//! Color palette for the wall.

use ratatui::style::Color;

pub const ONLINE_GREEN: Color = Color::Rgb(80, 250, 123);
pub const OFFLINE_RED: Color = Color::Rgb(255, 85, 85);
pub const LOADING_YELLOW: Color = Color::Rgb(241, 250, 140);
pub const ACCENT: Color = Color::Rgb(139, 233, 253);
pub const DIM: Color = Color::Rgb(98, 114, 164);
