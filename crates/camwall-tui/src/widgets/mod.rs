//! Reusable render helpers.

pub mod feed_tile;
