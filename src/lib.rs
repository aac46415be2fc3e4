//! Project-area map in the terminal.
//!
//! Map components ([`components`]) register sources, layers and listeners
//! on a [`engine::MapHandle`] through a [`registry::MapRegistry`]; the
//! bundled [`engine::TerminalMap`] draws them with Braille characters.

pub mod api;
pub mod app;
pub mod braille;
pub mod components;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod geo;
pub mod logging;
pub mod registry;
pub mod theme;
pub mod ui;
pub mod utils;
