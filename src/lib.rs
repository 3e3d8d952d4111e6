pub mod api;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod tui;
