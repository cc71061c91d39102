//! CLI library components for the lab report host.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
