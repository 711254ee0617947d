//! # Stagebook application
//!
//! HTTP API, CLI and configuration around `stagebook-core`.

pub mod api;
pub mod cli;
pub mod config;
