//! Pomodoro CLI library.
//!
//! This crate provides the CLI interface for the pomodoro tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::{Backend, Config};
