//! CLI module for the jewel-studio binary
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, Cli, CliOutputFormat, Command, EditArgs, PipelineToggles};
