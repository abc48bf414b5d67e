//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod config;
pub mod key;
pub mod providers;
pub mod quota;

use std::path::PathBuf;

use crate::output::OutputFormat;
use voiceprompt_core::App;

/// Shared context for all commands
pub struct Context {
    pub app: App,
    pub data_dir: PathBuf,
    pub format: OutputFormat,
    pub quiet: bool,
}
