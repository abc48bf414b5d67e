//! VoicePrompt CLI - provider keys and free-tier quota tracking
//!
//! A command-line interface for inspecting provider quotas, guarding
//! completion calls with admission checks, and managing API keys.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "voiceprompt")]
#[command(author, version, about = "Free-tier quota and API key manager for VoicePrompt", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Override data directory (or set VOICEPROMPT_DATA_DIR env var)
    #[arg(long, env = "VOICEPROMPT_DATA_DIR", global = true)]
    data_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and record free-tier usage
    Quota {
        #[command(subcommand)]
        action: commands::quota::QuotaAction,
    },

    /// List providers and their models
    Providers {
        #[command(subcommand)]
        action: commands::providers::ProvidersAction,
    },

    /// Manage provider API keys
    Key {
        #[command(subcommand)]
        action: commands::key::KeyAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // Resolve data directory
    let data_dir = match &cli.data_dir {
        Some(path) => voiceprompt_core::config::expand_path(path),
        None => voiceprompt_core::get_data_dir()?,
    };

    let app = voiceprompt_core::App::open(&data_dir)?;

    // Create context for commands
    let mut ctx = commands::Context {
        app,
        data_dir,
        format: cli.format,
        quiet: cli.quiet,
    };

    // Execute command
    match cli.command {
        Commands::Quota { action } => commands::quota::execute(&mut ctx, action),
        Commands::Providers { action } => commands::providers::execute(&ctx, action),
        Commands::Key { action } => commands::key::execute(&ctx, action),
        Commands::Config { action } => commands::config::execute(&ctx, action),
    }
}
