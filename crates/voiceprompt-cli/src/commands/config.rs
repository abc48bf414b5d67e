//! Config commands
//!
//! Show where VoicePrompt keeps its state and what it is configured to use.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use voiceprompt_core::config::{CONFIG_FILE_NAME, DATA_DIR_ENV};

use super::Context;
use crate::output::{print_info, print_rows};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a single configuration value
    Get {
        /// Configuration key
        key: String,
    },
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

pub fn execute(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(ctx),
        ConfigAction::Get { key } => get_config(ctx, &key),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let rows = get_all_config(ctx);
    print_rows(&rows, &rows, ctx.format, "No configuration.")
}

fn get_config(ctx: &Context, key: &str) -> Result<()> {
    let rows = get_all_config(ctx);

    match rows.iter().find(|r| r.key.eq_ignore_ascii_case(key)) {
        Some(row) => {
            print_info(&format!("{} = {}", row.key, row.value), false);
            Ok(())
        }
        None => anyhow::bail!(
            "Config key not found: {}. Available keys: {}",
            key,
            rows.iter().map(|r| r.key.as_str()).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn get_all_config(ctx: &Context) -> Vec<ConfigRow> {
    let config_path = ctx.data_dir.join(CONFIG_FILE_NAME);
    let config_source = if config_path.exists() { "file" } else { "default" };

    let mut rows = vec![
        ConfigRow {
            key: "data_dir".to_string(),
            value: ctx.data_dir.display().to_string(),
            source: if std::env::var(DATA_DIR_ENV).is_ok() { "env" } else { "default" }
                .to_string(),
        },
        ConfigRow {
            key: "storage_file".to_string(),
            value: ctx.app.storage.path().display().to_string(),
            source: "derived".to_string(),
        },
        ConfigRow {
            key: "config_file".to_string(),
            value: config_path.display().to_string(),
            source: if config_path.exists() { "present" } else { "missing" }.to_string(),
        },
        ConfigRow {
            key: "default_provider".to_string(),
            value: ctx.app.config.default_provider.clone(),
            source: config_source.to_string(),
        },
        ConfigRow {
            key: "default_model".to_string(),
            value: ctx.app.config.default_model.clone(),
            source: config_source.to_string(),
        },
    ];

    for (id, plan) in &ctx.app.config.providers {
        rows.push(ConfigRow {
            key: format!("providers.{}", id),
            value: format!("{} {} {}", plan.kind, plan.limit, plan.unit),
            source: "file".to_string(),
        });
    }

    rows
}
