//! Provider commands
//!
//! Browse the provider catalog and model lists.

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use voiceprompt_core::utils::format_number;
use voiceprompt_core::{ModelInfo, ProviderInfo};

use super::Context;
use crate::output::print_rows;

#[derive(Subcommand)]
pub enum ProvidersAction {
    /// List providers with their free-tier plans
    List,

    /// List models, optionally for a single provider
    Models {
        /// Provider id
        provider: Option<String>,
    },
}

/// Provider row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ProviderRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Plan")]
    pub plan: String,
    #[tabled(rename = "Free Tier")]
    pub free_tier: String,
    #[tabled(rename = "API Key")]
    pub api_key: String,
}

/// Model row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ModelRow {
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[tabled(rename = "Model")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Free Forever")]
    pub free_forever: String,
    #[tabled(rename = "Selected")]
    pub selected: String,
}

pub fn execute(ctx: &Context, action: ProvidersAction) -> Result<()> {
    match action {
        ProvidersAction::List => list_providers(ctx),
        ProvidersAction::Models { provider } => list_models(ctx, provider),
    }
}

fn provider_row(provider: &ProviderInfo, has_key: bool) -> ProviderRow {
    ProviderRow {
        id: provider.id.clone(),
        name: provider.name.clone(),
        plan: format!(
            "{} {} {}",
            provider.plan.kind,
            format_number(provider.plan.limit),
            provider.plan.unit
        ),
        free_tier: provider.free_tier.clone(),
        api_key: if has_key { "set" } else { "-" }.to_string(),
    }
}

fn model_row(ctx: &Context, provider: &ProviderInfo, model: &ModelInfo) -> ModelRow {
    let selected = provider.id == ctx.app.config.default_provider
        && model.id == ctx.app.config.default_model;

    ModelRow {
        provider: provider.id.clone(),
        id: model.id.clone(),
        name: model.name.clone(),
        free_forever: if model.free_forever { "yes" } else { "" }.to_string(),
        selected: if selected { "*" } else { "" }.to_string(),
    }
}

fn list_providers(ctx: &Context) -> Result<()> {
    let catalog = ctx.app.quota.catalog();
    let with_keys = ctx.app.keys.providers()?;

    let rows: Vec<ProviderRow> = catalog
        .iter()
        .map(|p| provider_row(p, with_keys.contains(&p.id)))
        .collect();
    let data: Vec<&ProviderInfo> = catalog.iter().collect();

    print_rows(&rows, &data, ctx.format, "No providers configured.")
}

fn list_models(ctx: &Context, provider: Option<String>) -> Result<()> {
    let catalog = ctx.app.quota.catalog();

    let providers: Vec<&ProviderInfo> = match provider {
        Some(id) => match catalog.get(&id) {
            Some(p) => vec![p],
            None => bail!("Unknown provider: {}", id),
        },
        None => catalog.iter().collect(),
    };

    let rows: Vec<ModelRow> = providers
        .iter()
        .flat_map(|p| p.models.iter().map(move |m| (*p, m)))
        .map(|(p, m)| model_row(ctx, p, m))
        .collect();
    let data: Vec<&ModelInfo> = providers.iter().flat_map(|p| p.models.iter()).collect();

    print_rows(&rows, &data, ctx.format, "No models found.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use voiceprompt_core::ProviderCatalog;

    #[test]
    fn test_provider_row() {
        let catalog = ProviderCatalog::builtin();
        let row = provider_row(catalog.get("siliconflow").unwrap(), true);
        assert_eq!(row.plan, "one-time 20.0M tokens");
        assert_eq!(row.api_key, "set");

        let row = provider_row(catalog.get("openrouter").unwrap(), false);
        assert_eq!(row.plan, "daily 50 calls/day");
        assert_eq!(row.api_key, "-");
    }
}
