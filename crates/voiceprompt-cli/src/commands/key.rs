//! API key commands

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use voiceprompt_core::secrets::mask;

use super::Context;
use crate::output::{print_rows, print_success, print_warning};

#[derive(Subcommand)]
pub enum KeyAction {
    /// Store the API key for a provider
    Set {
        /// Provider id
        provider: String,

        /// API key
        key: String,
    },

    /// List providers and whether a key is stored (masked)
    List,

    /// Remove the API key of a provider
    Remove {
        /// Provider id
        provider: String,
    },
}

/// Key row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct KeyRow {
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Get One At")]
    pub help_url: String,
}

pub fn execute(ctx: &Context, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Set { provider, key } => set_key(ctx, &provider, &key),
        KeyAction::List => list_keys(ctx),
        KeyAction::Remove { provider } => remove_key(ctx, &provider),
    }
}

fn set_key(ctx: &Context, provider: &str, key: &str) -> Result<()> {
    if !ctx.app.quota.catalog().contains(provider) {
        bail!("Unknown provider: {}", provider);
    }

    ctx.app.keys.set(provider, key)?;
    print_success(&format!("Set {} key = {}", provider, mask(key.trim())), ctx.quiet);
    Ok(())
}

fn list_keys(ctx: &Context) -> Result<()> {
    let mut rows = Vec::new();
    for provider in ctx.app.quota.catalog().iter() {
        let key = ctx.app.keys.get(&provider.id)?;
        rows.push(KeyRow {
            provider: provider.id.clone(),
            key: key.as_deref().map(mask).unwrap_or_else(|| "-".to_string()),
            help_url: provider.help_url.clone(),
        });
    }

    print_rows(&rows, &rows, ctx.format, "No providers configured.")
}

fn remove_key(ctx: &Context, provider: &str) -> Result<()> {
    if ctx.app.keys.get(provider)?.is_none() {
        print_warning(&format!("No key stored for {}", provider), ctx.quiet);
        return Ok(());
    }

    ctx.app.keys.remove(provider)?;
    print_success(&format!("Removed {} key", provider), ctx.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;
    use voiceprompt_core::App;

    fn context(dir: &TempDir) -> Context {
        Context {
            app: App::open(dir.path()).unwrap(),
            data_dir: dir.path().to_path_buf(),
            format: OutputFormat::Table,
            quiet: true,
        }
    }

    #[test]
    fn test_set_and_remove_key() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        set_key(&ctx, "gemini", "  AIzaSy-test-1234  ").unwrap();
        assert_eq!(
            ctx.app.keys.get("gemini").unwrap().as_deref(),
            Some("AIzaSy-test-1234")
        );

        remove_key(&ctx, "gemini").unwrap();
        assert!(ctx.app.keys.get("gemini").unwrap().is_none());

        // removing twice only warns
        assert!(remove_key(&ctx, "gemini").is_ok());
    }

    #[test]
    fn test_set_key_unknown_provider() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        assert!(set_key(&ctx, "foo", "sk-123456789").is_err());
        assert!(ctx.app.keys.get("foo").unwrap().is_none());
    }
}
