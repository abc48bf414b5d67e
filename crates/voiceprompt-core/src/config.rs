//! Application configuration
//!
//! Resolves the data directory and loads the optional `config.json`
//! that selects the default model and overrides provider plans.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::providers::{ProviderCatalog, ProviderPlan, DEFAULT_MODEL, DEFAULT_PROVIDER};

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "VOICEPROMPT_DATA_DIR";

/// Config file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// User configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_provider: String,
    pub default_model: String,
    /// Plan overrides keyed by provider id
    pub providers: BTreeMap<String, ProviderPlan>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            providers: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load `config.json` from `data_dir`
    ///
    /// A missing file yields the defaults. An unreadable or malformed file
    /// also yields the defaults, with a warning.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE_NAME);
        match Self::read(&path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!(
                    "[config] Falling back to defaults, failed to load {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&raw)?;
        Ok(Some(config))
    }

    /// Write the config to `data_dir/config.json`
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(data_dir.join(CONFIG_FILE_NAME), json)?;
        Ok(())
    }

    /// Built-in catalog with this config's plan overrides applied
    pub fn catalog(&self) -> ProviderCatalog {
        let mut catalog = ProviderCatalog::builtin();
        for (id, plan) in &self.providers {
            catalog.apply_plan_override(id, plan.clone());
        }
        catalog
    }
}

/// Resolve the data directory
///
/// `VOICEPROMPT_DATA_DIR` wins (with `~` expanded); otherwise the
/// platform data directory is used.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return Ok(expand_path(&path));
        }
    }

    let dirs = directories::ProjectDirs::from("com", "voiceprompt", "VoicePrompt")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;

    Ok(dirs.data_dir().to_path_buf())
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
