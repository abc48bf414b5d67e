//! # voiceprompt-core
//!
//! Core logic for VoicePrompt - turning dictated speech into structured
//! prompts through free-tier LLM providers.
//!
//! This crate provides:
//! - Provider catalog and free-tier plans (`providers` module)
//! - Local quota tracking (`services::quota` module)
//! - Key-value persistence (`storage` module)
//! - API key storage (`secrets` module)
//! - Configuration and data directory resolution (`config` module)
//! - Unified error handling (`error` module)

pub mod config;
pub mod error;
pub mod providers;
pub mod secrets;
pub mod services;
pub mod storage;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

// Re-exports for convenience
pub use config::{get_data_dir, AppConfig};
pub use error::{Error, Result};
pub use providers::{ModelInfo, PlanKind, ProviderCatalog, ProviderInfo, ProviderPlan};
pub use secrets::ApiKeyStore;
pub use services::{
    Denial, DenialReason, QuotaRecord, QuotaSnapshot, QuotaStore, QuotaTracker, UsageLevel,
    Verdict,
};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use utils::{format_number, format_time, format_time_until};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}

/// Everything a front end needs, wired to one data directory
pub struct App {
    pub config: AppConfig,
    pub quota: QuotaTracker,
    pub keys: ApiKeyStore,
    pub storage: Arc<FileKeyValueStore>,
}

impl App {
    /// Open the data directory, creating it if needed
    pub fn open(data_dir: &Path) -> Result<Self> {
        log::debug!("Opening data directory {}", data_dir.display());

        let config = AppConfig::load(data_dir);
        let storage = Arc::new(FileKeyValueStore::open(
            data_dir.join(storage::STORAGE_FILE_NAME),
        )?);
        let backend: Arc<dyn KeyValueStore> = storage.clone();

        Ok(Self {
            quota: QuotaTracker::open(backend.clone(), config.catalog()),
            keys: ApiKeyStore::new(backend),
            config,
            storage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_version_format() {
        let v = version();
        // Should be semver format: x.y.z
        let parts: Vec<&str> = v.split('.').collect();
        assert_eq!(parts.len(), 3, "Version should be in x.y.z format");
    }

    #[test]
    fn test_app_open_shares_storage() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = App::open(dir.path()).unwrap();

        app.keys.set("groq", "gsk_test_key").unwrap();
        app.quota.record_usage("groq", 2).unwrap();

        let reopened = App::open(dir.path()).unwrap();
        assert_eq!(reopened.keys.get("groq").unwrap(), Some("gsk_test_key".to_string()));
        assert_eq!(reopened.quota.store().peek("groq").unwrap().used, 2);
    }
}
