//! API key storage
//!
//! Keys are kept in the shared key-value store under `api_key:<provider>`.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;

const KEY_PREFIX: &str = "api_key:";

/// Per-provider API key store
#[derive(Clone)]
pub struct ApiKeyStore {
    backend: Arc<dyn KeyValueStore>,
}

impl ApiKeyStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store the API key for a provider
    pub fn set(&self, provider_id: &str, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::validation("API key must not be empty"));
        }
        self.backend.set(&storage_key(provider_id), api_key)?;
        log::info!("[secrets] Stored API key for {}", provider_id);
        Ok(())
    }

    /// API key for a provider, if one was stored
    pub fn get(&self, provider_id: &str) -> Result<Option<String>> {
        Ok(self
            .backend
            .get(&storage_key(provider_id))?
            .filter(|k| !k.is_empty()))
    }

    /// API key for a provider, or an error telling the user to set one
    pub fn require(&self, provider_id: &str) -> Result<String> {
        self.get(provider_id)?.ok_or_else(|| {
            Error::not_found(format!(
                "no API key for {}; set the API key for {} first",
                provider_id, provider_id
            ))
        })
    }

    pub fn remove(&self, provider_id: &str) -> Result<()> {
        self.backend.remove(&storage_key(provider_id))?;
        log::info!("[secrets] Removed API key for {}", provider_id);
        Ok(())
    }

    /// Provider ids that have a key stored
    pub fn providers(&self) -> Result<Vec<String>> {
        Ok(self
            .backend
            .keys_with_prefix(KEY_PREFIX)?
            .into_iter()
            .filter_map(|k| k.strip_prefix(KEY_PREFIX).map(str::to_string))
            .collect())
    }
}

fn storage_key(provider_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, provider_id)
}

/// Mask an API key for display, keeping the last four characters of
/// long keys
pub fn mask(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    match chars.len() {
        0 => "-".to_string(),
        n if n <= 8 => "****".to_string(),
        n => format!("****{}", chars[n - 4..].iter().collect::<String>()),
    }
}
