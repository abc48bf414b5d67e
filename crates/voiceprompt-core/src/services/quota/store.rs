//! Quota storage layer
//!
//! Keeps the provider-to-record mapping in memory and writes it through to
//! the key-value backend under [`QUOTA_STORAGE_KEY`]. Every read or write
//! of a record goes through [`QuotaStore::evaluate_reset_at`], which applies
//! the daily reset before the counter is looked at.

use std::collections::btree_map::Entry;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::policy;
use super::types::{QuotaMap, QuotaRecord, QuotaSnapshot};
use crate::providers::{PlanKind, ProviderPlan};
use crate::storage::KeyValueStore;

/// Storage key of the persisted quota mapping
pub const QUOTA_STORAGE_KEY: &str = "quota:v1";

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while reading or writing persisted quota state
///
/// These never leave the store: corruption degrades to an empty mapping
/// and write failures degrade to in-memory tracking.
#[derive(Error, Debug)]
pub enum QuotaError {
    /// Persisted value is not a valid quota mapping
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Backend refused the read or write
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<serde_json::Error> for QuotaError {
    fn from(err: serde_json::Error) -> Self {
        QuotaError::ParseError(err.to_string())
    }
}

impl From<crate::error::Error> for QuotaError {
    fn from(err: crate::error::Error) -> Self {
        QuotaError::StorageError(err.to_string())
    }
}

/// Parse the persisted quota mapping
pub fn parse_records(raw: &str) -> Result<QuotaMap, QuotaError> {
    Ok(serde_json::from_str(raw)?)
}

/// Serialize the quota mapping; output is stable for equal mappings
pub fn serialize_records(records: &QuotaMap) -> Result<String, QuotaError> {
    Ok(serde_json::to_string(records)?)
}

/// Whether a daily counter last zeroed at `last_reset` is due for a reset
///
/// Both instants are truncated to their UTC date; a reset is due once
/// `now` falls on a later date.
fn reset_due(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.date_naive() > last_reset.date_naive()
}

// ============================================================================
// QuotaStore
// ============================================================================

/// Durable provider-to-record mapping with lazy daily resets
///
/// Mutating methods take `&mut self`; callers sharing a store across
/// threads wrap it in a `Mutex` so each reset-then-mutate runs atomically.
pub struct QuotaStore {
    backend: Arc<dyn KeyValueStore>,
    records: QuotaMap,
}

impl QuotaStore {
    /// Open the store, loading whatever state the backend holds
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let records = Self::read(backend.as_ref()).unwrap_or_else(|e| {
            log::warn!("[quota:store] Ignoring unreadable quota state: {}", e);
            QuotaMap::new()
        });

        log::debug!("[quota:store] Loaded {} quota records", records.len());

        Self { backend, records }
    }

    fn read(backend: &dyn KeyValueStore) -> Result<QuotaMap, QuotaError> {
        match backend.get(QUOTA_STORAGE_KEY)? {
            Some(raw) => parse_records(&raw),
            None => Ok(QuotaMap::new()),
        }
    }

    /// Read the persisted mapping
    ///
    /// Missing or corrupt data yields an empty mapping; the caller merges it
    /// with per-provider defaults.
    pub fn load(&self) -> QuotaMap {
        Self::read(self.backend.as_ref()).unwrap_or_else(|e| {
            log::warn!("[quota:store] Treating quota state as empty: {}", e);
            QuotaMap::new()
        })
    }

    /// Replace the in-memory mapping and write it to the backend
    ///
    /// Write failures are logged; the in-memory mapping stays authoritative.
    pub fn save(&mut self, records: QuotaMap) {
        self.records = records;
        self.persist();
    }

    fn persist(&self) {
        let result = serialize_records(&self.records).and_then(|json| {
            self.backend
                .set(QUOTA_STORAGE_KEY, &json)
                .map_err(QuotaError::from)
        });

        if let Err(e) = result {
            log::error!(
                "[quota:store] Failed to persist quota state, continuing in memory: {}",
                e
            );
        }
    }

    /// In-memory mapping
    pub fn records(&self) -> &QuotaMap {
        &self.records
    }

    /// Record of a provider without creating or resetting it
    pub fn peek(&self, provider_id: &str) -> Option<&QuotaRecord> {
        self.records.get(provider_id)
    }

    /// Apply the pending reset for a provider and return its record
    pub fn evaluate_reset(&mut self, provider_id: &str, kind: PlanKind) -> QuotaRecord {
        self.evaluate_reset_at(provider_id, kind, Utc::now())
    }

    /// [`evaluate_reset`](Self::evaluate_reset) at a given instant
    ///
    /// Creates the default record on first touch. For daily plans a record
    /// whose `last_reset` falls on an earlier UTC date is zeroed and stamped
    /// with `now`. One-time plans never reset.
    pub fn evaluate_reset_at(
        &mut self,
        provider_id: &str,
        kind: PlanKind,
        now: DateTime<Utc>,
    ) -> QuotaRecord {
        let (record, changed) = self.gate(provider_id, kind, now);
        let record = record.clone();
        if changed {
            self.persist();
        }
        record
    }

    fn gate(
        &mut self,
        provider_id: &str,
        kind: PlanKind,
        now: DateTime<Utc>,
    ) -> (&mut QuotaRecord, bool) {
        let mut changed = false;

        let record = match self.records.entry(provider_id.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                log::debug!("[quota:store] Creating quota record for {}", provider_id);
                changed = true;
                entry.insert(QuotaRecord::fresh(kind, now))
            }
        };

        if kind == PlanKind::Daily {
            match record.last_reset {
                Some(last_reset) if reset_due(last_reset, now) => {
                    log::info!(
                        "[quota:store] Daily reset for {} (used {} since {})",
                        provider_id,
                        record.used,
                        last_reset.to_rfc3339()
                    );
                    record.used = 0;
                    record.last_reset = Some(now);
                    changed = true;
                }
                Some(_) => {}
                None => {
                    // Daily records always carry a reset stamp once touched
                    record.last_reset = Some(now);
                    changed = true;
                }
            }
        } else if record.last_reset.is_some() {
            // One-time records never carry a reset stamp
            log::debug!("[quota:store] Clearing reset stamp of one-time record {}", provider_id);
            record.last_reset = None;
            changed = true;
        }

        (record, changed)
    }

    /// Add `count` units for a provider
    pub fn increment(&mut self, provider_id: &str, plan: &ProviderPlan, count: u64) -> QuotaSnapshot {
        self.increment_at(provider_id, plan, count, Utc::now())
    }

    /// [`increment`](Self::increment) at a given instant
    ///
    /// Applies the reset gate first, then adds `count`, persists, and
    /// returns the refreshed snapshot.
    pub fn increment_at(
        &mut self,
        provider_id: &str,
        plan: &ProviderPlan,
        count: u64,
        now: DateTime<Utc>,
    ) -> QuotaSnapshot {
        let record = {
            let (record, _) = self.gate(provider_id, plan.kind, now);
            record.used = record.used.saturating_add(count);
            record.clone()
        };
        self.persist();

        log::debug!(
            "[quota:store] Recorded {} for {} (used {}/{})",
            count,
            provider_id,
            record.used,
            plan.limit
        );

        policy::snapshot(provider_id, Some(&record), Some(plan))
    }

    /// Delete all persisted quota state
    pub fn wipe(&mut self) {
        self.records.clear();
        if let Err(e) = self.backend.remove(QUOTA_STORAGE_KEY) {
            log::error!("[quota:store] Failed to delete quota state: {}", e);
        }
        log::info!("[quota:store] Wiped all quota records");
    }
}

// ============================================================================
// Tests
// ============================================================================
