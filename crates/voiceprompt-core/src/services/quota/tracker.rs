//! Quota tracker
//!
//! Entry point used before and after every optimization request. Ties the
//! [`QuotaStore`] to the provider catalog so callers only deal in provider
//! ids.
//!
//! The expected call order around a completion request is:
//!
//! 1. [`QuotaTracker::check_quota`] and bail out unless it is `Allowed`
//! 2. issue the request
//! 3. [`QuotaTracker::record_usage`] only if the request succeeded

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::policy;
use super::store::QuotaStore;
use super::types::{Denial, QuotaSnapshot, Verdict};
use crate::error::{Error, Result};
use crate::providers::ProviderCatalog;
use crate::storage::KeyValueStore;

/// Advisory client-side free-tier guard
pub struct QuotaTracker {
    store: QuotaStore,
    catalog: ProviderCatalog,
}

impl QuotaTracker {
    pub fn new(store: QuotaStore, catalog: ProviderCatalog) -> Self {
        Self { store, catalog }
    }

    /// Open a tracker over a key-value backend
    pub fn open(backend: Arc<dyn KeyValueStore>, catalog: ProviderCatalog) -> Self {
        Self::new(QuotaStore::open(backend), catalog)
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &QuotaStore {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Admission
    // ------------------------------------------------------------------------

    /// Can `estimated` units be spent on `provider_id` right now?
    pub fn check_quota(&mut self, provider_id: &str, estimated: u64) -> Verdict {
        self.check_quota_at(provider_id, estimated, Utc::now())
    }

    pub fn check_quota_at(
        &mut self,
        provider_id: &str,
        estimated: u64,
        now: DateTime<Utc>,
    ) -> Verdict {
        let Some(plan) = self.catalog.plan(provider_id).cloned() else {
            log::debug!("[quota:policy] Denied {}: unknown provider", provider_id);
            return Verdict::Denied(Denial::unknown_provider());
        };

        let record = self.store.evaluate_reset_at(provider_id, plan.kind, now);
        let snapshot = policy::snapshot(provider_id, Some(&record), Some(&plan));
        let verdict = policy::admit(&snapshot, estimated, policy::next_refresh(&record, plan.kind));

        if let Some(denial) = verdict.denial() {
            log::info!(
                "[quota:policy] Denied {} x{}: {}",
                provider_id,
                estimated,
                denial.notice()
            );
        }

        verdict
    }

    /// Admission check for a specific model
    ///
    /// Free-forever models are always allowed; other models follow
    /// [`check_quota`](Self::check_quota).
    pub fn check_model(&mut self, provider_id: &str, model_id: &str, estimated: u64) -> Verdict {
        self.check_model_at(provider_id, model_id, estimated, Utc::now())
    }

    pub fn check_model_at(
        &mut self,
        provider_id: &str,
        model_id: &str,
        estimated: u64,
        now: DateTime<Utc>,
    ) -> Verdict {
        if self.is_free_forever(provider_id, model_id) {
            let snapshot = self.get_snapshot_at(provider_id, now);
            return Verdict::Allowed {
                remaining: snapshot.remaining,
            };
        }
        self.check_quota_at(provider_id, estimated, now)
    }

    /// Whether a model can be picked: its provider still has capacity, or
    /// the model does not consume any
    pub fn is_selectable(&mut self, provider_id: &str, model_id: &str) -> bool {
        self.is_selectable_at(provider_id, model_id, Utc::now())
    }

    pub fn is_selectable_at(&mut self, provider_id: &str, model_id: &str, now: DateTime<Utc>) -> bool {
        self.catalog.model(provider_id, model_id).is_some()
            && self.check_model_at(provider_id, model_id, 1, now).is_allowed()
    }

    fn is_free_forever(&self, provider_id: &str, model_id: &str) -> bool {
        self.catalog
            .model(provider_id, model_id)
            .map(|m| m.free_forever)
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------------

    /// Record `count` units after a successful completion call
    pub fn record_usage(&mut self, provider_id: &str, count: u64) -> Result<QuotaSnapshot> {
        self.record_usage_at(provider_id, count, Utc::now())
    }

    pub fn record_usage_at(
        &mut self,
        provider_id: &str,
        count: u64,
        now: DateTime<Utc>,
    ) -> Result<QuotaSnapshot> {
        let plan = self
            .catalog
            .plan(provider_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("unknown provider: {}", provider_id)))?;

        Ok(self.store.increment_at(provider_id, &plan, count, now))
    }

    /// Record usage of a specific model; free-forever models are not counted
    pub fn record_model_usage(
        &mut self,
        provider_id: &str,
        model_id: &str,
        count: u64,
    ) -> Result<QuotaSnapshot> {
        self.record_model_usage_at(provider_id, model_id, count, Utc::now())
    }

    pub fn record_model_usage_at(
        &mut self,
        provider_id: &str,
        model_id: &str,
        count: u64,
        now: DateTime<Utc>,
    ) -> Result<QuotaSnapshot> {
        if self.is_free_forever(provider_id, model_id) {
            log::debug!(
                "[quota:policy] {} / {} is free forever, not counting usage",
                provider_id,
                model_id
            );
            return Ok(self.get_snapshot_at(provider_id, now));
        }
        self.record_usage_at(provider_id, count, now)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Current snapshot
    ///
    /// Unknown providers get a zero-valued snapshot with unit `unknown`,
    /// even when a record for the id is still stored.
    pub fn get_snapshot(&mut self, provider_id: &str) -> QuotaSnapshot {
        self.get_snapshot_at(provider_id, Utc::now())
    }

    pub fn get_snapshot_at(&mut self, provider_id: &str, now: DateTime<Utc>) -> QuotaSnapshot {
        match self.catalog.plan(provider_id).cloned() {
            Some(plan) => {
                let record = self.store.evaluate_reset_at(provider_id, plan.kind, now);
                policy::snapshot(provider_id, Some(&record), Some(&plan))
            }
            None => policy::snapshot(provider_id, None, None),
        }
    }

    /// Snapshots of every catalog provider, in id order
    pub fn snapshots(&mut self) -> Vec<QuotaSnapshot> {
        self.snapshots_at(Utc::now())
    }

    pub fn snapshots_at(&mut self, now: DateTime<Utc>) -> Vec<QuotaSnapshot> {
        let ids: Vec<String> = self.catalog.ids().map(str::to_string).collect();
        ids.iter()
            .map(|id| self.get_snapshot_at(id, now))
            .collect()
    }

    /// When the provider's capacity comes back
    ///
    /// `None` for one-time plans, unknown providers, and providers that
    /// were never touched.
    pub fn get_next_refresh(&mut self, provider_id: &str) -> Option<DateTime<Utc>> {
        self.get_next_refresh_at(provider_id, Utc::now())
    }

    pub fn get_next_refresh_at(
        &mut self,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let kind = self.catalog.plan(provider_id)?.kind;
        self.store.peek(provider_id)?;
        let record = self.store.evaluate_reset_at(provider_id, kind, now);
        policy::next_refresh(&record, kind)
    }

    /// Forget all recorded usage
    pub fn reset_all(&mut self) {
        self.store.wipe();
    }
}
