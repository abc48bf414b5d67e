//! Quota tracking module
//!
//! Local, advisory tracking of each provider's free-tier usage. Nothing
//! here talks to the providers: the counters only reflect what this client
//! recorded, and clearing local state clears them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ QuotaTracker (entry point)                              │
//! │   - check_quota() / check_model()                       │
//! │   - record_usage() / record_model_usage()               │
//! │   - get_snapshot() / get_next_refresh() / reset_all()   │
//! └─────────────────────────────────────────────────────────┘
//!          │                              │
//!          ▼                              ▼
//! ┌─────────────────────────┐   ┌─────────────────────────┐
//! │ QuotaStore              │   │ policy                  │
//! │   - evaluate_reset()    │   │   - snapshot()          │
//! │   - increment()         │   │   - admit()             │
//! │   - load() / save()     │   │   - next_refresh()      │
//! │   - wipe()              │   └─────────────────────────┘
//! └─────────────────────────┘
//!          │
//!          ▼
//!   KeyValueStore ("quota:v1")
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use voiceprompt_core::services::quota::{QuotaTracker, Verdict};
//!
//! let mut tracker = QuotaTracker::open(backend, catalog);
//!
//! match tracker.check_quota("openrouter", 1) {
//!     Verdict::Allowed { .. } => {
//!         if call_provider().await.is_ok() {
//!             tracker.record_usage("openrouter", 1)?;
//!         }
//!     }
//!     Verdict::Denied(denial) => show_notice(&denial.notice()),
//! }
//! ```

pub mod policy;
pub mod store;
pub mod tracker;
pub mod types;

// Re-export main types
pub use types::{
    Denial,
    DenialReason,
    QuotaMap,
    QuotaRecord,
    QuotaSnapshot,
    UsageLevel,
    Verdict,
    CRITICAL_THRESHOLD,
    UNKNOWN_UNIT,
    WARNING_THRESHOLD,
};

// Re-export store
pub use store::{parse_records, serialize_records, QuotaError, QuotaStore, QUOTA_STORAGE_KEY};

// Re-export tracker
pub use tracker::QuotaTracker;
