//! Services module

pub mod quota;

pub use quota::{
    Denial, DenialReason, QuotaRecord, QuotaSnapshot, QuotaStore, QuotaTracker, UsageLevel,
    Verdict,
};
