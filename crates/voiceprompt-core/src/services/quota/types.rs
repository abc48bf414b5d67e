//! Quota tracking types
//!
//! Persisted usage records, decision-ready snapshots and admission verdicts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::PlanKind;
use crate::utils::format_time;

// ============================================================================
// Persisted Record
// ============================================================================

/// Usage counter of one provider, as persisted under `quota:v1`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRecord {
    /// Units consumed since the last reset
    pub used: u64,
    /// When the counter was last zeroed; always `None` for one-time plans
    #[serde(default)]
    pub last_reset: Option<DateTime<Utc>>,
}

impl QuotaRecord {
    /// Default record for a provider seen for the first time
    pub fn fresh(kind: PlanKind, now: DateTime<Utc>) -> Self {
        match kind {
            PlanKind::Daily => Self {
                used: 0,
                last_reset: Some(now),
            },
            PlanKind::OneTime => Self {
                used: 0,
                last_reset: None,
            },
        }
    }
}

/// Provider id to record mapping; ordered so serialization is stable
pub type QuotaMap = BTreeMap<String, QuotaRecord>;

// ============================================================================
// Snapshot
// ============================================================================

/// Unit label reported for providers without a plan
pub const UNKNOWN_UNIT: &str = "unknown";

/// A record interpreted against its provider plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub provider_id: String,
    /// `None` when the provider has no plan
    pub kind: Option<PlanKind>,
    pub used: u64,
    pub total: u64,
    pub unit: String,
    /// `total - used`; negative means over budget and counts as exhausted
    pub remaining: i64,
    /// `used / total * 100`, or 0 when `total` is 0
    pub percentage: f64,
    pub is_exhausted: bool,
    pub last_reset: Option<DateTime<Utc>>,
}

/// Coarse usage level for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLevel {
    Normal,
    /// At least 70% used
    Warning,
    /// At least 90% used
    Critical,
    Exhausted,
}

/// Usage percentage at which a provider is flagged as warning
pub const WARNING_THRESHOLD: f64 = 70.0;

/// Usage percentage at which a provider is flagged as critical
pub const CRITICAL_THRESHOLD: f64 = 90.0;

impl UsageLevel {
    pub fn from_snapshot(snapshot: &QuotaSnapshot) -> Self {
        if snapshot.is_exhausted {
            UsageLevel::Exhausted
        } else if snapshot.percentage >= CRITICAL_THRESHOLD {
            UsageLevel::Critical
        } else if snapshot.percentage >= WARNING_THRESHOLD {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }
}

impl std::fmt::Display for UsageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageLevel::Normal => write!(f, "available"),
            UsageLevel::Warning => write!(f, "low"),
            UsageLevel::Critical => write!(f, "almost out"),
            UsageLevel::Exhausted => write!(f, "exhausted"),
        }
    }
}

// ============================================================================
// Verdict
// ============================================================================

/// Why an admission check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    UnknownProvider,
    QuotaExhausted,
    InsufficientQuota,
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::UnknownProvider => write!(f, "unknown provider"),
            DenialReason::QuotaExhausted => write!(f, "quota exhausted"),
            DenialReason::InsufficientQuota => write!(f, "insufficient remaining quota"),
        }
    }
}

/// Details of a denied admission check
///
/// `next_refresh` is only attached for [`DenialReason::QuotaExhausted`];
/// `remaining` only for [`DenialReason::InsufficientQuota`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    pub reason: DenialReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_refresh: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
}

impl Denial {
    pub fn unknown_provider() -> Self {
        Self {
            reason: DenialReason::UnknownProvider,
            next_refresh: None,
            remaining: None,
        }
    }

    pub fn exhausted(next_refresh: Option<DateTime<Utc>>) -> Self {
        Self {
            reason: DenialReason::QuotaExhausted,
            next_refresh,
            remaining: None,
        }
    }

    pub fn insufficient(remaining: i64) -> Self {
        Self {
            reason: DenialReason::InsufficientQuota,
            next_refresh: None,
            remaining: Some(remaining),
        }
    }

    /// Blocking notice shown to the user
    pub fn notice(&self) -> String {
        match (self.reason, self.next_refresh, self.remaining) {
            (_, Some(at), _) => format!("{}; next refresh at {}", self.reason, format_time(Some(at))),
            (_, None, Some(remaining)) => format!("{} ({} left)", self.reason, remaining),
            _ => self.reason.to_string(),
        }
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allowed { remaining: i64 },
    Denied(Denial),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed { .. })
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Verdict::Denied(denial) => Some(denial),
            Verdict::Allowed { .. } => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(used: u64, total: u64) -> QuotaSnapshot {
        QuotaSnapshot {
            provider_id: "openrouter".to_string(),
            kind: Some(PlanKind::Daily),
            used,
            total,
            unit: "calls/day".to_string(),
            remaining: total as i64 - used as i64,
            percentage: used as f64 / total as f64 * 100.0,
            is_exhausted: used >= total,
            last_reset: None,
        }
    }

    #[test]
    fn test_fresh_record() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(QuotaRecord::fresh(PlanKind::Daily, now).last_reset, Some(now));
        assert_eq!(QuotaRecord::fresh(PlanKind::OneTime, now).last_reset, None);
    }

    #[test]
    fn test_record_serde_shape() {
        let record = QuotaRecord {
            used: 3,
            last_reset: Some(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap()),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"used":3,"lastReset":"2024-01-01T23:59:59Z"}"#);

        let parsed: QuotaRecord = serde_json::from_str(r#"{"used":7}"#).unwrap();
        assert_eq!(parsed.used, 7);
        assert!(parsed.last_reset.is_none());
    }

    #[test]
    fn test_usage_level() {
        assert_eq!(UsageLevel::from_snapshot(&snapshot(10, 50)), UsageLevel::Normal);
        assert_eq!(UsageLevel::from_snapshot(&snapshot(35, 50)), UsageLevel::Warning);
        assert_eq!(UsageLevel::from_snapshot(&snapshot(46, 50)), UsageLevel::Critical);
        assert_eq!(UsageLevel::from_snapshot(&snapshot(50, 50)), UsageLevel::Exhausted);
    }

    #[test]
    fn test_denial_reason_display() {
        assert_eq!(DenialReason::UnknownProvider.to_string(), "unknown provider");
        assert_eq!(DenialReason::QuotaExhausted.to_string(), "quota exhausted");
        assert_eq!(
            DenialReason::InsufficientQuota.to_string(),
            "insufficient remaining quota"
        );
    }

    #[test]
    fn test_denial_notice() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(
            Denial::exhausted(Some(at)).notice(),
            "quota exhausted; next refresh at Jan 2 00:00 UTC"
        );
        assert_eq!(
            Denial::insufficient(3).notice(),
            "insufficient remaining quota (3 left)"
        );
        assert_eq!(Denial::unknown_provider().notice(), "unknown provider");
    }

    #[test]
    fn test_verdict_serialization() {
        let allowed = Verdict::Allowed { remaining: 50 };
        assert_eq!(
            serde_json::to_string(&allowed).unwrap(),
            r#"{"verdict":"allowed","remaining":50}"#
        );

        let denied = Verdict::Denied(Denial::unknown_provider());
        assert_eq!(
            serde_json::to_string(&denied).unwrap(),
            r#"{"verdict":"denied","reason":"unknown_provider"}"#
        );
        assert!(!denied.is_allowed());
        assert_eq!(denied.denial().unwrap().reason, DenialReason::UnknownProvider);
    }
}
