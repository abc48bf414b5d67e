//! Quota policy
//!
//! Stateless interpretation of a [`QuotaRecord`] against its
//! [`ProviderPlan`]. Callers are expected to pass records that already went
//! through the store's reset gate.

use chrono::{DateTime, Utc};

use super::types::{Denial, QuotaRecord, QuotaSnapshot, Verdict, UNKNOWN_UNIT};
use crate::providers::{PlanKind, ProviderPlan};

/// Build a snapshot for a provider
///
/// A missing plan yields a zero-total snapshot with unit `"unknown"`
/// instead of an error; a missing record counts as nothing used.
pub fn snapshot(
    provider_id: &str,
    record: Option<&QuotaRecord>,
    plan: Option<&ProviderPlan>,
) -> QuotaSnapshot {
    let used = record.map(|r| r.used).unwrap_or(0);
    let last_reset = record.and_then(|r| r.last_reset);
    let (total, unit, kind) = match plan {
        Some(plan) => (plan.limit, plan.unit.clone(), Some(plan.kind)),
        None => (0, UNKNOWN_UNIT.to_string(), None),
    };

    let remaining = i64::try_from(total)
        .unwrap_or(i64::MAX)
        .saturating_sub(i64::try_from(used).unwrap_or(i64::MAX));

    let percentage = if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    QuotaSnapshot {
        provider_id: provider_id.to_string(),
        kind,
        used,
        total,
        unit,
        remaining,
        percentage,
        is_exhausted: used >= total,
        last_reset,
    }
}

/// When capacity returns for a record
///
/// Daily plans refresh at the first UTC midnight after `last_reset`.
/// One-time plans and records without a reset stamp never refresh.
pub fn next_refresh(record: &QuotaRecord, kind: PlanKind) -> Option<DateTime<Utc>> {
    match kind {
        PlanKind::OneTime => None,
        PlanKind::Daily => {
            let last_reset = record.last_reset?;
            let midnight = last_reset.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?;
            Some(midnight.and_utc())
        }
    }
}

/// Decide whether `estimated` more units fit into a known provider's quota
///
/// Exhaustion is checked before insufficiency: an exhausted provider is
/// denied with its refresh time, a provider that merely lacks room for this
/// request is denied with what is left.
pub fn admit(
    snapshot: &QuotaSnapshot,
    estimated: u64,
    next_refresh: Option<DateTime<Utc>>,
) -> Verdict {
    if snapshot.is_exhausted {
        return Verdict::Denied(Denial::exhausted(next_refresh));
    }

    let fits = u64::try_from(snapshot.remaining)
        .map(|remaining| remaining >= estimated)
        .unwrap_or(false);

    if !fits {
        return Verdict::Denied(Denial::insufficient(snapshot.remaining));
    }

    Verdict::Allowed {
        remaining: snapshot.remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quota::types::DenialReason;
    use chrono::TimeZone;

    fn daily(limit: u64) -> ProviderPlan {
        ProviderPlan::daily(limit, "calls/day")
    }

    fn record(used: u64) -> QuotaRecord {
        QuotaRecord {
            used,
            last_reset: Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap()),
        }
    }

    #[test]
    fn test_snapshot_arithmetic() {
        let snap = snapshot("openrouter", Some(&record(10)), Some(&daily(50)));
        assert_eq!(snap.used, 10);
        assert_eq!(snap.total, 50);
        assert_eq!(snap.unit, "calls/day");
        assert_eq!(snap.remaining, 40);
        assert!((snap.percentage - 20.0).abs() < f64::EPSILON);
        assert!(!snap.is_exhausted);
        assert_eq!(snap.kind, Some(PlanKind::Daily));
    }

    #[test]
    fn test_snapshot_over_budget_goes_negative() {
        let snap = snapshot("gemini", Some(&record(25)), Some(&daily(20)));
        assert_eq!(snap.remaining, -5);
        assert!(snap.is_exhausted);
        assert!(snap.percentage > 100.0);
    }

    #[test]
    fn test_snapshot_unknown_provider() {
        let snap = snapshot("foo", None, None);
        assert_eq!(snap.total, 0);
        assert_eq!(snap.unit, "unknown");
        assert_eq!(snap.percentage, 0.0);
        assert_eq!(snap.remaining, 0);
        assert!(snap.kind.is_none());
    }

    #[test]
    fn test_snapshot_zero_limit_plan() {
        let snap = snapshot("groq", Some(&record(0)), Some(&daily(0)));
        assert_eq!(snap.percentage, 0.0);
        assert!(snap.is_exhausted);
    }

    #[test]
    fn test_next_refresh_daily_is_following_midnight() {
        let next = next_refresh(&record(3), PlanKind::Daily).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());

        let late = QuotaRecord {
            used: 0,
            last_reset: Some(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()),
        };
        assert_eq!(
            next_refresh(&late, PlanKind::Daily),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_next_refresh_none_cases() {
        assert!(next_refresh(&record(3), PlanKind::OneTime).is_none());
        assert!(next_refresh(&QuotaRecord::default(), PlanKind::Daily).is_none());
    }

    #[test]
    fn test_admit_allowed() {
        let snap = snapshot("openrouter", Some(&record(0)), Some(&daily(50)));
        assert_eq!(admit(&snap, 1, None), Verdict::Allowed { remaining: 50 });
        assert_eq!(admit(&snap, 50, None), Verdict::Allowed { remaining: 50 });
        assert_eq!(admit(&snap, 0, None), Verdict::Allowed { remaining: 50 });
    }

    #[test]
    fn test_admit_exhausted_carries_refresh() {
        let snap = snapshot("openrouter", Some(&record(50)), Some(&daily(50)));
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let verdict = admit(&snap, 1, Some(at));
        let denial = verdict.denial().unwrap();
        assert_eq!(denial.reason, DenialReason::QuotaExhausted);
        assert_eq!(denial.next_refresh, Some(at));
        assert!(denial.remaining.is_none());
    }

    #[test]
    fn test_admit_insufficient_carries_remaining() {
        let snap = snapshot("openrouter", Some(&record(48)), Some(&daily(50)));
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let verdict = admit(&snap, 3, Some(at));
        let denial = verdict.denial().unwrap();
        assert_eq!(denial.reason, DenialReason::InsufficientQuota);
        assert_eq!(denial.remaining, Some(2));
        assert!(denial.next_refresh.is_none());
    }

    #[test]
    fn test_admit_matches_remaining_for_all_amounts() {
        let plan = daily(10);
        for used in 0..=12u64 {
            let snap = snapshot("p", Some(&record(used)), Some(&plan));
            for n in 0..=12u64 {
                let allowed = admit(&snap, n, None).is_allowed();
                let expected = used < 10 && (10 - used) >= n;
                assert_eq!(allowed, expected, "used={} n={}", used, n);
            }
        }
    }
}
