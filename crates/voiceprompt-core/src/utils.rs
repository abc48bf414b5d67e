//! Formatting helpers for quota counters and refresh times

use chrono::{DateTime, Utc};

/// Format a counter compactly: `2_500_000 -> "2.5M"`, `1_200 -> "1.2K"`
///
/// Ties round away from zero (`1_250 -> "1.3K"`).
pub fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", round_tenths(n as f64 / 1_000_000.0))
    } else if n >= 1_000 {
        format!("{:.1}K", round_tenths(n as f64 / 1_000.0))
    } else {
        n.to_string()
    }
}

fn round_tenths(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Format a signed counter; negative values keep their sign
pub fn format_signed(n: i64) -> String {
    if n < 0 {
        format!("-{}", format_number(n.unsigned_abs()))
    } else {
        format_number(n as u64)
    }
}

/// Format a refresh instant, `"-"` when there is none
pub fn format_time(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%b %-d %H:%M UTC").to_string(),
        None => "-".to_string(),
    }
}

/// Human-readable time left until `next`
pub fn format_time_until(next: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (next - now).num_seconds();
    if secs <= 0 {
        return "refreshing soon".to_string();
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
