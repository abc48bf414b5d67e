//! Quota commands
//!
//! Inspect free-tier usage, run admission checks and record usage.

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use voiceprompt_core::services::quota::{QuotaSnapshot, UsageLevel, Verdict};
use voiceprompt_core::utils::{format_number, format_signed, format_time, format_time_until};

use super::Context;
use crate::output::{print_info, print_json, print_rows, print_success, OutputFormat};

#[derive(Subcommand)]
pub enum QuotaAction {
    /// Show usage for one or all providers
    Status {
        /// Provider id (e.g., openrouter). Shows all providers if omitted.
        provider: Option<String>,
    },

    /// Check whether a request may be sent (exits non-zero when denied)
    Check {
        /// Provider id
        provider: String,

        /// Units the request is expected to consume
        #[arg(long, short, default_value_t = 1)]
        amount: u64,

        /// Model id; free-forever models are always allowed
        #[arg(long, short)]
        model: Option<String>,
    },

    /// Record usage after a successful request
    Record {
        /// Provider id
        provider: String,

        /// Units consumed
        #[arg(long, short, default_value_t = 1)]
        amount: u64,

        /// Model id; free-forever models are not counted
        #[arg(long, short)]
        model: Option<String>,
    },

    /// Forget all recorded usage
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

/// Quota row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct QuotaRow {
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[tabled(rename = "Plan")]
    pub plan: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Usage")]
    pub usage: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Next Refresh")]
    pub next_refresh: String,
}

impl QuotaRow {
    fn new(snapshot: &QuotaSnapshot, next_refresh: Option<chrono::DateTime<Utc>>) -> Self {
        let level = UsageLevel::from_snapshot(snapshot);
        let status = match level {
            UsageLevel::Normal => level.to_string().green().to_string(),
            UsageLevel::Warning => level.to_string().yellow().to_string(),
            UsageLevel::Critical | UsageLevel::Exhausted => level.to_string().red().to_string(),
        };

        let next_refresh = match (level, next_refresh) {
            (UsageLevel::Exhausted, Some(at)) => {
                format!("in {}", format_time_until(at, Utc::now()))
            }
            (_, at) => format_time(at),
        };

        Self {
            provider: snapshot.provider_id.clone(),
            plan: snapshot
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "-".to_string()),
            used: format!(
                "{} / {} {}",
                format_number(snapshot.used),
                format_number(snapshot.total),
                snapshot.unit
            ),
            remaining: format_signed(snapshot.remaining),
            usage: format!("{:.1}%", snapshot.percentage),
            status,
            next_refresh,
        }
    }
}

/// Snapshot plus refresh time, as emitted in JSON output
#[derive(Debug, Serialize)]
struct QuotaStatus {
    #[serde(flatten)]
    snapshot: QuotaSnapshot,
    level: UsageLevel,
    next_refresh: Option<chrono::DateTime<Utc>>,
}

pub fn execute(ctx: &mut Context, action: QuotaAction) -> Result<()> {
    match action {
        QuotaAction::Status { provider } => show_status(ctx, provider),
        QuotaAction::Check {
            provider,
            amount,
            model,
        } => check(ctx, &provider, amount, model.as_deref()),
        QuotaAction::Record {
            provider,
            amount,
            model,
        } => record(ctx, &provider, amount, model.as_deref()),
        QuotaAction::Reset { yes } => reset(ctx, yes),
    }
}

fn status_of(ctx: &mut Context, snapshot: QuotaSnapshot) -> QuotaStatus {
    let next_refresh = ctx.app.quota.get_next_refresh(&snapshot.provider_id);
    QuotaStatus {
        level: UsageLevel::from_snapshot(&snapshot),
        snapshot,
        next_refresh,
    }
}

fn print_statuses(statuses: &[QuotaStatus], format: OutputFormat) -> Result<()> {
    let rows: Vec<QuotaRow> = statuses
        .iter()
        .map(|s| QuotaRow::new(&s.snapshot, s.next_refresh))
        .collect();
    print_rows(&rows, statuses, format, "No providers configured.")
}

fn show_status(ctx: &mut Context, provider: Option<String>) -> Result<()> {
    let snapshots = match provider {
        Some(id) => {
            if !ctx.app.quota.catalog().contains(&id) {
                log::warn!("Unknown provider {}, showing empty quota", id);
            }
            vec![ctx.app.quota.get_snapshot(&id)]
        }
        None => ctx.app.quota.snapshots(),
    };

    let statuses: Vec<QuotaStatus> = snapshots
        .into_iter()
        .map(|snapshot| status_of(ctx, snapshot))
        .collect();

    print_statuses(&statuses, ctx.format)
}

fn check(ctx: &mut Context, provider: &str, amount: u64, model: Option<&str>) -> Result<()> {
    let verdict = match model {
        Some(model) => ctx.app.quota.check_model(provider, model, amount),
        None => ctx.app.quota.check_quota(provider, amount),
    };

    if ctx.format == OutputFormat::Json {
        print_json(&verdict)?;
    }

    match verdict {
        Verdict::Allowed { remaining } => {
            if ctx.format == OutputFormat::Table {
                print_success(
                    &format!("Allowed: {} {} remaining", format_signed(remaining), provider),
                    ctx.quiet,
                );
            }
            Ok(())
        }
        Verdict::Denied(denial) => bail!("{}: {}", provider, denial.notice()),
    }
}

fn record(ctx: &mut Context, provider: &str, amount: u64, model: Option<&str>) -> Result<()> {
    let snapshot = match model {
        Some(model) => ctx.app.quota.record_model_usage(provider, model, amount)?,
        None => ctx.app.quota.record_usage(provider, amount)?,
    };

    if ctx.format == OutputFormat::Table {
        print_success(&format!("Recorded {} for {}", amount, provider), ctx.quiet);
    }

    let status = status_of(ctx, snapshot);
    print_statuses(&[status], ctx.format)
}

fn reset(ctx: &mut Context, yes: bool) -> Result<()> {
    if !yes {
        print_info("This forgets all recorded usage. Re-run with --yes to confirm.", ctx.quiet);
        return Ok(());
    }

    ctx.app.quota.reset_all();
    print_success("All quota counters reset", ctx.quiet);
    Ok(())
}
