//! Aggregation of assignment records into per-candidate usage counters.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use super::domain::{AssignmentRecord, AssignmentStatus, UsageStats};

/// Number of most recent completions feeding the rolling latency average.
pub const DEFAULT_LATENCY_WINDOW: usize = 50;

/// Build usage counters from a candidate's assignment records.
///
/// "Today" is the calendar day of `now` in `tz`. Settlement counters use the completion
/// timestamp when present and the assignment timestamp otherwise.
pub fn aggregate<Tz: TimeZone>(
    records: &[AssignmentRecord],
    now: DateTime<Utc>,
    tz: &Tz,
    latency_window: usize,
) -> UsageStats {
    let today = now.with_timezone(tz).date_naive();
    let is_today = |at: DateTime<Utc>| local_date(at, tz) == today;

    let mut stats = UsageStats::default();
    let mut completions: Vec<(DateTime<Utc>, f64)> = Vec::new();

    for record in records {
        let settled_at = record.completed_at.unwrap_or(record.assigned_at);

        if is_today(record.assigned_at) {
            stats.today_count += 1;
            if matches!(
                record.status,
                AssignmentStatus::Pending | AssignmentStatus::Completed
            ) {
                stats.today_volume += record.amount;
            }
        }

        match record.status {
            AssignmentStatus::Pending => stats.active_workload += 1,
            AssignmentStatus::Completed => {
                if is_today(settled_at) {
                    stats.completed_today += 1;
                }
                if let Some(completed_at) = record.completed_at {
                    let elapsed = (completed_at - record.assigned_at).num_seconds().max(0);
                    let minutes = elapsed as f64 / 60.0;
                    completions.push((completed_at, minutes));
                    stats.last_success_at = stats.last_success_at.max(Some(completed_at));
                }
            }
            AssignmentStatus::Cancelled => {
                if is_today(settled_at) {
                    stats.cancelled_today += 1;
                }
            }
            AssignmentStatus::Failed => {
                if is_today(settled_at) {
                    stats.failed_today += 1;
                }
            }
        }

        stats.last_assigned_at = stats.last_assigned_at.max(Some(record.assigned_at));
    }

    completions.sort_by(|a, b| b.0.cmp(&a.0));
    completions.truncate(latency_window.max(1));
    if !completions.is_empty() {
        let total: f64 = completions.iter().map(|(_, minutes)| minutes).sum();
        stats.avg_completion_minutes = Some(total / completions.len() as f64);
    }

    if stats.today_volume < Decimal::ZERO {
        stats.today_volume = Decimal::ZERO;
    }

    stats
}

fn local_date<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}
