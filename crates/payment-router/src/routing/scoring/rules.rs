use chrono::{DateTime, Utc};

use super::super::candidate::AmountFit;
use super::super::domain::UsageStats;
use super::{ScoreComponent, ScoreFactor};

/// Average completion time that still earns the full speed bonus.
const FAST_COMPLETION_MINUTES: f64 = 5.0;
/// Average completion time at which the speed bonus reaches zero.
const SLOW_COMPLETION_MINUTES: f64 = 60.0;

pub(super) fn capacity_headroom(usage: &UsageStats, ceiling: u32, weight: f64) -> ScoreComponent {
    let headroom = if ceiling == 0 {
        0.0
    } else {
        f64::from(ceiling.saturating_sub(usage.active_workload)) / f64::from(ceiling)
    };

    ScoreComponent {
        factor: ScoreFactor::CapacityHeadroom,
        points: weight * headroom,
        reason: format!(
            "{}/{} active assignments, {:.0}% headroom",
            usage.active_workload,
            ceiling,
            headroom * 100.0
        ),
    }
}

pub(super) fn success_rate(usage: &UsageStats, weight: f64) -> ScoreComponent {
    let settled = usage.settled_today();
    if settled == 0 {
        return ScoreComponent {
            factor: ScoreFactor::SuccessRate,
            points: weight * 0.5,
            reason: "no settled assignments today, neutral success rate".to_string(),
        };
    }

    let rate = f64::from(usage.completed_today) / f64::from(settled);
    ScoreComponent {
        factor: ScoreFactor::SuccessRate,
        points: weight * rate,
        reason: format!(
            "{}/{} settled assignments succeeded today ({:.0}%)",
            usage.completed_today,
            settled,
            rate * 100.0
        ),
    }
}

pub(super) fn amount_fit(fit: AmountFit, weight: f64) -> ScoreComponent {
    ScoreComponent {
        factor: ScoreFactor::AmountFit,
        points: weight * fit.fraction,
        reason: fit.reason,
    }
}

pub(super) fn freshness(
    usage: &UsageStats,
    now: DateTime<Utc>,
    cooldown_minutes: u32,
    weight: f64,
) -> ScoreComponent {
    let (fraction, reason) = match usage.idle_minutes(now) {
        None => (1.0, "never assigned, full idle bonus".to_string()),
        Some(_) if cooldown_minutes == 0 => (1.0, "no cooldown configured".to_string()),
        Some(idle) => {
            let full_after = f64::from(cooldown_minutes) * 2.0;
            (
                (idle / full_after).min(1.0),
                format!("idle {idle:.0} min (full bonus after {full_after:.0} min)"),
            )
        }
    };

    ScoreComponent {
        factor: ScoreFactor::Freshness,
        points: weight * fraction,
        reason,
    }
}

pub(super) fn speed(usage: &UsageStats, weight: f64) -> ScoreComponent {
    let (fraction, reason) = match usage.avg_completion_minutes {
        Some(average) if average.is_finite() => {
            let span = SLOW_COMPLETION_MINUTES - FAST_COMPLETION_MINUTES;
            let fraction = (1.0 - (average - FAST_COMPLETION_MINUTES) / span).clamp(0.0, 1.0);
            (fraction, format!("average completion {average:.1} min"))
        }
        _ => (0.5, "no completion history, neutral speed".to_string()),
    };

    ScoreComponent {
        factor: ScoreFactor::Speed,
        points: weight * fraction,
        reason,
    }
}

pub(super) fn recency_penalty(
    usage: &UsageStats,
    now: DateTime<Utc>,
    cooldown_minutes: u32,
    weight: f64,
) -> ScoreComponent {
    let cooldown = f64::from(cooldown_minutes);
    match usage.idle_minutes(now) {
        Some(idle) if cooldown_minutes > 0 && idle < cooldown => ScoreComponent {
            factor: ScoreFactor::RecencyPenalty,
            points: -weight * (1.0 - idle / cooldown),
            reason: format!("assigned {idle:.0} min ago, inside {cooldown_minutes} min cooldown"),
        },
        _ => ScoreComponent {
            factor: ScoreFactor::RecencyPenalty,
            points: 0.0,
            reason: "outside cooldown window".to_string(),
        },
    }
}
