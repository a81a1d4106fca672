//! Hard eligibility rules re-checked at draw time against current counters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::candidate::Candidate;
use super::domain::UsageStats;
use super::settings::SelectionConfig;

/// Why a drawn candidate was turned away. The message is used verbatim in audit trails.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Rejection {
    #[error("Candidate is no longer active")]
    Inactive,
    #[error("At max capacity")]
    AtCapacity { active: u32, ceiling: u32 },
    #[error("Daily transaction limit reached")]
    DailyCountReached { count: u32, limit: u32 },
    #[error("Too many cancellations today")]
    TooManyCancellations { cancelled: u32, limit: u32 },
    #[error("Cooling down ({remaining_minutes} min remaining)")]
    CoolingDown { remaining_minutes: u32 },
    #[error("Daily volume limit would be exceeded")]
    DailyVolumeExceeded { projected: Decimal, cap: Decimal },
    #[error("Amount outside transaction limits")]
    AmountOutOfRange {
        amount: Decimal,
        min: Option<Decimal>,
        max: Option<Decimal>,
    },
}

pub struct RealtimeValidator;

impl RealtimeValidator {
    /// Ordered checks; the first failure wins.
    pub fn validate<C: Candidate>(
        candidate: &C,
        usage: &UsageStats,
        amount: Decimal,
        now: DateTime<Utc>,
        config: &SelectionConfig,
    ) -> Result<(), Rejection> {
        if !candidate.activity().is_available() {
            return Err(Rejection::Inactive);
        }

        let ceiling = config.capacity_ceiling(candidate.limits().max_concurrent);
        if usage.active_workload >= ceiling {
            return Err(Rejection::AtCapacity {
                active: usage.active_workload,
                ceiling,
            });
        }

        if usage.today_count >= config.max_daily_transactions {
            return Err(Rejection::DailyCountReached {
                count: usage.today_count,
                limit: config.max_daily_transactions,
            });
        }

        if usage.cancelled_today >= config.max_daily_cancellations {
            return Err(Rejection::TooManyCancellations {
                cancelled: usage.cancelled_today,
                limit: config.max_daily_cancellations,
            });
        }

        // Valid once half the cooldown has elapsed.
        if let Some(idle) = usage.idle_minutes(now) {
            let required = f64::from(config.cooldown_minutes) / 2.0;
            if idle < required {
                return Err(Rejection::CoolingDown {
                    remaining_minutes: (required - idle).ceil() as u32,
                });
            }
        }

        match candidate.extra_checks(amount, usage, config) {
            Some(rejection) => Err(rejection),
            None => Ok(()),
        }
    }
}
