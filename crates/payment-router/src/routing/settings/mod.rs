//! Typed selection configuration and the override resolver.

mod source;

pub use source::{
    resolve_from, ConfigSource, ConfigSourceError, EnvConfigSource, JsonFileConfigSource,
    StaticConfigSource,
};

use std::fmt::Debug;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Immutable per-invocation selection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Candidates scoring below this never enter the draw.
    pub min_score_threshold: f64,
    /// Size of the top slice that competes in the weighted draw.
    pub max_candidates: usize,
    /// `weight = score ^ weight_exponent`; above 1 sharpens the bias toward the leader.
    pub weight_exponent: f64,
    /// Minimum idle time before a candidate should be reselected.
    pub cooldown_minutes: u32,
    pub fallback_enabled: bool,
    pub max_fallback_attempts: u32,
    /// Ceiling on concurrently active assignments per candidate.
    pub max_active_workload: u32,
    pub max_daily_transactions: u32,
    pub max_daily_cancellations: u32,
    /// Amounts up to this value are small.
    pub small_amount_ceiling: Decimal,
    /// Amounts from this value up are large.
    pub large_amount_floor: Decimal,
    pub logging_enabled: bool,
    pub weights: ScoringWeights,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 30.0,
            max_candidates: 5,
            weight_exponent: 2.0,
            cooldown_minutes: 10,
            fallback_enabled: true,
            max_fallback_attempts: 3,
            max_active_workload: 5,
            max_daily_transactions: 200,
            max_daily_cancellations: 10,
            small_amount_ceiling: Decimal::from(1_000),
            large_amount_floor: Decimal::from(10_000),
            logging_enabled: true,
            weights: ScoringWeights::default(),
        }
    }
}

impl SelectionConfig {
    /// Merge overrides onto the defaults. Never fails: invalid fields fall back and are logged.
    pub fn resolve(overrides: Option<&SelectionOverrides>) -> Self {
        let defaults = Self::default();
        let Some(overrides) = overrides else {
            return defaults;
        };

        let mut config = Self {
            min_score_threshold: pick(
                "min_score_threshold",
                overrides.min_score_threshold,
                defaults.min_score_threshold,
                |value| value.is_finite() && (0.0..=100.0).contains(&value),
            ),
            max_candidates: pick(
                "max_candidates",
                overrides.max_candidates,
                defaults.max_candidates,
                |value| value >= 1,
            ),
            weight_exponent: pick(
                "weight_exponent",
                overrides.weight_exponent,
                defaults.weight_exponent,
                |value| value.is_finite() && value > 0.0,
            ),
            cooldown_minutes: pick(
                "cooldown_minutes",
                overrides.cooldown_minutes,
                defaults.cooldown_minutes,
                |_| true,
            ),
            fallback_enabled: overrides.fallback_enabled.unwrap_or(defaults.fallback_enabled),
            max_fallback_attempts: pick(
                "max_fallback_attempts",
                overrides.max_fallback_attempts,
                defaults.max_fallback_attempts,
                |value| value >= 1,
            ),
            max_active_workload: pick(
                "max_active_workload",
                overrides.max_active_workload,
                defaults.max_active_workload,
                |value| value >= 1,
            ),
            max_daily_transactions: pick(
                "max_daily_transactions",
                overrides.max_daily_transactions,
                defaults.max_daily_transactions,
                |value| value >= 1,
            ),
            max_daily_cancellations: pick(
                "max_daily_cancellations",
                overrides.max_daily_cancellations,
                defaults.max_daily_cancellations,
                |value| value >= 1,
            ),
            small_amount_ceiling: pick(
                "small_amount_ceiling",
                overrides.small_amount_ceiling,
                defaults.small_amount_ceiling,
                |value| !value.is_sign_negative(),
            ),
            large_amount_floor: pick(
                "large_amount_floor",
                overrides.large_amount_floor,
                defaults.large_amount_floor,
                |value| !value.is_sign_negative(),
            ),
            logging_enabled: overrides.logging_enabled.unwrap_or(defaults.logging_enabled),
            weights: ScoringWeights::resolve(overrides.weights.as_ref()),
        };

        if config.large_amount_floor < config.small_amount_ceiling {
            warn!(
                small_amount_ceiling = %config.small_amount_ceiling,
                large_amount_floor = %config.large_amount_floor,
                "tier boundaries overlap, restoring defaults"
            );
            config.small_amount_ceiling = defaults.small_amount_ceiling;
            config.large_amount_floor = defaults.large_amount_floor;
        }

        config
    }

    /// Attempt budget for the fallback chain.
    pub fn attempt_budget(&self) -> u32 {
        if self.fallback_enabled {
            self.max_fallback_attempts.max(1)
        } else {
            1
        }
    }

    /// Capacity ceiling for a candidate, honoring its own concurrency limit when tighter.
    pub fn capacity_ceiling(&self, candidate_limit: Option<u32>) -> u32 {
        match candidate_limit {
            Some(limit) => limit.min(self.max_active_workload),
            None => self.max_active_workload,
        }
    }
}

/// Maximum points each scoring factor contributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub capacity: f64,
    pub success_rate: f64,
    pub amount_fit: f64,
    pub freshness: f64,
    pub speed: f64,
    pub recency_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            capacity: 30.0,
            success_rate: 25.0,
            amount_fit: 20.0,
            freshness: 15.0,
            speed: 10.0,
            recency_penalty: 15.0,
        }
    }
}

impl ScoringWeights {
    fn resolve(overrides: Option<&ScoringWeightOverrides>) -> Self {
        let defaults = Self::default();
        let Some(overrides) = overrides else {
            return defaults;
        };
        let valid = |value: f64| value.is_finite() && value >= 0.0;

        Self {
            capacity: pick("weights.capacity", overrides.capacity, defaults.capacity, valid),
            success_rate: pick(
                "weights.success_rate",
                overrides.success_rate,
                defaults.success_rate,
                valid,
            ),
            amount_fit: pick(
                "weights.amount_fit",
                overrides.amount_fit,
                defaults.amount_fit,
                valid,
            ),
            freshness: pick(
                "weights.freshness",
                overrides.freshness,
                defaults.freshness,
                valid,
            ),
            speed: pick("weights.speed", overrides.speed, defaults.speed, valid),
            recency_penalty: pick(
                "weights.recency_penalty",
                overrides.recency_penalty,
                defaults.recency_penalty,
                valid,
            ),
        }
    }
}

/// Partial configuration as supplied by a [`ConfigSource`]. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOverrides {
    pub min_score_threshold: Option<f64>,
    pub max_candidates: Option<usize>,
    pub weight_exponent: Option<f64>,
    pub cooldown_minutes: Option<u32>,
    pub fallback_enabled: Option<bool>,
    pub max_fallback_attempts: Option<u32>,
    pub max_active_workload: Option<u32>,
    pub max_daily_transactions: Option<u32>,
    pub max_daily_cancellations: Option<u32>,
    pub small_amount_ceiling: Option<Decimal>,
    pub large_amount_floor: Option<Decimal>,
    pub logging_enabled: Option<bool>,
    pub weights: Option<ScoringWeightOverrides>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeightOverrides {
    pub capacity: Option<f64>,
    pub success_rate: Option<f64>,
    pub amount_fit: Option<f64>,
    pub freshness: Option<f64>,
    pub speed: Option<f64>,
    pub recency_penalty: Option<f64>,
}

fn pick<T: Copy + Debug>(
    field: &'static str,
    value: Option<T>,
    default: T,
    valid: impl Fn(T) -> bool,
) -> T {
    match value {
        Some(value) if valid(value) => value,
        Some(value) => {
            warn!(field, value = ?value, default = ?default, "ignoring invalid selection override");
            default
        }
        None => default,
    }
}
