use rust_decimal::Decimal;

use super::domain::{ActivityFlags, CandidateId, CandidateLimits, UsageStats};
use super::scoring::AmountTier;
use super::settings::SelectionConfig;
use super::validation::Rejection;

/// Capabilities the selection engine needs from a routable candidate.
///
/// Collection endpoints and settlement agents share the engine and differ only in the
/// hooks below.
pub trait Candidate: Clone + Send + Sync + 'static {
    fn id(&self) -> &CandidateId;
    fn name(&self) -> &str;
    fn activity(&self) -> ActivityFlags;
    fn limits(&self) -> &CandidateLimits;
    fn usage(&self) -> Option<&UsageStats>;
    fn set_usage(&mut self, usage: UsageStats);

    /// How well `amount` suits this candidate, as a fraction in `[0, 1]`.
    fn amount_fit(&self, amount: Decimal, tier: AmountTier, usage: &UsageStats) -> AmountFit;

    /// Variant-specific hard checks run after the shared real-time rules.
    fn extra_checks(
        &self,
        _amount: Decimal,
        _usage: &UsageStats,
        _config: &SelectionConfig,
    ) -> Option<Rejection> {
        None
    }
}

/// Result of the amount-fit hook.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountFit {
    pub fraction: f64,
    pub reason: String,
}

impl AmountFit {
    pub fn new(fraction: f64, reason: impl Into<String>) -> Self {
        Self {
            fraction: if fraction.is_finite() {
                fraction.clamp(0.0, 1.0)
            } else {
                0.0
            },
            reason: reason.into(),
        }
    }

    /// Zero fit when the amount sits outside the per-transaction bounds.
    pub(crate) fn outside_bounds(limits: &CandidateLimits, amount: Decimal) -> Option<Self> {
        if limits.accepts_amount(amount) {
            return None;
        }
        let min = limits
            .min_amount
            .map_or_else(|| "-".to_string(), |value| value.to_string());
        let max = limits
            .max_amount
            .map_or_else(|| "-".to_string(), |value| value.to_string());
        Some(Self::new(
            0.0,
            format!("amount {amount} outside transaction limits [{min}, {max}]"),
        ))
    }
}
