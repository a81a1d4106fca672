//! Payin routing: picks the collection endpoint that receives a deposit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::candidate::{AmountFit, Candidate};
use super::domain::{ActivityFlags, CandidateId, CandidateLimits, CollectionEndpoint, UsageStats};
use super::engine::SelectionEngine;
use super::explanation::ExplanationSink;
use super::repository::CandidateRepository;
use super::result::SelectionResult;
use super::scoring::AmountTier;
use super::settings::SelectionConfig;
use super::validation::Rejection;

pub type PayinRouter<R, X> = SelectionEngine<CollectionEndpoint, R, X>;

impl<R, X> SelectionEngine<CollectionEndpoint, R, X>
where
    R: CandidateRepository<CollectionEndpoint> + ?Sized,
    X: ExplanationSink + ?Sized,
{
    /// Choose the endpoint that should collect `amount` for `merchant_id`.
    pub fn select_endpoint(
        &self,
        amount: Decimal,
        merchant_id: &str,
        request_id: &str,
    ) -> SelectionResult {
        self.select(amount, merchant_id, request_id)
    }
}

impl Candidate for CollectionEndpoint {
    fn id(&self) -> &CandidateId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn activity(&self) -> ActivityFlags {
        self.activity
    }

    fn limits(&self) -> &CandidateLimits {
        &self.limits
    }

    fn usage(&self) -> Option<&UsageStats> {
        self.usage.as_ref()
    }

    fn set_usage(&mut self, usage: UsageStats) {
        self.usage = Some(usage);
    }

    /// Bounds first, then the share of the daily volume cap still free after this amount.
    /// Larger tiers lean harder on that headroom.
    fn amount_fit(&self, amount: Decimal, tier: AmountTier, usage: &UsageStats) -> AmountFit {
        if let Some(outside) = AmountFit::outside_bounds(&self.limits, amount) {
            return outside;
        }

        let Some(cap) = self.limits.daily_volume_cap else {
            return AmountFit::new(1.0, "within limits, no daily volume cap");
        };
        if cap <= Decimal::ZERO {
            return AmountFit::new(0.0, "daily volume cap is zero");
        }

        let remaining = cap - usage.today_volume - amount;
        if remaining < Decimal::ZERO {
            return AmountFit::new(0.0, format!("amount would exceed daily cap of {cap}"));
        }

        let headroom = (remaining / cap).to_f64().unwrap_or(0.0).clamp(0.0, 1.0);
        let fraction = match tier {
            AmountTier::Small => 0.5 + 0.5 * headroom,
            AmountTier::Medium => 0.25 + 0.75 * headroom,
            AmountTier::Large => headroom,
        };
        AmountFit::new(
            fraction,
            format!(
                "{:.0}% of daily cap left after a {} amount",
                headroom * 100.0,
                tier.label()
            ),
        )
    }

    fn extra_checks(
        &self,
        amount: Decimal,
        usage: &UsageStats,
        _config: &SelectionConfig,
    ) -> Option<Rejection> {
        if let Some(cap) = self.limits.daily_volume_cap {
            let projected = usage.today_volume + amount;
            if projected > cap {
                return Some(Rejection::DailyVolumeExceeded { projected, cap });
            }
        }

        if !self.limits.accepts_amount(amount) {
            return Some(Rejection::AmountOutOfRange {
                amount,
                min: self.limits.min_amount,
                max: self.limits.max_amount,
            });
        }

        None
    }
}
