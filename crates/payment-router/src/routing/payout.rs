//! Payout routing: picks the settlement agent that fulfils a withdrawal.

use rust_decimal::Decimal;

use super::candidate::{AmountFit, Candidate};
use super::domain::{ActivityFlags, CandidateId, CandidateLimits, SettlementAgent, UsageStats};
use super::engine::SelectionEngine;
use super::explanation::ExplanationSink;
use super::repository::CandidateRepository;
use super::result::SelectionResult;
use super::scoring::AmountTier;

/// Fit for an agent not staffed for the request's tier.
const OFF_TIER_FIT: f64 = 0.4;

pub type PayoutRouter<R, X> = SelectionEngine<SettlementAgent, R, X>;

impl<R, X> SelectionEngine<SettlementAgent, R, X>
where
    R: CandidateRepository<SettlementAgent> + ?Sized,
    X: ExplanationSink + ?Sized,
{
    /// Choose the agent that should settle `amount` for `subject_id`.
    pub fn select_agent(
        &self,
        amount: Decimal,
        subject_id: &str,
        request_id: &str,
    ) -> SelectionResult {
        self.select(amount, subject_id, request_id)
    }
}

impl Candidate for SettlementAgent {
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

    fn amount_fit(&self, amount: Decimal, tier: AmountTier, _usage: &UsageStats) -> AmountFit {
        if let Some(outside) = AmountFit::outside_bounds(&self.limits, amount) {
            return outside;
        }
        if self.preferred_tiers.is_empty() {
            return AmountFit::new(1.0, "handles every amount tier");
        }
        if self.preferred_tiers.contains(&tier) {
            AmountFit::new(1.0, format!("prefers {} amounts", tier.label()))
        } else {
            AmountFit::new(
                OFF_TIER_FIT,
                format!("not staffed for {} amounts", tier.label()),
            )
        }
    }
}
