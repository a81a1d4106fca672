mod rules;
mod tier;

pub use tier::AmountTier;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::domain::{CandidateId, UsageStats};
use super::settings::SelectionConfig;

/// Independent sub-scores that make up a candidate's composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    CapacityHeadroom,
    SuccessRate,
    AmountFit,
    Freshness,
    Speed,
    RecencyPenalty,
}

impl ScoreFactor {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreFactor::CapacityHeadroom => "capacity headroom",
            ScoreFactor::SuccessRate => "success rate",
            ScoreFactor::AmountFit => "amount fit",
            ScoreFactor::Freshness => "idle bonus",
            ScoreFactor::Speed => "completion speed",
            ScoreFactor::RecencyPenalty => "recent assignment",
        }
    }
}

/// Discrete contribution to a score, kept for the explanation trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: f64,
    pub reason: String,
}

/// Request-level inputs shared by every candidate in one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringContext {
    pub now: DateTime<Utc>,
    pub tier: AmountTier,
}

impl ScoringContext {
    pub fn new(amount: Decimal, now: DateTime<Utc>, config: &SelectionConfig) -> Self {
        Self {
            now,
            tier: AmountTier::classify(amount, config),
        }
    }
}

/// A candidate together with its composite score and per-factor explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<C> {
    pub candidate: C,
    pub score: f64,
    pub components: Vec<ScoreComponent>,
    pub summary: String,
}

impl<C: Candidate> ScoredCandidate<C> {
    pub fn id(&self) -> &CandidateId {
        self.candidate.id()
    }

    pub fn name(&self) -> &str {
        self.candidate.name()
    }

    pub fn breakdown(&self) -> BTreeMap<ScoreFactor, f64> {
        self.components
            .iter()
            .map(|component| (component.factor, component.points))
            .collect()
    }

    pub fn reasons(&self) -> BTreeMap<ScoreFactor, String> {
        self.components
            .iter()
            .map(|component| (component.factor, component.reason.clone()))
            .collect()
    }

    /// Strongest positive contributions, largest first.
    pub fn leading_factors(&self, limit: usize) -> Vec<&ScoreComponent> {
        let mut positive: Vec<&ScoreComponent> = self
            .components
            .iter()
            .filter(|component| component.points > 0.0)
            .collect();
        positive.sort_by(|a, b| b.points.total_cmp(&a.points));
        positive.truncate(limit);
        positive
    }
}

/// Stateless scorer applying the weight table to a candidate snapshot.
pub struct Scorer;

impl Scorer {
    pub fn score<C: Candidate>(
        candidate: &C,
        amount: Decimal,
        context: &ScoringContext,
        config: &SelectionConfig,
    ) -> ScoredCandidate<C> {
        let fallback = UsageStats::default();
        let usage = candidate.usage().unwrap_or(&fallback);
        let weights = &config.weights;
        let ceiling = config.capacity_ceiling(candidate.limits().max_concurrent);

        let fit = candidate.amount_fit(amount, context.tier, usage);
        let components = vec![
            rules::capacity_headroom(usage, ceiling, weights.capacity),
            rules::success_rate(usage, weights.success_rate),
            rules::amount_fit(fit, weights.amount_fit),
            rules::freshness(usage, context.now, config.cooldown_minutes, weights.freshness),
            rules::speed(usage, weights.speed),
            rules::recency_penalty(
                usage,
                context.now,
                config.cooldown_minutes,
                weights.recency_penalty,
            ),
        ];

        let raw: f64 = components.iter().map(|component| component.points).sum();
        let score = if raw.is_finite() {
            raw.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let summary = summarize(candidate.name(), score, context.tier, &components);

        ScoredCandidate {
            candidate: candidate.clone(),
            score,
            components,
            summary,
        }
    }

    /// Score every candidate and order by score, highest first. Ties keep input order.
    pub fn score_all<C: Candidate>(
        candidates: &[C],
        amount: Decimal,
        context: &ScoringContext,
        config: &SelectionConfig,
    ) -> Vec<ScoredCandidate<C>> {
        let mut scored: Vec<ScoredCandidate<C>> = candidates
            .iter()
            .map(|candidate| Self::score(candidate, amount, context, config))
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }
}

fn summarize(name: &str, score: f64, tier: AmountTier, components: &[ScoreComponent]) -> String {
    let strongest = components
        .iter()
        .max_by(|a, b| a.points.total_cmp(&b.points));
    let weakest = components
        .iter()
        .min_by(|a, b| a.points.total_cmp(&b.points));

    match (strongest, weakest) {
        (Some(strongest), Some(weakest)) => format!(
            "{name} scored {score:.1} for a {} amount; strongest: {} ({:+.1}), weakest: {} ({:+.1})",
            tier.label(),
            strongest.factor.label(),
            strongest.points,
            weakest.factor.label(),
            weakest.points
        ),
        _ => format!("{name} scored {score:.1} for a {} amount", tier.label()),
    }
}
