use std::collections::HashSet;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::common::*;
use crate::routing::{
    seeded_source, AmountTier, CandidateId, FallbackCoordinator, Rejection, Scorer,
    ScoringContext, SelectionConfig, UsageStats,
};

fn usage_strategy() -> impl Strategy<Value = UsageStats> {
    (
        0u32..20,
        0u32..50,
        0u32..50,
        0u32..50,
        proptest::option::of(0.0f64..500.0),
        proptest::option::of(0i64..600),
    )
        .prop_map(|(active, completed, cancelled, failed, average, idle)| UsageStats {
            active_workload: active,
            completed_today: completed,
            cancelled_today: cancelled,
            failed_today: failed,
            avg_completion_minutes: average,
            last_assigned_at: idle.map(minutes_ago),
            ..UsageStats::default()
        })
}

proptest! {
    #[test]
    fn tier_classification_is_idempotent(cents in 1i64..10_000_000) {
        let config = SelectionConfig::default();
        let amount = Decimal::new(cents, 2);
        let first = AmountTier::classify(amount, &config);
        prop_assert_eq!(first, AmountTier::classify(amount, &config));
        let expected = if amount <= config.small_amount_ceiling {
            AmountTier::Small
        } else if amount >= config.large_amount_floor {
            AmountTier::Large
        } else {
            AmountTier::Medium
        };
        prop_assert_eq!(first, expected);
    }

    #[test]
    fn scores_stay_within_bounds(usage in usage_strategy(), cents in 1i64..5_000_000) {
        let config = SelectionConfig::default();
        let amount = Decimal::new(cents, 2);
        let context = ScoringContext::new(amount, now(), &config);
        let scored = Scorer::score(&endpoint_with_usage("ep", usage), amount, &context, &config);
        prop_assert!((0.0..=100.0).contains(&scored.score));
        prop_assert_eq!(scored.components.len(), 6);
    }

    #[test]
    fn fallback_respects_budget_and_never_repeats(
        scores in proptest::collection::vec(0.0f64..100.0, 1..12),
        rejected in proptest::collection::vec(any::<bool>(), 12),
        attempts in 1u32..6,
        seed in any::<u64>(),
    ) {
        let config = SelectionConfig {
            max_fallback_attempts: attempts,
            ..SelectionConfig::default()
        };
        let mut pool: Vec<_> = scores
            .iter()
            .enumerate()
            .map(|(index, score)| scored(&format!("ep-{index}"), *score))
            .collect();
        pool.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut rng = seeded_source(seed);

        let outcome = FallbackCoordinator::run(&pool, &config, &mut rng, |candidate| {
            let index: usize = candidate.id().0.trim_start_matches("ep-").parse().unwrap_or(0);
            if rejected[index] {
                Err(Rejection::Inactive)
            } else {
                Ok(())
            }
        });

        let trail = outcome.attempts();
        prop_assert!(trail.len() as u32 <= config.attempt_budget());
        let distinct: HashSet<&CandidateId> =
            trail.iter().map(|attempt| &attempt.candidate_id).collect();
        prop_assert_eq!(distinct.len(), trail.len());
        prop_assert!(trail.iter().rev().skip(1).all(|attempt| !attempt.valid));
        for attempt in trail {
            prop_assert!(attempt.score >= config.min_score_threshold);
        }
    }
}
