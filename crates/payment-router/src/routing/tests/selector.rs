use super::common::*;
use crate::routing::{
    seeded_source, CandidateId, CollectionEndpoint, ScoredCandidate, SelectionConfig,
    WeightedSelector,
};
use std::collections::HashMap;

fn frequencies(
    pool: &[ScoredCandidate<CollectionEndpoint>],
    config: &SelectionConfig,
    trials: usize,
    seed: u64,
) -> HashMap<CandidateId, f64> {
    let mut rng = seeded_source(seed);
    let mut counts: HashMap<CandidateId, usize> = HashMap::new();
    for _ in 0..trials {
        let pick = WeightedSelector::pick(pool, config, &mut rng).expect("pool is not empty");
        *counts.entry(pick.id().clone()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(id, count)| (id, count as f64 / trials as f64))
        .collect()
}

#[test]
fn empty_pool_yields_nothing() {
    let (mut rng, counter) = ScriptedRandom::new(vec![0.5]);
    let pool: Vec<ScoredCandidate<CollectionEndpoint>> = Vec::new();

    assert!(WeightedSelector::pick(&pool, &config(), &mut rng).is_none());
    assert_eq!(calls(&counter), 0);
}

#[test]
fn nobody_above_threshold_yields_nothing() {
    let (mut rng, _) = ScriptedRandom::new(vec![0.5]);
    let pool = vec![scored("low-1", 29.9), scored("low-2", 10.0)];

    assert!(WeightedSelector::pick(&pool, &config(), &mut rng).is_none());
}

#[test]
fn single_survivor_is_returned_without_randomness() {
    let (mut rng, counter) = ScriptedRandom::new(vec![0.99]);
    let pool = vec![scored("only", 45.0), scored("low", 12.0)];

    let pick = WeightedSelector::pick(&pool, &config(), &mut rng).expect("one survivor");

    assert_eq!(pick.id(), &CandidateId::from("only"));
    assert_eq!(calls(&counter), 0);
}

#[test]
fn roulette_walk_follows_cumulative_weights() {
    let pool = vec![scored("a", 90.0), scored("b", 60.0), scored("c", 30.0)];
    // weights 8100 / 3600 / 900, total 12600
    let cases = [(0.0, "a"), (0.64, "a"), (0.7, "b"), (0.9, "b"), (0.95, "c"), (0.999, "c")];

    for (draw, expected) in cases {
        let (mut rng, counter) = ScriptedRandom::new(vec![draw]);
        let pick = WeightedSelector::pick(&pool, &config(), &mut rng).expect("pick");
        assert_eq!(pick.id(), &CandidateId::from(expected), "draw {draw}");
        assert_eq!(calls(&counter), 1);
    }
}

#[test]
fn draw_beyond_total_falls_back_to_highest() {
    let pool = vec![scored("a", 90.0), scored("b", 60.0)];
    let (mut rng, _) = ScriptedRandom::new(vec![1.5]);

    let pick = WeightedSelector::pick(&pool, &config(), &mut rng).expect("pick");

    assert_eq!(pick.id(), &CandidateId::from("a"));
}

#[test]
fn zero_scores_with_zero_threshold_pick_the_first() {
    let config = SelectionConfig {
        min_score_threshold: 0.0,
        ..SelectionConfig::default()
    };
    let pool = vec![scored("a", 0.0), scored("b", 0.0)];
    let (mut rng, _) = ScriptedRandom::new(vec![0.7]);

    let pick = WeightedSelector::pick(&pool, &config, &mut rng).expect("pick");

    assert_eq!(pick.id(), &CandidateId::from("a"));
}

#[test]
fn zero_weight_probabilities_match_the_fallback_pick() {
    let config = SelectionConfig {
        min_score_threshold: 0.0,
        ..SelectionConfig::default()
    };
    let pool = vec![scored("a", 0.0), scored("b", 0.0)];

    let probabilities = WeightedSelector::probabilities(&pool, &config);

    assert_eq!(
        probabilities,
        vec![(CandidateId::from("a"), 1.0), (CandidateId::from("b"), 0.0)]
    );
}

#[test]
fn only_top_slice_competes() {
    let config = SelectionConfig {
        max_candidates: 2,
        ..SelectionConfig::default()
    };
    let pool = vec![scored("a", 90.0), scored("b", 80.0), scored("c", 70.0)];

    let probabilities = WeightedSelector::probabilities(&pool, &config);

    assert_eq!(probabilities.len(), 2);
    assert!(probabilities
        .iter()
        .all(|(id, _)| id != &CandidateId::from("c")));
    let total: f64 = probabilities.iter().map(|(_, probability)| probability).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn squared_weights_match_empirical_frequencies() {
    let pool = vec![scored("a", 90.0), scored("b", 60.0), scored("c", 30.0)];

    let observed = frequencies(&pool, &config(), 20_000, 7);

    assert!((observed[&CandidateId::from("a")] - 8100.0 / 12600.0).abs() < 0.02);
    assert!((observed[&CandidateId::from("b")] - 3600.0 / 12600.0).abs() < 0.02);
    assert!((observed[&CandidateId::from("c")] - 900.0 / 12600.0).abs() < 0.02);
}

#[test]
fn below_threshold_candidate_is_never_drawn() {
    let pool = vec![scored("a", 95.0), scored("b", 55.0), scored("c", 20.0)];

    let observed = frequencies(&pool, &config(), 20_000, 11);

    assert!(!observed.contains_key(&CandidateId::from("c")));
    assert!((observed[&CandidateId::from("a")] - 0.749).abs() < 0.02);
    assert!((observed[&CandidateId::from("b")] - 0.251).abs() < 0.02);
}

#[test]
fn higher_exponent_sharpens_bias() {
    let pool = vec![scored("a", 90.0), scored("b", 60.0)];
    let flat = SelectionConfig {
        weight_exponent: 1.0,
        ..SelectionConfig::default()
    };
    let sharp = SelectionConfig {
        weight_exponent: 4.0,
        ..SelectionConfig::default()
    };

    let flat = WeightedSelector::probabilities(&pool, &flat);
    let sharp = WeightedSelector::probabilities(&pool, &sharp);

    assert!((flat[0].1 - 0.6).abs() < 1e-9);
    assert!(sharp[0].1 > flat[0].1);
}
