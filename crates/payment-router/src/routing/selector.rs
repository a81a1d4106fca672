//! Score-weighted roulette draw over ranked candidates.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::candidate::Candidate;
use super::domain::CandidateId;
use super::scoring::ScoredCandidate;
use super::settings::SelectionConfig;

/// Source of uniform draws, injectable so tests can reproduce a sequence.
pub trait RandomSource: Send {
    /// Uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl RandomSource for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Non-deterministic source seeded from the operating system.
pub fn entropy_source() -> StdRng {
    StdRng::from_entropy()
}

/// Reproducible source for tests and simulations.
pub fn seeded_source(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub struct WeightedSelector;

impl WeightedSelector {
    /// Draw one candidate. Input must already be sorted by score, highest first.
    ///
    /// Returns `None` when nobody clears the threshold. A single survivor is returned
    /// without consuming randomness.
    pub fn pick<'a, C, I>(
        scored: I,
        config: &SelectionConfig,
        rng: &mut dyn RandomSource,
    ) -> Option<&'a ScoredCandidate<C>>
    where
        C: Candidate,
        I: IntoIterator<Item = &'a ScoredCandidate<C>>,
    {
        let pool = Self::competing(scored, config);
        match pool.len() {
            0 => return None,
            1 => return pool.first().copied(),
            _ => {}
        }

        let weights: Vec<f64> = pool
            .iter()
            .map(|candidate| Self::weight(candidate.score, config.weight_exponent))
            .collect();
        let total: f64 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Self::highest(&pool);
        }

        let mut remainder = rng.next_unit() * total;
        for (candidate, weight) in pool.iter().zip(&weights) {
            remainder -= weight;
            if remainder <= 0.0 {
                return Some(*candidate);
            }
        }

        Self::highest(&pool)
    }

    pub fn weight(score: f64, exponent: f64) -> f64 {
        score.max(0.0).powf(exponent)
    }

    /// Selection probability of every candidate that would enter the draw.
    ///
    /// Mirrors [`WeightedSelector::pick`]: when the weights carry no signal the highest-scored
    /// candidate is certain.
    pub fn probabilities<'a, C, I>(scored: I, config: &SelectionConfig) -> Vec<(CandidateId, f64)>
    where
        C: Candidate,
        I: IntoIterator<Item = &'a ScoredCandidate<C>>,
    {
        let pool = Self::competing(scored, config);
        let weights: Vec<f64> = pool
            .iter()
            .map(|candidate| Self::weight(candidate.score, config.weight_exponent))
            .collect();
        let total: f64 = weights.iter().sum();

        if pool.len() == 1 || !total.is_finite() || total <= 0.0 {
            let favourite = Self::highest(&pool).map(|candidate| candidate.id());
            return pool
                .iter()
                .map(|candidate| {
                    let certain = Some(candidate.id()) == favourite;
                    (candidate.id().clone(), if certain { 1.0 } else { 0.0 })
                })
                .collect();
        }

        pool.iter()
            .zip(weights)
            .map(|(candidate, weight)| (candidate.id().clone(), weight / total))
            .collect()
    }

    fn competing<'a, C, I>(scored: I, config: &SelectionConfig) -> Vec<&'a ScoredCandidate<C>>
    where
        C: Candidate,
        I: IntoIterator<Item = &'a ScoredCandidate<C>>,
    {
        let mut pool: Vec<&'a ScoredCandidate<C>> = scored
            .into_iter()
            .filter(|candidate| candidate.score >= config.min_score_threshold)
            .collect();
        if pool.len() > 1 {
            pool.truncate(config.max_candidates.max(1));
        }
        pool
    }

    fn highest<'a, C>(pool: &[&'a ScoredCandidate<C>]) -> Option<&'a ScoredCandidate<C>> {
        pool.iter()
            .copied()
            .reduce(|best, candidate| {
                if candidate.score > best.score {
                    candidate
                } else {
                    best
                }
            })
    }
}
