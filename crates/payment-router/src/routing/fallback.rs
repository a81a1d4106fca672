//! Bounded draw-and-validate loop that excludes rejected candidates.

use std::collections::HashSet;

use tracing::debug;

use super::candidate::Candidate;
use super::domain::CandidateId;
use super::result::{SelectionAttempt, SelectionFailure};
use super::scoring::ScoredCandidate;
use super::selector::{RandomSource, WeightedSelector};
use super::settings::SelectionConfig;
use super::validation::Rejection;

/// States of the fallback chain. `Success` and `Failure` are terminal.
#[derive(Debug)]
enum FallbackState<'a, C> {
    Attempting(u32),
    Success(&'a ScoredCandidate<C>),
    Failure(SelectionFailure),
}

/// Terminal outcome, always carrying the full attempt trail.
#[derive(Debug, Clone)]
pub enum FallbackOutcome<C> {
    Selected {
        winner: ScoredCandidate<C>,
        attempts: Vec<SelectionAttempt>,
    },
    Failed {
        failure: SelectionFailure,
        attempts: Vec<SelectionAttempt>,
    },
}

impl<C> FallbackOutcome<C> {
    pub fn attempts(&self) -> &[SelectionAttempt] {
        match self {
            FallbackOutcome::Selected { attempts, .. }
            | FallbackOutcome::Failed { attempts, .. } => attempts,
        }
    }
}

pub struct FallbackCoordinator;

impl FallbackCoordinator {
    /// Draw, validate, and on rejection retry over the remaining pool.
    ///
    /// At most `config.attempt_budget()` candidates are validated; a rejected candidate is
    /// never drawn again within the same run.
    pub fn run<C, F>(
        scored: &[ScoredCandidate<C>],
        config: &SelectionConfig,
        rng: &mut dyn RandomSource,
        mut validate: F,
    ) -> FallbackOutcome<C>
    where
        C: Candidate,
        F: FnMut(&ScoredCandidate<C>) -> Result<(), Rejection>,
    {
        let budget = config.attempt_budget();
        let mut excluded: HashSet<CandidateId> = HashSet::new();
        let mut attempts: Vec<SelectionAttempt> = Vec::new();
        let mut state = FallbackState::Attempting(1);

        loop {
            state = match state {
                FallbackState::Attempting(attempt) => {
                    let pool: Vec<&ScoredCandidate<C>> = scored
                        .iter()
                        .filter(|candidate| !excluded.contains(candidate.id()))
                        .collect();

                    if pool.is_empty() {
                        FallbackState::Failure(Self::empty_pool(excluded.len()))
                    } else {
                        match WeightedSelector::pick(pool.iter().copied(), config, rng) {
                            None if excluded.is_empty() => {
                                FallbackState::Failure(SelectionFailure::NoneAboveThreshold {
                                    threshold: config.min_score_threshold,
                                })
                            }
                            None => FallbackState::Failure(Self::empty_pool(excluded.len())),
                            Some(pick) => match validate(pick) {
                                Ok(()) => {
                                    debug!(
                                        attempt,
                                        candidate = %pick.id(),
                                        score = pick.score,
                                        "candidate accepted"
                                    );
                                    attempts.push(SelectionAttempt::accepted(attempt, pick));
                                    FallbackState::Success(pick)
                                }
                                Err(rejection) => {
                                    debug!(
                                        attempt,
                                        candidate = %pick.id(),
                                        reason = %rejection,
                                        "candidate rejected"
                                    );
                                    attempts.push(SelectionAttempt::rejected(
                                        attempt, pick, rejection,
                                    ));
                                    excluded.insert(pick.id().clone());
                                    if attempt >= budget {
                                        FallbackState::Failure(
                                            SelectionFailure::AttemptsExhausted {
                                                attempts: attempt,
                                            },
                                        )
                                    } else {
                                        FallbackState::Attempting(attempt + 1)
                                    }
                                }
                            },
                        }
                    }
                }
                FallbackState::Success(winner) => {
                    return FallbackOutcome::Selected {
                        winner: winner.clone(),
                        attempts,
                    }
                }
                FallbackState::Failure(failure) => {
                    return FallbackOutcome::Failed { failure, attempts }
                }
            };
        }
    }

    fn empty_pool(excluded: usize) -> SelectionFailure {
        if excluded == 0 {
            SelectionFailure::NoCandidates
        } else {
            SelectionFailure::PoolExhausted { excluded }
        }
    }
}
