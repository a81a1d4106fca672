//! Selection orchestrator shared by the payin and payout routers.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::candidate::Candidate;
use super::domain::{RouterKind, UsageStats};
use super::explanation::{
    rationale, ExplanationEntry, ExplanationSink, RankedCandidateView, WinnerView,
};
use super::fallback::{FallbackCoordinator, FallbackOutcome};
use super::repository::CandidateRepository;
use super::result::{SelectedCandidate, SelectionFailure, SelectionResult};
use super::scoring::{AmountTier, ScoredCandidate, Scorer, ScoringContext};
use super::selector::{entropy_source, RandomSource};
use super::settings::{resolve_from, ConfigSource, SelectionConfig};
use super::validation::{RealtimeValidator, Rejection};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Engine-wide random source, locked for one draw at a time.
struct SharedRandom<'a>(&'a Mutex<Box<dyn RandomSource>>);

impl RandomSource for SharedRandom<'_> {
    fn next_unit(&mut self) -> f64 {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_unit()
    }
}

/// Identifiers of one inbound selection request.
#[derive(Debug, Clone, Copy)]
struct SelectionRequest<'a> {
    amount: Decimal,
    subject_id: &'a str,
    request_id: &'a str,
    now: DateTime<Utc>,
}

/// Generic engine over one candidate kind.
///
/// Each call to [`SelectionEngine::select`] works on a fresh snapshot. The random source is
/// the only state shared between calls.
pub struct SelectionEngine<C, R: ?Sized, X: ?Sized> {
    kind: RouterKind,
    repository: Arc<R>,
    sink: Arc<X>,
    config_source: Arc<dyn ConfigSource>,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn RandomSource>>,
    _candidate: PhantomData<fn() -> C>,
}

impl<C, R, X> SelectionEngine<C, R, X>
where
    C: Candidate,
    R: CandidateRepository<C> + ?Sized,
    X: ExplanationSink + ?Sized,
{
    pub fn new(
        kind: RouterKind,
        repository: Arc<R>,
        sink: Arc<X>,
        config_source: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            kind,
            repository,
            sink,
            config_source,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(Box::new(entropy_source())),
            _candidate: PhantomData,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random_source<G: RandomSource + 'static>(mut self, rng: G) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    /// Configuration as it would be resolved for the next request.
    pub fn config(&self) -> SelectionConfig {
        resolve_from(self.config_source.as_ref())
    }

    /// Eligible candidates for `amount`, scored and ranked, without drawing.
    pub fn rank(&self, amount: Decimal) -> Result<Vec<ScoredCandidate<C>>, SelectionFailure> {
        let config = self.config();
        self.ranked(amount, self.clock.now(), &config)
    }

    /// Pick one candidate for a request. Never fails; failures are part of the result.
    pub fn select(&self, amount: Decimal, subject_id: &str, request_id: &str) -> SelectionResult {
        let request = SelectionRequest {
            amount,
            subject_id,
            request_id,
            now: self.clock.now(),
        };
        let config = self.config();

        let scored = match self.ranked(amount, request.now, &config) {
            Ok(scored) => scored,
            Err(failure) => {
                let outcome = FallbackOutcome::Failed {
                    failure,
                    attempts: Vec::new(),
                };
                return self.conclude(&request, &config, &[], outcome);
            }
        };

        let mut rng = SharedRandom(&self.rng);
        let outcome = FallbackCoordinator::run(&scored, &config, &mut rng, |pick| {
            self.revalidate(pick, amount, request.now, &config)
        });

        self.conclude(&request, &config, &scored, outcome)
    }

    fn ranked(
        &self,
        amount: Decimal,
        now: DateTime<Utc>,
        config: &SelectionConfig,
    ) -> Result<Vec<ScoredCandidate<C>>, SelectionFailure> {
        if amount <= Decimal::ZERO {
            return Err(SelectionFailure::InvalidAmount { amount });
        }

        let candidates = self.repository.fetch_eligible(amount).map_err(|err| {
            warn!(router = self.kind.label(), error = %err, "candidate fetch failed");
            SelectionFailure::RepositoryUnavailable {
                reason: err.to_string(),
            }
        })?;
        if candidates.is_empty() {
            return Err(SelectionFailure::NoCandidates);
        }

        let candidates = self.repository.enrich(candidates, now);
        let context = ScoringContext::new(amount, now, config);
        let scored = Scorer::score_all(&candidates, amount, &context, config);
        debug!(
            router = self.kind.label(),
            eligible = scored.len(),
            tier = context.tier.label(),
            top_score = scored.first().map(|candidate| candidate.score),
            "candidates scored"
        );
        Ok(scored)
    }

    /// Validate a drawn candidate against the snapshot reconciled with fresh counters.
    fn revalidate(
        &self,
        pick: &ScoredCandidate<C>,
        amount: Decimal,
        now: DateTime<Utc>,
        config: &SelectionConfig,
    ) -> Result<(), Rejection> {
        let snapshot = pick.candidate.usage().cloned().unwrap_or_default();
        let usage: UsageStats = match self.repository.current_usage(&pick.candidate, now) {
            Ok(Some(fresh)) => snapshot.reconcile(&fresh),
            Ok(None) => snapshot,
            Err(err) => {
                warn!(
                    candidate = %pick.id(),
                    error = %err,
                    "usage refresh failed, validating against snapshot"
                );
                snapshot
            }
        };
        RealtimeValidator::validate(&pick.candidate, &usage, amount, now, config)
    }

    fn conclude(
        &self,
        request: &SelectionRequest<'_>,
        config: &SelectionConfig,
        scored: &[ScoredCandidate<C>],
        outcome: FallbackOutcome<C>,
    ) -> SelectionResult {
        let explanation = match &outcome {
            FallbackOutcome::Selected { winner, attempts } => {
                rationale(scored, Some(winner), attempts, None)
            }
            FallbackOutcome::Failed { failure, attempts } => {
                rationale(scored, None, attempts, Some(failure))
            }
        };

        if config.logging_enabled {
            self.record(request, config, scored, &outcome, &explanation);
        }

        match outcome {
            FallbackOutcome::Selected { winner, attempts } => {
                info!(
                    router = self.kind.label(),
                    request_id = request.request_id,
                    candidate = %winner.id(),
                    score = winner.score,
                    attempts = attempts.len(),
                    "candidate selected"
                );
                SelectionResult::selected(
                    SelectedCandidate::from_scored(&winner),
                    attempts,
                    explanation,
                )
            }
            FallbackOutcome::Failed { failure, attempts } => {
                info!(
                    router = self.kind.label(),
                    request_id = request.request_id,
                    error = %failure,
                    attempts = attempts.len(),
                    "no candidate selected"
                );
                SelectionResult::failed(failure, attempts, explanation)
            }
        }
    }

    fn record(
        &self,
        request: &SelectionRequest<'_>,
        config: &SelectionConfig,
        scored: &[ScoredCandidate<C>],
        outcome: &FallbackOutcome<C>,
        explanation: &str,
    ) {
        let (winner, error) = match outcome {
            FallbackOutcome::Selected { winner, .. } => (
                Some(WinnerView {
                    candidate_id: winner.id().clone(),
                    candidate_name: winner.name().to_string(),
                    score: winner.score,
                    rationale: explanation.to_string(),
                }),
                None,
            ),
            FallbackOutcome::Failed { failure, .. } => (None, Some(failure.to_string())),
        };

        let entry = ExplanationEntry {
            request_id: request.request_id.to_string(),
            subject_id: request.subject_id.to_string(),
            router: self.kind,
            amount: request.amount,
            amount_tier: AmountTier::classify(request.amount, config),
            ranked: RankedCandidateView::top(scored),
            success: winner.is_some(),
            winner,
            error,
            attempts: outcome.attempts().to_vec(),
            config: config.clone(),
            recorded_at: request.now,
        };

        if let Err(err) = self.sink.record(&entry) {
            warn!(request_id = request.request_id, error = %err, "explanation entry dropped");
        }
    }
}
