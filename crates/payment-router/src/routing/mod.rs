//! Candidate scoring, weighted draw, validation and fallback for payment routing.

mod candidate;
mod domain;
mod engine;
mod explanation;
mod fallback;
mod payin;
mod payout;
mod repository;
mod result;
mod scoring;
mod selector;
mod settings;
mod snapshot;
pub mod usage;
mod validation;

#[cfg(test)]
mod tests;

pub use candidate::{AmountFit, Candidate};
pub use domain::{
    ActivityFlags, AssignmentRecord, AssignmentStatus, CandidateId, CandidateLimits,
    CollectionEndpoint, RouterKind, SettlementAgent, UsageStats,
};
pub use engine::{Clock, FixedClock, SelectionEngine, SystemClock};
pub use explanation::{
    rationale, ExplanationEntry, ExplanationSink, JsonLinesSink, MemorySink,
    RankedCandidateView, SinkError, TeeSink, TracingSink, WinnerView, RANKED_LIMIT,
};
pub use fallback::{FallbackCoordinator, FallbackOutcome};
pub use payin::PayinRouter;
pub use payout::PayoutRouter;
pub use repository::{
    AssignmentLedger, CandidateRepository, CandidateStore, LedgerRepository,
    MemoryCandidateStore, MemoryLedger, RepositoryError,
};
pub use result::{SelectedCandidate, SelectionAttempt, SelectionFailure, SelectionResult};
pub use scoring::{AmountTier, ScoreComponent, ScoreFactor, ScoredCandidate, Scorer, ScoringContext};
pub use selector::{entropy_source, seeded_source, RandomSource, WeightedSelector};
pub use settings::{
    resolve_from, ConfigSource, ConfigSourceError, EnvConfigSource, JsonFileConfigSource,
    ScoringWeightOverrides, ScoringWeights, SelectionConfig, SelectionOverrides,
    StaticConfigSource,
};
pub use snapshot::{RoutingSnapshot, SnapshotError};
pub use validation::{RealtimeValidator, Rejection};
