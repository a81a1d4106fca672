use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::routing::{
    ActivityFlags, AmountTier, AssignmentLedger, AssignmentRecord, CandidateId, CandidateLimits,
    CandidateRepository, CandidateStore, Clock, CollectionEndpoint, ExplanationEntry,
    ExplanationSink, FixedClock, MemorySink, PayinRouter, RandomSource, RepositoryError,
    RouterKind, ScoredCandidate, SelectionConfig, SelectionOverrides, SettlementAgent, SinkError,
    StaticConfigSource, UsageStats,
};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - Duration::minutes(minutes)
}

pub(super) fn config() -> SelectionConfig {
    SelectionConfig::default()
}

/// Never assigned, nothing settled, nothing in flight.
pub(super) fn idle_usage() -> UsageStats {
    UsageStats::default()
}

pub(super) fn endpoint(id: &str) -> CollectionEndpoint {
    CollectionEndpoint {
        id: CandidateId::from(id),
        name: format!("Endpoint {id}"),
        activity: ActivityFlags::active(),
        limits: CandidateLimits::default(),
        usage: Some(idle_usage()),
    }
}

pub(super) fn endpoint_with_usage(id: &str, usage: UsageStats) -> CollectionEndpoint {
    CollectionEndpoint {
        usage: Some(usage),
        ..endpoint(id)
    }
}

pub(super) fn agent(id: &str, tiers: Vec<AmountTier>) -> SettlementAgent {
    SettlementAgent {
        id: CandidateId::from(id),
        name: format!("Agent {id}"),
        activity: ActivityFlags::active(),
        limits: CandidateLimits::default(),
        preferred_tiers: tiers,
        usage: Some(idle_usage()),
    }
}

pub(super) fn scored(id: &str, score: f64) -> ScoredCandidate<CollectionEndpoint> {
    ScoredCandidate {
        candidate: endpoint(id),
        score,
        components: Vec::new(),
        summary: format!("{id} scored {score}"),
    }
}

/// Replays scripted draws and counts how many were consumed.
pub(super) struct ScriptedRandom {
    values: Vec<f64>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedRandom {
    pub(super) fn new(values: Vec<f64>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                values,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.values
            .get(index)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0.0)
    }
}

pub(super) fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Repository over a fixed pool with optional fresh counters served at draw time.
pub(super) struct StaticRepository<C> {
    pub(super) candidates: Vec<C>,
    pub(super) fresh: Mutex<HashMap<CandidateId, UsageStats>>,
    pub(super) fetches: AtomicUsize,
}

impl<C> StaticRepository<C> {
    pub(super) fn new(candidates: Vec<C>) -> Self {
        Self {
            candidates,
            fresh: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub(super) fn with_fresh(self, id: &str, usage: UsageStats) -> Self {
        self.fresh
            .lock()
            .expect("fresh usage mutex poisoned")
            .insert(CandidateId::from(id), usage);
        self
    }

    pub(super) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl<C: crate::routing::Candidate> CandidateRepository<C> for StaticRepository<C> {
    fn fetch_eligible(&self, _amount: Decimal) -> Result<Vec<C>, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .candidates
            .iter()
            .filter(|candidate| candidate.activity().is_active)
            .cloned()
            .collect())
    }

    fn enrich(&self, candidates: Vec<C>, _now: DateTime<Utc>) -> Vec<C> {
        candidates
    }

    fn current_usage(
        &self,
        candidate: &C,
        _now: DateTime<Utc>,
    ) -> Result<Option<UsageStats>, RepositoryError> {
        Ok(self
            .fresh
            .lock()
            .expect("fresh usage mutex poisoned")
            .get(candidate.id())
            .cloned())
    }
}

/// Serves an idle pool but holds every draw-time usage read open for `delay`, tracking how
/// many reads overlap.
pub(super) struct SlowUsageRepository {
    pub(super) candidates: Vec<CollectionEndpoint>,
    pub(super) delay: std::time::Duration,
    pub(super) in_flight: AtomicUsize,
    pub(super) peak: AtomicUsize,
}

impl SlowUsageRepository {
    pub(super) fn new(candidates: Vec<CollectionEndpoint>, delay: std::time::Duration) -> Self {
        Self {
            candidates,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(super) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl CandidateRepository<CollectionEndpoint> for SlowUsageRepository {
    fn fetch_eligible(&self, _amount: Decimal) -> Result<Vec<CollectionEndpoint>, RepositoryError> {
        Ok(self.candidates.clone())
    }

    fn enrich(
        &self,
        candidates: Vec<CollectionEndpoint>,
        _now: DateTime<Utc>,
    ) -> Vec<CollectionEndpoint> {
        candidates
    }

    fn current_usage(
        &self,
        _candidate: &CollectionEndpoint,
        _now: DateTime<Utc>,
    ) -> Result<Option<UsageStats>, RepositoryError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(None)
    }
}

pub(super) struct UnavailableRepository;

impl CandidateRepository<CollectionEndpoint> for UnavailableRepository {
    fn fetch_eligible(&self, _amount: Decimal) -> Result<Vec<CollectionEndpoint>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn enrich(
        &self,
        candidates: Vec<CollectionEndpoint>,
        _now: DateTime<Utc>,
    ) -> Vec<CollectionEndpoint> {
        candidates
    }

    fn current_usage(
        &self,
        _candidate: &CollectionEndpoint,
        _now: DateTime<Utc>,
    ) -> Result<Option<UsageStats>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl<C> CandidateStore<C> for UnavailableStore {
    fn all(&self) -> Result<Vec<C>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

pub(super) struct FailingLedger;

impl AssignmentLedger for FailingLedger {
    fn assignments_for(
        &self,
        _candidate_id: &CandidateId,
        _since: DateTime<Utc>,
    ) -> Result<Vec<AssignmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct FailingSink {
    pub(super) calls: AtomicUsize,
}

impl ExplanationSink for FailingSink {
    fn record(&self, _entry: &ExplanationEntry) -> Result<(), SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Unavailable("audit store offline".to_string()))
    }
}

pub(super) fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(now()))
}

pub(super) fn payin_router(
    repository: Arc<StaticRepository<CollectionEndpoint>>,
    overrides: SelectionOverrides,
    draws: Vec<f64>,
) -> (
    PayinRouter<StaticRepository<CollectionEndpoint>, MemorySink>,
    Arc<MemorySink>,
    Arc<AtomicUsize>,
) {
    let sink = Arc::new(MemorySink::default());
    let (rng, counter) = ScriptedRandom::new(draws);
    let router = PayinRouter::new(
        RouterKind::Payin,
        repository,
        Arc::clone(&sink),
        Arc::new(StaticConfigSource::new(overrides)),
    )
    .with_clock(fixed_clock())
    .with_random_source(rng);
    (router, sink, counter)
}
