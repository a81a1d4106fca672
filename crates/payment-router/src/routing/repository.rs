use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Local, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::candidate::Candidate;
use super::domain::{AssignmentRecord, AssignmentStatus, CandidateId, UsageStats};
use super::usage::{self, DEFAULT_LATENCY_WINDOW};

/// Read-only access to routable candidates and their live counters.
pub trait CandidateRepository<C: Candidate>: Send + Sync {
    /// Active candidates, falling back to the legacy flag when none carry the primary one.
    fn fetch_eligible(&self, amount: Decimal) -> Result<Vec<C>, RepositoryError>;

    /// Fill in missing usage statistics. Never drops a candidate.
    fn enrich(&self, candidates: Vec<C>, now: DateTime<Utc>) -> Vec<C>;

    /// Fresh counters for a drawn candidate; `None` keeps the snapshot.
    fn current_usage(
        &self,
        candidate: &C,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageStats>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage of candidate records owned by the surrounding system.
pub trait CandidateStore<C>: Send + Sync {
    fn all(&self) -> Result<Vec<C>, RepositoryError>;
}

/// Transactional records of assignments per candidate.
pub trait AssignmentLedger: Send + Sync {
    /// Assignments made since `since`, plus any still pending regardless of age.
    fn assignments_for(
        &self,
        candidate_id: &CandidateId,
        since: DateTime<Utc>,
    ) -> Result<Vec<AssignmentRecord>, RepositoryError>;
}

/// Repository adapter combining a candidate store with the assignment ledger.
pub struct LedgerRepository<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    lookback: Duration,
    latency_window: usize,
}

impl<S, L> LedgerRepository<S, L> {
    pub fn new(store: Arc<S>, ledger: Arc<L>) -> Self {
        Self {
            store,
            ledger,
            lookback: Duration::days(7),
            latency_window: DEFAULT_LATENCY_WINDOW,
        }
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }
}

impl<C, S, L> CandidateRepository<C> for LedgerRepository<S, L>
where
    C: Candidate,
    S: CandidateStore<C>,
    L: AssignmentLedger,
{
    fn fetch_eligible(&self, amount: Decimal) -> Result<Vec<C>, RepositoryError> {
        let all = self.store.all()?;

        let active: Vec<C> = all
            .iter()
            .filter(|candidate| candidate.activity().is_active)
            .cloned()
            .collect();
        if !active.is_empty() {
            debug!(%amount, eligible = active.len(), "fetched active candidates");
            return Ok(active);
        }

        let legacy: Vec<C> = all
            .into_iter()
            .filter(|candidate| candidate.activity().legacy_enabled)
            .collect();
        debug!(%amount, eligible = legacy.len(), "no active candidates, using legacy flag");
        Ok(legacy)
    }

    fn enrich(&self, candidates: Vec<C>, now: DateTime<Utc>) -> Vec<C> {
        let since = now - self.lookback;
        candidates
            .into_iter()
            .map(|mut candidate| {
                if candidate.usage().is_some() {
                    return candidate;
                }
                let stats = match self.ledger.assignments_for(candidate.id(), since) {
                    Ok(records) => usage::aggregate(&records, now, &Local, self.latency_window),
                    Err(err) => {
                        warn!(
                            candidate = %candidate.id(),
                            error = %err,
                            "usage aggregation failed, using zeroed stats"
                        );
                        UsageStats::default()
                    }
                };
                candidate.set_usage(stats);
                candidate
            })
            .collect()
    }

    fn current_usage(
        &self,
        candidate: &C,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageStats>, RepositoryError> {
        let records = self
            .ledger
            .assignments_for(candidate.id(), now - self.lookback)?;
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(usage::aggregate(
            &records,
            now,
            &Local,
            self.latency_window,
        )))
    }
}

/// Candidate store held in memory, used by the CLI snapshot loader and tests.
#[derive(Debug)]
pub struct MemoryCandidateStore<C> {
    candidates: Mutex<Vec<C>>,
}

impl<C: Clone> MemoryCandidateStore<C> {
    pub fn new(candidates: Vec<C>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
        }
    }
}

impl<C: Clone + Send> CandidateStore<C> for MemoryCandidateStore<C> {
    fn all(&self) -> Result<Vec<C>, RepositoryError> {
        Ok(self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Assignment ledger held in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<AssignmentRecord>>,
}

impl MemoryLedger {
    pub fn new(records: Vec<AssignmentRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn push(&self, record: AssignmentRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

impl AssignmentLedger for MemoryLedger {
    fn assignments_for(
        &self,
        candidate_id: &CandidateId,
        since: DateTime<Utc>,
    ) -> Result<Vec<AssignmentRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .iter()
            .filter(|record| &record.candidate_id == candidate_id)
            .filter(|record| {
                record.assigned_at >= since || record.status == AssignmentStatus::Pending
            })
            .cloned()
            .collect())
    }
}
