//! Per-decision explanation entries and the sinks that receive them.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use super::candidate::Candidate;
use super::domain::{CandidateId, RouterKind};
use super::result::{SelectionAttempt, SelectionFailure};
use super::scoring::{AmountTier, ScoreFactor, ScoredCandidate};
use super::settings::SelectionConfig;

/// Number of ranked candidates kept in an entry.
pub const RANKED_LIMIT: usize = 10;

/// Number of factors named in a rationale.
const LEADING_FACTORS: usize = 2;

/// Structured audit record for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationEntry {
    pub request_id: String,
    pub subject_id: String,
    pub router: RouterKind,
    pub amount: Decimal,
    pub amount_tier: AmountTier,
    pub ranked: Vec<RankedCandidateView>,
    pub winner: Option<WinnerView>,
    pub success: bool,
    pub error: Option<String>,
    pub attempts: Vec<SelectionAttempt>,
    pub config: SelectionConfig,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidateView {
    pub rank: usize,
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub score: f64,
    pub breakdown: BTreeMap<ScoreFactor, f64>,
    pub reasons: BTreeMap<ScoreFactor, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinnerView {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub score: f64,
    pub rationale: String,
}

impl RankedCandidateView {
    pub(crate) fn top<C: Candidate>(scored: &[ScoredCandidate<C>]) -> Vec<Self> {
        scored
            .iter()
            .take(RANKED_LIMIT)
            .enumerate()
            .map(|(index, candidate)| Self {
                rank: index + 1,
                candidate_id: candidate.id().clone(),
                candidate_name: candidate.name().to_string(),
                score: candidate.score,
                breakdown: candidate.breakdown(),
                reasons: candidate.reasons(),
            })
            .collect()
    }
}

/// Human readable rationale: winner vs runner-up gap, leading factors, skipped candidates.
pub fn rationale<C: Candidate>(
    scored: &[ScoredCandidate<C>],
    winner: Option<&ScoredCandidate<C>>,
    attempts: &[SelectionAttempt],
    failure: Option<&SelectionFailure>,
) -> String {
    let mut parts = Vec::new();

    match (winner, failure) {
        (Some(winner), _) => {
            let runner_up = scored
                .iter()
                .find(|candidate| candidate.id() != winner.id());
            parts.push(match runner_up {
                Some(runner_up) => format!(
                    "Selected {} (score {:.1}) over {} (score {:.1}), gap {:+.1}",
                    winner.name(),
                    winner.score,
                    runner_up.name(),
                    runner_up.score,
                    winner.score - runner_up.score
                ),
                None => format!(
                    "Selected {} (score {:.1}), the only candidate",
                    winner.name(),
                    winner.score
                ),
            });

            let leading: Vec<String> = winner
                .leading_factors(LEADING_FACTORS)
                .iter()
                .map(|component| format!("{} {:+.1}", component.factor.label(), component.points))
                .collect();
            if !leading.is_empty() {
                parts.push(format!("leading factors: {}", leading.join(", ")));
            }
        }
        (None, Some(failure)) => parts.push(format!("No candidate selected: {failure}")),
        (None, None) => parts.push("No candidate selected".to_string()),
    }

    let skipped: Vec<String> = attempts
        .iter()
        .filter(|attempt| !attempt.valid)
        .map(|attempt| {
            format!(
                "{} ({})",
                attempt.candidate_name,
                attempt.reason.as_deref().unwrap_or("rejected")
            )
        })
        .collect();
    if !skipped.is_empty() {
        parts.push(format!("skipped: {}", skipped.join(", ")));
    }

    parts.join("; ")
}

/// Receiver of explanation entries. Failures are reported but never reach callers.
pub trait ExplanationSink: Send + Sync {
    fn record(&self, entry: &ExplanationEntry) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("explanation sink io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("explanation entry could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("explanation sink unavailable: {0}")]
    Unavailable(String),
}

impl<S: ExplanationSink + ?Sized> ExplanationSink for Arc<S> {
    fn record(&self, entry: &ExplanationEntry) -> Result<(), SinkError> {
        (**self).record(entry)
    }
}

/// Emits each entry as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ExplanationSink for TracingSink {
    fn record(&self, entry: &ExplanationEntry) -> Result<(), SinkError> {
        let payload = serde_json::to_string(entry)?;
        info!(
            request_id = %entry.request_id,
            router = entry.router.label(),
            success = entry.success,
            winner = entry.winner.as_ref().map(|winner| winner.candidate_id.0.as_str()),
            entry = %payload,
            "selection explained"
        );
        Ok(())
    }
}

/// Appends one JSON document per line to a file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExplanationSink for JsonLinesSink {
    fn record(&self, entry: &ExplanationEntry) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }
}

/// Keeps entries in memory for inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<ExplanationEntry>>,
}

impl MemorySink {
    pub fn entries(&self) -> Vec<ExplanationEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<ExplanationEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl ExplanationSink for MemorySink {
    fn record(&self, entry: &ExplanationEntry) -> Result<(), SinkError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

/// Fans one entry out to two sinks; both are attempted even when the first fails.
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A, B> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: ExplanationSink, B: ExplanationSink> ExplanationSink for TeeSink<A, B> {
    fn record(&self, entry: &ExplanationEntry) -> Result<(), SinkError> {
        let first = self.first.record(entry);
        let second = self.second.record(entry);
        first.and(second)
    }
}
