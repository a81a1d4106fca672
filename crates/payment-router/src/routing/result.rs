use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use super::candidate::Candidate;
use super::domain::CandidateId;
use super::scoring::{ScoreFactor, ScoredCandidate};
use super::validation::Rejection;

/// One step of the fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionAttempt {
    pub attempt: u32,
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub score: f64,
    pub valid: bool,
    pub reason: Option<String>,
    pub rejection: Option<Rejection>,
}

impl SelectionAttempt {
    pub(crate) fn accepted<C: Candidate>(attempt: u32, scored: &ScoredCandidate<C>) -> Self {
        Self {
            attempt,
            candidate_id: scored.id().clone(),
            candidate_name: scored.name().to_string(),
            score: scored.score,
            valid: true,
            reason: None,
            rejection: None,
        }
    }

    pub(crate) fn rejected<C: Candidate>(
        attempt: u32,
        scored: &ScoredCandidate<C>,
        rejection: Rejection,
    ) -> Self {
        Self {
            attempt,
            candidate_id: scored.id().clone(),
            candidate_name: scored.name().to_string(),
            score: scored.score,
            valid: false,
            reason: Some(rejection.to_string()),
            rejection: Some(rejection),
        }
    }
}

/// Classification of a selection that produced no candidate.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum SelectionFailure {
    #[error("invalid amount {amount}: must be positive")]
    InvalidAmount { amount: Decimal },
    #[error("no candidates available")]
    NoCandidates,
    #[error("candidate repository unavailable: {reason}")]
    RepositoryUnavailable { reason: String },
    #[error("no candidate met the minimum score threshold of {threshold}")]
    NoneAboveThreshold { threshold: f64 },
    #[error("no eligible candidates left after excluding {excluded} rejected candidate(s)")]
    PoolExhausted { excluded: usize },
    #[error("all {attempts} selection attempt(s) were rejected")]
    AttemptsExhausted { attempts: u32 },
}

/// The winning candidate as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedCandidate {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub score: f64,
    pub summary: String,
    pub breakdown: BTreeMap<ScoreFactor, f64>,
    pub reasons: BTreeMap<ScoreFactor, String>,
}

impl SelectedCandidate {
    pub(crate) fn from_scored<C: Candidate>(scored: &ScoredCandidate<C>) -> Self {
        Self {
            candidate_id: scored.id().clone(),
            candidate_name: scored.name().to_string(),
            score: scored.score,
            summary: scored.summary.clone(),
            breakdown: scored.breakdown(),
            reasons: scored.reasons(),
        }
    }
}

/// Engine output. `selected` is present exactly when `success` is true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    success: bool,
    selected: Option<SelectedCandidate>,
    error: Option<SelectionFailure>,
    attempts: Vec<SelectionAttempt>,
    explanation: String,
}

impl SelectionResult {
    pub fn selected(
        selected: SelectedCandidate,
        attempts: Vec<SelectionAttempt>,
        explanation: String,
    ) -> Self {
        Self {
            success: true,
            selected: Some(selected),
            error: None,
            attempts,
            explanation,
        }
    }

    pub fn failed(
        error: SelectionFailure,
        attempts: Vec<SelectionAttempt>,
        explanation: String,
    ) -> Self {
        Self {
            success: false,
            selected: None,
            error: Some(error),
            attempts,
            explanation,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn selected_candidate(&self) -> Option<&SelectedCandidate> {
        self.selected.as_ref()
    }

    pub fn error(&self) -> Option<&SelectionFailure> {
        self.error.as_ref()
    }

    pub fn attempts(&self) -> &[SelectionAttempt] {
        &self.attempts
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.len()
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Flat caller contract: `{success: true, candidate_id, ...}` or `{success: false, error}`.
    pub fn to_contract(&self) -> Value {
        match &self.selected {
            Some(selected) => {
                let reasons: BTreeMap<&str, &str> = selected
                    .reasons
                    .iter()
                    .map(|(factor, reason)| (factor.label(), reason.as_str()))
                    .collect();
                json!({
                    "success": true,
                    "candidate_id": selected.candidate_id,
                    "candidate_name": selected.candidate_name,
                    "score": selected.score,
                    "summary": selected.summary,
                    "reasons": reasons,
                    "attempts": self.total_attempts(),
                    "attempt_trail": self.attempts,
                    "explanation": self.explanation,
                })
            }
            None => json!({
                "success": false,
                "error": self
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                "error_code": self.error,
                "attempts": self.attempts,
                "explanation": self.explanation,
            }),
        }
    }
}
