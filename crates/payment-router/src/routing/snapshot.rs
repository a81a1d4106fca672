//! Point-in-time JSON snapshot of candidates and ledger entries.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::domain::{AssignmentRecord, CandidateId, CollectionEndpoint, SettlementAgent};

#[derive(Debug)]
pub enum SnapshotError {
    Io(std::io::Error),
    Json(serde_json::Error),
    DuplicateCandidate(CandidateId),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(err) => write!(f, "failed to read routing snapshot: {}", err),
            SnapshotError::Json(err) => write!(f, "invalid routing snapshot data: {}", err),
            SnapshotError::DuplicateCandidate(id) => {
                write!(f, "candidate '{}' appears more than once in snapshot", id)
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io(err) => Some(err),
            SnapshotError::Json(err) => Some(err),
            SnapshotError::DuplicateCandidate(_) => None,
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Json(err)
    }
}

/// Candidates of both kinds plus the assignment ledger they share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSnapshot {
    pub endpoints: Vec<CollectionEndpoint>,
    pub agents: Vec<SettlementAgent>,
    pub assignments: Vec<AssignmentRecord>,
}

impl RoutingSnapshot {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        let snapshot: RoutingSnapshot = serde_json::from_reader(reader)?;
        snapshot.ensure_unique_ids()?;
        Ok(snapshot)
    }

    fn ensure_unique_ids(&self) -> Result<(), SnapshotError> {
        let mut endpoints = HashSet::new();
        for endpoint in &self.endpoints {
            if !endpoints.insert(&endpoint.id) {
                return Err(SnapshotError::DuplicateCandidate(endpoint.id.clone()));
            }
        }
        let mut agents = HashSet::new();
        for agent in &self.agents {
            if !agents.insert(&agent.id) {
                return Err(SnapshotError::DuplicateCandidate(agent.id.clone()));
            }
        }
        Ok(())
    }
}
