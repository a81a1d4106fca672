use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::scoring::AmountTier;

/// Identifier wrapper for collection endpoints and settlement agents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Which side of the money flow a router serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterKind {
    Payin,
    Payout,
}

impl RouterKind {
    pub const fn label(self) -> &'static str {
        match self {
            RouterKind::Payin => "payin",
            RouterKind::Payout => "payout",
        }
    }

    /// Prefix for environment overrides, e.g. `PAYIN_MIN_SCORE`.
    pub const fn env_prefix(self) -> &'static str {
        match self {
            RouterKind::Payin => "PAYIN",
            RouterKind::Payout => "PAYOUT",
        }
    }
}

/// Activity flags as stored by the surrounding system.
///
/// `legacy_enabled` predates `is_active` and is still set on older records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivityFlags {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub legacy_enabled: bool,
}

impl ActivityFlags {
    pub const fn active() -> Self {
        Self {
            is_active: true,
            legacy_enabled: false,
        }
    }

    pub const fn is_available(self) -> bool {
        self.is_active || self.legacy_enabled
    }
}

/// Per-candidate limits configured by operators.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateLimits {
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub daily_volume_cap: Option<Decimal>,
    pub max_concurrent: Option<u32>,
}

impl CandidateLimits {
    pub fn accepts_amount(&self, amount: Decimal) -> bool {
        self.min_amount.map_or(true, |min| amount >= min)
            && self.max_amount.map_or(true, |max| amount <= max)
    }
}

/// Point-in-time usage counters for one candidate. "Today" is the local calendar day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    pub today_volume: Decimal,
    pub today_count: u32,
    pub active_workload: u32,
    pub completed_today: u32,
    pub cancelled_today: u32,
    pub failed_today: u32,
    pub avg_completion_minutes: Option<f64>,
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl UsageStats {
    pub fn settled_today(&self) -> u32 {
        self.completed_today + self.cancelled_today + self.failed_today
    }

    /// Combine these counters with fresher ones, keeping the busier reading of each field.
    ///
    /// Counters and volume take the maximum, timestamps the latest, and the completion
    /// average prefers the fresh value.
    pub fn reconcile(&self, fresh: &UsageStats) -> UsageStats {
        UsageStats {
            today_volume: self.today_volume.max(fresh.today_volume),
            today_count: self.today_count.max(fresh.today_count),
            active_workload: self.active_workload.max(fresh.active_workload),
            completed_today: self.completed_today.max(fresh.completed_today),
            cancelled_today: self.cancelled_today.max(fresh.cancelled_today),
            failed_today: self.failed_today.max(fresh.failed_today),
            avg_completion_minutes: fresh.avg_completion_minutes.or(self.avg_completion_minutes),
            last_assigned_at: self.last_assigned_at.max(fresh.last_assigned_at),
            last_success_at: self.last_success_at.max(fresh.last_success_at),
        }
    }

    /// Minutes since the last assignment, `None` when never assigned.
    pub fn idle_minutes(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_assigned_at.map(|at| {
            let seconds = (now - at).num_seconds().max(0);
            seconds as f64 / 60.0
        })
    }
}

/// A payment collection endpoint receiving payin deposits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEndpoint {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub activity: ActivityFlags,
    #[serde(default)]
    pub limits: CandidateLimits,
    #[serde(default)]
    pub usage: Option<UsageStats>,
}

/// A settlement agent fulfilling payout requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementAgent {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub activity: ActivityFlags,
    #[serde(default)]
    pub limits: CandidateLimits,
    /// Amount tiers the agent is staffed for; empty means every tier.
    #[serde(default)]
    pub preferred_tiers: Vec<AmountTier>,
    #[serde(default)]
    pub usage: Option<UsageStats>,
}

/// Lifecycle state of one assignment in the transactional ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

/// One assignment of a request to a candidate, as recorded by the surrounding system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub candidate_id: CandidateId,
    pub amount: Decimal,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}
