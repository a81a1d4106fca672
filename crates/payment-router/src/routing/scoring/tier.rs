use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::settings::SelectionConfig;

/// Coarse classification of a request amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountTier {
    Small,
    Medium,
    Large,
}

impl AmountTier {
    /// Pure function of the amount and the configured boundaries.
    pub fn classify(amount: Decimal, config: &SelectionConfig) -> Self {
        if amount <= config.small_amount_ceiling {
            AmountTier::Small
        } else if amount >= config.large_amount_floor {
            AmountTier::Large
        } else {
            AmountTier::Medium
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AmountTier::Small => "small",
            AmountTier::Medium => "medium",
            AmountTier::Large => "large",
        }
    }
}
