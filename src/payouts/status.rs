//! Payout request status vocabulary.
//!
//! `requested -> processing -> {paid | failed}` plus the deny path
//! `requested -> cancelled`. A request is never re-opened once terminal.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Requested,
    Processing,
    Paid,
    Failed,
    Cancelled,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Requested => "requested",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Paid => "paid",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PayoutStatus::Paid | PayoutStatus::Failed | PayoutStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: PayoutStatus) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, next),
            (Requested, Processing) | (Requested, Cancelled) | (Processing, Paid) | (Processing, Failed)
        )
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "requested" => Ok(PayoutStatus::Requested),
            "processing" => Ok(PayoutStatus::Processing),
            "paid" => Ok(PayoutStatus::Paid),
            "failed" => Ok(PayoutStatus::Failed),
            "cancelled" => Ok(PayoutStatus::Cancelled),
            other => Err(AppError::validation_field(
                format!("unknown payout status: {}", other),
                "status",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PayoutStatus::*;

    #[test]
    fn legal_transitions() {
        assert!(Requested.can_transition_to(Processing));
        assert!(Requested.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Paid));
        assert!(Processing.can_transition_to(Failed));
    }

    #[test]
    fn terminal_statuses_are_frozen() {
        for status in [Paid, Failed, Cancelled] {
            assert!(status.is_terminal());
            for next in [Requested, Processing, Paid, Failed, Cancelled] {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn cannot_skip_processing() {
        assert!(!Requested.can_transition_to(Paid));
        assert!(!Requested.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Cancelled));
    }
}
