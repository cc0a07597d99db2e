//! Order status vocabulary and the fixed transition table.
//!
//! The table below is the single source of truth for which transitions are
//! legal; the lifecycle manager consults it before mutating anything. Each
//! order reaches exactly one terminal status and no terminal status has a
//! successor.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    PaidToEscrow,
    Accepted,
    InProgress,
    Delivered,
    Approved,
    Released,
    Cancelled,
    Expired,
    Disputed,
    RefundPending,
    Refunded,
    Chargeback,
}

/// Timestamp column written when an order enters the matching status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    AcceptedAt,
    DeliveredAt,
    ApprovedAt,
    ReleasedAt,
    CancelledAt,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::PaidToEscrow => "paid_to_escrow",
            OrderStatus::Accepted => "accepted",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Approved => "approved",
            OrderStatus::Released => "released",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
            OrderStatus::Disputed => "disputed",
            OrderStatus::RefundPending => "refund_pending",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Chargeback => "chargeback",
        }
    }

    /// Terminal resolutions; none of these has a legal successor.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Released
                | OrderStatus::Cancelled
                | OrderStatus::Expired
                | OrderStatus::Refunded
                | OrderStatus::Chargeback
        )
    }

    /// Statuses during which the buyer's money sits in escrow and the
    /// order's net amount is attributed to the provider's pending balance.
    /// Disputes keep the money held until the resolution lands.
    pub fn holds_escrow(&self) -> bool {
        matches!(
            self,
            OrderStatus::PaidToEscrow
                | OrderStatus::Accepted
                | OrderStatus::InProgress
                | OrderStatus::Delivered
                | OrderStatus::Approved
                | OrderStatus::Disputed
                | OrderStatus::RefundPending
        )
    }

    pub fn legal_successors(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Created => &[PaidToEscrow, Cancelled, Expired],
            PaidToEscrow => &[Accepted, Cancelled, Disputed, Expired],
            Accepted => &[InProgress, Cancelled, Disputed],
            InProgress => &[Delivered, Cancelled, Disputed],
            Delivered => &[Approved, Disputed],
            Approved => &[Released, Disputed],
            Disputed => &[RefundPending, Released],
            RefundPending => &[Refunded, Chargeback],
            Released | Cancelled | Expired | Refunded | Chargeback => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.legal_successors().contains(&next)
    }

    /// The timestamp column this status stamps on entry, if any.
    pub fn timestamp_field(&self) -> Option<TimestampField> {
        match self {
            OrderStatus::Accepted => Some(TimestampField::AcceptedAt),
            OrderStatus::Delivered => Some(TimestampField::DeliveredAt),
            OrderStatus::Approved => Some(TimestampField::ApprovedAt),
            OrderStatus::Released => Some(TimestampField::ReleasedAt),
            OrderStatus::Cancelled => Some(TimestampField::CancelledAt),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "created" => Ok(OrderStatus::Created),
            "paid_to_escrow" => Ok(OrderStatus::PaidToEscrow),
            "accepted" => Ok(OrderStatus::Accepted),
            "in_progress" => Ok(OrderStatus::InProgress),
            "delivered" => Ok(OrderStatus::Delivered),
            "approved" => Ok(OrderStatus::Approved),
            "released" => Ok(OrderStatus::Released),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "expired" => Ok(OrderStatus::Expired),
            "disputed" => Ok(OrderStatus::Disputed),
            "refund_pending" => Ok(OrderStatus::RefundPending),
            "refunded" => Ok(OrderStatus::Refunded),
            "chargeback" => Ok(OrderStatus::Chargeback),
            other => Err(AppError::validation_field(
                format!("unknown order status: {}", other),
                "status",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn happy_path_is_legal() {
        let path = [
            Created,
            PaidToEscrow,
            Accepted,
            InProgress,
            Delivered,
            Approved,
            Released,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn shortcut_to_released_is_illegal() {
        assert!(!Created.can_transition_to(Released));
        assert!(!PaidToEscrow.can_transition_to(Released));
        assert!(!Delivered.can_transition_to(Released));
    }

    #[test]
    fn terminal_statuses_have_no_successors() {
        for status in [Released, Cancelled, Expired, Refunded, Chargeback] {
            assert!(status.is_terminal());
            assert!(status.legal_successors().is_empty());
        }
    }

    #[test]
    fn dispute_path_resolves_to_refund_or_chargeback() {
        assert!(Approved.can_transition_to(Disputed));
        assert!(Disputed.can_transition_to(RefundPending));
        assert!(Disputed.can_transition_to(Released));
        assert!(RefundPending.can_transition_to(Refunded));
        assert!(RefundPending.can_transition_to(Chargeback));
        assert!(!RefundPending.can_transition_to(Released));
    }

    #[test]
    fn timestamp_fields_match_their_transitions() {
        assert_eq!(Accepted.timestamp_field(), Some(TimestampField::AcceptedAt));
        assert_eq!(Released.timestamp_field(), Some(TimestampField::ReleasedAt));
        assert_eq!(PaidToEscrow.timestamp_field(), None);
        assert_eq!(Disputed.timestamp_field(), None);
    }

    #[test]
    fn escrow_held_range_covers_disputes() {
        assert!(PaidToEscrow.holds_escrow());
        assert!(Disputed.holds_escrow());
        assert!(RefundPending.holds_escrow());
        assert!(!Created.holds_escrow());
        assert!(!Released.holds_escrow());
        assert!(!Refunded.holds_escrow());
    }

    #[test]
    fn round_trips_through_str() {
        for status in [
            Created,
            PaidToEscrow,
            Accepted,
            InProgress,
            Delivered,
            Approved,
            Released,
            Cancelled,
            Expired,
            Disputed,
            RefundPending,
            Refunded,
            Chargeback,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::from_str("sideways").is_err());
    }
}
