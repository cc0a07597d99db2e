//! Unified error taxonomy for the escrow and payout engine.
//!
//! Every error that can cross a request boundary is an `AppError` with an
//! HTTP status, a machine-readable code and a plain-language message. Gateway
//! and database details stay in logs and audit metadata; they are never sent
//! to end users verbatim.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

/// Error codes for programmatic client handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    #[serde(rename = "INVALID_TRANSITION")]
    InvalidTransition,
    #[serde(rename = "INVALID_PAYOUT_TRANSITION")]
    InvalidPayoutTransition,
    #[serde(rename = "INSUFFICIENT_FUNDS")]
    InsufficientFunds,
    #[serde(rename = "UNSUPPORTED_NETWORK")]
    UnsupportedNetwork,
    #[serde(rename = "BALANCE_UNDERFLOW")]
    BalanceUnderflow,
    #[serde(rename = "GATEWAY_UNAVAILABLE")]
    GatewayUnavailable,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "CONCURRENT_CONFLICT")]
    ConcurrentConflict,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("illegal order transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("illegal payout transition from '{from}' to '{to}'")]
    InvalidPayoutTransition { from: String, to: String },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: String,
        requested: String,
    },

    #[error("unsupported mobile money network: {network}")]
    UnsupportedNetwork { network: String },

    /// Invariant breach: a balance subtraction would go negative. The
    /// enclosing transaction is aborted so the negative value is never
    /// persisted.
    #[error("balance underflow for provider {provider_id}: balance {balance}, attempted {attempted}")]
    BalanceUnderflow {
        provider_id: Uuid,
        balance: String,
        attempted: String,
    },

    #[error("transfer gateway unavailable: {message}")]
    GatewayUnavailable { message: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("concurrent modification: {message}")]
    ConcurrentConflict { message: String },

    #[error("validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("database error: {message}")]
    Database { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidTransition { .. } => 400,
            AppError::InvalidPayoutTransition { .. } => 409,
            AppError::InsufficientFunds { .. } => 422,
            AppError::UnsupportedNetwork { .. } => 400,
            AppError::BalanceUnderflow { .. } => 500,
            AppError::GatewayUnavailable { .. } => 502,
            AppError::NotFound { .. } => 404,
            AppError::ConcurrentConflict { .. } => 409,
            AppError::Validation { .. } => 400,
            AppError::Database { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            AppError::InvalidPayoutTransition { .. } => ErrorCode::InvalidPayoutTransition,
            AppError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            AppError::UnsupportedNetwork { .. } => ErrorCode::UnsupportedNetwork,
            AppError::BalanceUnderflow { .. } => ErrorCode::BalanceUnderflow,
            AppError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::ConcurrentConflict { .. } => ErrorCode::ConcurrentConflict,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::Database { .. } => ErrorCode::DatabaseError,
            AppError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Message safe to show to buyers and providers.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidTransition { from, to } => {
                format!("This order cannot move from '{}' to '{}'", from, to)
            }
            AppError::InvalidPayoutTransition { from, .. } => {
                format!("This payout request is already '{}'", from)
            }
            AppError::InsufficientFunds {
                available,
                requested,
            } => format!(
                "Insufficient available balance. Available: {}, requested: {}",
                available, requested
            ),
            AppError::UnsupportedNetwork { network } => {
                format!("Mobile money network '{}' is not supported", network)
            }
            AppError::BalanceUnderflow { .. }
            | AppError::Database { .. }
            | AppError::Internal { .. } => {
                "An internal error occurred. Please try again later".to_string()
            }
            AppError::GatewayUnavailable { .. } => {
                "The transfer service is temporarily unavailable. Please try again later"
                    .to_string()
            }
            AppError::NotFound { entity, id } => format!("{} '{}' was not found", entity, id),
            AppError::ConcurrentConflict { .. } => {
                "This record was modified by another request. Please retry".to_string()
            }
            AppError::Validation { message, .. } => message.clone(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::GatewayUnavailable { .. } | AppError::ConcurrentConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_maps_to_400() {
        let err = AppError::InvalidTransition {
            from: "created".to_string(),
            to: "released".to_string(),
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), ErrorCode::InvalidTransition);
        assert!(!err.is_retryable());
    }

    #[test]
    fn conflict_errors_map_to_409() {
        let err = AppError::ConcurrentConflict {
            message: "row locked".to_string(),
        };
        assert_eq!(err.status_code(), 409);
        assert!(err.is_retryable());

        let err = AppError::InvalidPayoutTransition {
            from: "paid".to_string(),
            to: "processing".to_string(),
        };
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::NotFound {
            entity: "Order",
            id: "abc".to_string(),
        };
        assert_eq!(err.status_code(), 404);
        assert!(err.user_message().contains("Order"));
    }

    #[test]
    fn internal_errors_never_leak_detail() {
        let err = AppError::BalanceUnderflow {
            provider_id: Uuid::nil(),
            balance: "0.00".to_string(),
            attempted: "5.00".to_string(),
        };
        assert_eq!(err.status_code(), 500);
        assert!(!err.user_message().contains("underflow"));

        let err = AppError::GatewayUnavailable {
            message: "connect ETIMEDOUT 10.0.0.1".to_string(),
        };
        assert!(!err.user_message().contains("ETIMEDOUT"));
    }

    #[test]
    fn insufficient_funds_maps_to_422() {
        let err = AppError::InsufficientFunds {
            available: "200.00".to_string(),
            requested: "300.00".to_string(),
        };
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), ErrorCode::InsufficientFunds);
    }
}
