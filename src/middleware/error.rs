//! Error response formatting.
//!
//! Every `AppError` leaving a handler becomes the same JSON shape: an error
//! code, a user-safe message, a timestamp, and a retry hint.

use crate::error::{AppError, ErrorCode};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Standardized error body returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        let details = match error {
            AppError::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            AppError::InvalidTransition { from, to } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            _ => None,
        };

        Self {
            error: error.error_code(),
            message: error.user_message(),
            timestamp: Utc::now().to_rfc3339(),
            details,
            retryable: Some(error.is_retryable()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(
                error = ?self,
                status = %status_code.as_u16(),
                "server error"
            );
        } else {
            tracing::warn!(
                error = ?self,
                status = %status_code.as_u16(),
                "client error"
            );
        }

        let body = ErrorResponse::from_app_error(&self);
        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_code_and_user_message() {
        let err = AppError::InsufficientFunds {
            available: "50.00".to_string(),
            requested: "100.00".to_string(),
        };
        let body = ErrorResponse::from_app_error(&err);
        assert_eq!(body.error, ErrorCode::InsufficientFunds);
        assert!(body.message.contains("50.00"));
        assert_eq!(body.retryable, Some(false));
    }

    #[test]
    fn invalid_transition_includes_both_statuses() {
        let err = AppError::InvalidTransition {
            from: "created".to_string(),
            to: "released".to_string(),
        };
        let body = ErrorResponse::from_app_error(&err);
        let details = body.details.unwrap();
        assert_eq!(details["from"], "created");
        assert_eq!(details["to"], "released");
    }

    #[test]
    fn internal_detail_never_reaches_the_body() {
        let err = AppError::Database {
            message: "relation payout_requests does not exist".to_string(),
        };
        let body = ErrorResponse::from_app_error(&err);
        assert!(!body.message.contains("payout_requests"));
    }

    #[test]
    fn into_response_uses_the_mapped_status() {
        let err = AppError::NotFound {
            entity: "Order",
            id: "abc".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
