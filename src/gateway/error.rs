use crate::error::AppError;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The call did not complete within the configured timeout. The
    /// transfer may or may not have executed; the caller must confirm
    /// before returning reserved funds.
    #[error("transfer gateway timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("transfer gateway unreachable: {message}")]
    Unavailable { message: String },

    /// The gateway answered and refused the request. The transfer was not
    /// executed.
    #[error("transfer gateway rejected request: {message}")]
    Rejected { message: String },

    /// The gateway's answer arrived but could not be understood, or the
    /// request failed in transport after it may already have been
    /// delivered. The transfer may have executed.
    #[error("unexpected gateway response: {message}")]
    InvalidResponse { message: String },
}

impl GatewayError {
    /// Whether completion of the transfer is unknown. Every variant except
    /// an explicit refusal is uncertain: the submission may have reached the
    /// gateway, so reserved funds must not be returned until a status query
    /// confirms what happened.
    pub fn completion_uncertain(&self) -> bool {
        !matches!(self, GatewayError::Rejected { .. })
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::GatewayUnavailable {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_an_explicit_refusal_is_certain() {
        assert!(GatewayError::Timeout { timeout_secs: 30 }.completion_uncertain());
        assert!(GatewayError::Unavailable {
            message: "connect refused".to_string()
        }
        .completion_uncertain());
        // An undecodable answer means the transfer may still have executed.
        assert!(GatewayError::InvalidResponse {
            message: "not json".to_string()
        }
        .completion_uncertain());
        assert!(!GatewayError::Rejected {
            message: "invalid recipient".to_string()
        }
        .completion_uncertain());
    }
}
