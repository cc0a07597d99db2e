use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::BigDecimal;
use std::fmt;
use std::str::FromStr;

/// Mobile money networks we can pay out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomoNetwork {
    Mtn,
    Vodafone,
    AirtelTigo,
}

impl MomoNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            MomoNetwork::Mtn => "mtn",
            MomoNetwork::Vodafone => "vodafone",
            MomoNetwork::AirtelTigo => "airteltigo",
        }
    }

    /// The gateway's own code for this network.
    pub fn gateway_code(&self) -> &'static str {
        match self {
            MomoNetwork::Mtn => "MTN",
            MomoNetwork::Vodafone => "VOD",
            MomoNetwork::AirtelTigo => "ATL",
        }
    }
}

impl fmt::Display for MomoNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MomoNetwork {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "mtn" => Ok(MomoNetwork::Mtn),
            "vodafone" | "telecel" => Ok(MomoNetwork::Vodafone),
            "airteltigo" | "airtel_tigo" | "at" => Ok(MomoNetwork::AirtelTigo),
            other => Err(AppError::UnsupportedNetwork {
                network: other.to_string(),
            }),
        }
    }
}

/// Normalized three-way transfer outcome. Anything the gateway reports that
/// we do not recognize maps to `Failed`; "unknown" is never treated as
/// success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Succeeded,
    Pending,
    Failed,
}

impl TransferStatus {
    pub fn from_gateway(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "success" | "successful" | "paid" => TransferStatus::Succeeded,
            "pending" | "queued" | "processing" | "received" | "otp" => TransferStatus::Pending,
            _ => TransferStatus::Failed,
        }
    }
}

/// Outbound transfer instruction.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub network: MomoNetwork,
    pub destination_number: String,
    pub destination_name: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
    /// Idempotency key; the gateway deduplicates retries carrying the same
    /// reference instead of moving money twice.
    pub reference: String,
    pub narration: String,
}

/// Normalized gateway response. `raw` is the verbatim payload, stored in the
/// payout request's audit metadata and never parsed for business logic.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub status: TransferStatus,
    pub gateway_transfer_id: Option<String>,
    pub gateway_status: Option<String>,
    pub raw: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_codes_map_to_gateway_vocabulary() {
        assert_eq!(MomoNetwork::Mtn.gateway_code(), "MTN");
        assert_eq!(MomoNetwork::Vodafone.gateway_code(), "VOD");
        assert_eq!(MomoNetwork::AirtelTigo.gateway_code(), "ATL");
    }

    #[test]
    fn unknown_network_is_rejected() {
        let err = MomoNetwork::from_str("zamtel").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedNetwork { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn network_aliases_parse() {
        assert_eq!(MomoNetwork::from_str("MTN").unwrap(), MomoNetwork::Mtn);
        assert_eq!(
            MomoNetwork::from_str("telecel").unwrap(),
            MomoNetwork::Vodafone
        );
        assert_eq!(
            MomoNetwork::from_str("airtel_tigo").unwrap(),
            MomoNetwork::AirtelTigo
        );
    }

    #[test]
    fn gateway_statuses_normalize_to_three_outcomes() {
        assert_eq!(
            TransferStatus::from_gateway("success"),
            TransferStatus::Succeeded
        );
        assert_eq!(
            TransferStatus::from_gateway("pending"),
            TransferStatus::Pending
        );
        assert_eq!(
            TransferStatus::from_gateway("failed"),
            TransferStatus::Failed
        );
        assert_eq!(
            TransferStatus::from_gateway("reversed"),
            TransferStatus::Failed
        );
    }

    #[test]
    fn unrecognized_status_is_never_success() {
        for raw in ["", "ok?", "SETTLED_MAYBE", "unknown", "null"] {
            assert_eq!(TransferStatus::from_gateway(raw), TransferStatus::Failed);
        }
    }
}
