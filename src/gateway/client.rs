//! HTTP client for the external money transfer gateway.
//!
//! This is the only component that moves real money. It performs exactly one
//! attempt per call: retries without an idempotency guarantee are unsafe, and
//! the caller already owns the retry/reconciliation policy around the
//! request `reference`.

use crate::config::GatewayConfig;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::types::{TransferOutcome, TransferRequest, TransferStatus};
use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sqlx::types::BigDecimal;
use std::time::Duration;
use tracing::info;

#[async_trait]
pub trait TransferGateway: Send + Sync {
    /// Submit a transfer. The gateway deduplicates on `reference`, so a
    /// caller-driven retry after a timeout cannot double-pay.
    async fn transfer(&self, request: TransferRequest) -> GatewayResult<TransferOutcome>;

    /// Query the gateway's record for a reference. `Ok(None)` means the
    /// gateway has no record of the reference, i.e. the transfer was never
    /// executed.
    async fn transfer_status(&self, reference: &str) -> GatewayResult<Option<TransferOutcome>>;

    fn name(&self) -> &'static str;
}

pub struct HttpTransferGateway {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl HttpTransferGateway {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::InvalidResponse {
                message: format!("failed to build http client: {}", e),
            })?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn map_request_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else if err.is_connect() {
            GatewayError::Unavailable {
                message: err.to_string(),
            }
        } else {
            GatewayError::InvalidResponse {
                message: err.to_string(),
            }
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        payload: &JsonValue,
    ) -> GatewayResult<T> {
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.config.secret_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::InvalidResponse {
                message: format!("failed to decode gateway response: {}", e),
            })
    }
}

#[async_trait]
impl TransferGateway for HttpTransferGateway {
    async fn transfer(&self, request: TransferRequest) -> GatewayResult<TransferOutcome> {
        // Register the mobile money recipient, then submit the transfer
        // against the returned recipient code.
        let recipient_payload = serde_json::json!({
            "type": "mobile_money",
            "name": request.destination_name.as_deref().unwrap_or("Provider"),
            "account_number": request.destination_number,
            "bank_code": request.network.gateway_code(),
            "currency": request.currency,
        });

        let recipient: GatewayEnvelope<RecipientData> =
            self.post_json("/transferrecipient", &recipient_payload).await?;
        let recipient = recipient.into_data()?;

        let transfer_payload = serde_json::json!({
            "source": "balance",
            "amount": to_minor_units(&request.amount)?,
            "currency": request.currency,
            "recipient": recipient.recipient_code,
            "reference": request.reference,
            "reason": request.narration,
        });

        let transfer: GatewayEnvelope<TransferData> =
            self.post_json("/transfer", &transfer_payload).await?;
        let transfer = transfer.into_data()?;

        let status = TransferStatus::from_gateway(&transfer.status);
        info!(
            reference = %request.reference,
            gateway_status = %transfer.status,
            "transfer submitted to gateway"
        );

        Ok(TransferOutcome {
            status,
            gateway_transfer_id: Some(transfer.id.to_string()),
            gateway_status: Some(transfer.status.clone()),
            raw: serde_json::to_value(&transfer).unwrap_or(JsonValue::Null),
        })
    }

    async fn transfer_status(&self, reference: &str) -> GatewayResult<Option<TransferOutcome>> {
        let response = self
            .http
            .get(self.endpoint(&format!("/transfer/verify/{}", reference)))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: GatewayEnvelope<TransferData> =
            response
                .json()
                .await
                .map_err(|e| GatewayError::InvalidResponse {
                    message: format!("failed to decode gateway response: {}", e),
                })?;

        // The gateway answered but has no record for this reference.
        if !envelope.status && envelope.message.to_lowercase().contains("not found") {
            return Ok(None);
        }
        let data = envelope.into_data()?;

        Ok(Some(TransferOutcome {
            status: TransferStatus::from_gateway(&data.status),
            gateway_transfer_id: Some(data.id.to_string()),
            gateway_status: Some(data.status.clone()),
            raw: serde_json::to_value(&data).unwrap_or(JsonValue::Null),
        }))
    }

    fn name(&self) -> &'static str {
        "paystack"
    }
}

/// Amounts go over the wire in minor units (pesewas).
fn to_minor_units(amount: &BigDecimal) -> GatewayResult<i64> {
    (amount * BigDecimal::from(100))
        .with_scale(0)
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidResponse {
            message: format!("amount out of range for transfer: {}", amount),
        })
}

/// `data` is absent when the gateway refuses the request.
#[derive(Debug, Deserialize)]
struct GatewayEnvelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

impl<T> GatewayEnvelope<T> {
    fn into_data(self) -> GatewayResult<T> {
        if !self.status {
            return Err(GatewayError::Rejected {
                message: self.message,
            });
        }
        self.data.ok_or_else(|| GatewayError::InvalidResponse {
            message: "gateway reported success without a payload".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RecipientData {
    recipient_code: String,
}

#[derive(Debug, Clone, serde::Serialize, Deserialize)]
struct TransferData {
    id: u64,
    status: String,
    reference: Option<String>,
    transfer_code: Option<String>,
    failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn amounts_convert_to_minor_units() {
        let amount = BigDecimal::from_str("150.00").unwrap();
        assert_eq!(to_minor_units(&amount).unwrap(), 15000);

        let amount = BigDecimal::from_str("0.01").unwrap();
        assert_eq!(to_minor_units(&amount).unwrap(), 1);

        let amount = BigDecimal::from_str("500.50").unwrap();
        assert_eq!(to_minor_units(&amount).unwrap(), 50050);
    }

    #[test]
    fn envelope_deserializes_gateway_payload() {
        let payload = serde_json::json!({
            "status": true,
            "message": "Transfer queued",
            "data": {
                "id": 143,
                "status": "pending",
                "reference": "adw-po-abc",
                "transfer_code": "TRF_1",
                "failure_reason": null
            }
        });
        let parsed: GatewayEnvelope<TransferData> = serde_json::from_value(payload).unwrap();
        let data = parsed.into_data().unwrap();
        assert_eq!(data.id, 143);
        assert_eq!(
            TransferStatus::from_gateway(&data.status),
            TransferStatus::Pending
        );
    }

    #[test]
    fn refusal_envelope_becomes_rejected() {
        let payload = serde_json::json!({
            "status": false,
            "message": "Insufficient balance"
        });
        let parsed: GatewayEnvelope<TransferData> = serde_json::from_value(payload).unwrap();
        let err = parsed.into_data().unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
    }
}
