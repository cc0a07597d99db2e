use crate::api::AppState;
use crate::database::payout_repository::PayoutRequest;
use crate::error::{AppError, AppResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreatePayoutRequest {
    pub provider_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DenyPayoutRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub payout_id: Uuid,
    pub provider_id: Uuid,
    pub amount: String,
    pub currency: String,
    pub momo_number: String,
    pub momo_network: String,
    pub status: String,
    pub reference: String,
    pub gateway_transfer_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PayoutRequest> for PayoutResponse {
    fn from(payout: PayoutRequest) -> Self {
        Self {
            payout_id: payout.payout_id,
            provider_id: payout.provider_id,
            amount: payout.amount.to_string(),
            currency: payout.currency,
            momo_number: payout.momo_number,
            momo_network: payout.momo_network,
            status: payout.status,
            reference: payout.reference,
            gateway_transfer_id: payout.gateway_transfer_id,
            failure_reason: payout.failure_reason,
            created_at: payout.created_at,
            updated_at: payout.updated_at,
        }
    }
}

pub async fn create_payout(
    State(state): State<AppState>,
    Json(body): Json<CreatePayoutRequest>,
) -> AppResult<impl IntoResponse> {
    let amount = BigDecimal::from_str(body.amount.trim())
        .map_err(|_| AppError::validation_field(format!("invalid amount: {}", body.amount), "amount"))?;

    let payout = state.payouts.create(body.provider_id, amount).await?;
    Ok((StatusCode::CREATED, Json(PayoutResponse::from(payout))))
}

pub async fn get_payout(
    State(state): State<AppState>,
    Path(payout_id): Path<Uuid>,
) -> AppResult<Json<PayoutResponse>> {
    let payout = state
        .payout_repo
        .find_by_id(payout_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "PayoutRequest",
            id: payout_id.to_string(),
        })?;
    Ok(Json(PayoutResponse::from(payout)))
}

pub async fn approve_payout(
    State(state): State<AppState>,
    Path(payout_id): Path<Uuid>,
) -> AppResult<Json<PayoutResponse>> {
    let payout = state.payouts.approve(payout_id).await?;
    Ok(Json(PayoutResponse::from(payout)))
}

pub async fn deny_payout(
    State(state): State<AppState>,
    Path(payout_id): Path<Uuid>,
    body: Option<Json<DenyPayoutRequest>>,
) -> AppResult<Json<PayoutResponse>> {
    let reason = body.and_then(|Json(b)| b.reason);
    let payout = state.payouts.deny(payout_id, reason).await?;
    Ok(Json(PayoutResponse::from(payout)))
}
