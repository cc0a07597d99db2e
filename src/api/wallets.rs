use crate::api::AppState;
use crate::database::destination_repository::PayoutDestination;
use crate::database::wallet_repository::ProviderWallet;
use crate::error::AppResult;
use crate::gateway::types::MomoNetwork;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub provider_id: Uuid,
    pub available_balance: String,
    pub pending_balance: String,
    pub total_paid_out: String,
    pub currency: String,
}

impl From<ProviderWallet> for WalletResponse {
    fn from(wallet: ProviderWallet) -> Self {
        Self {
            provider_id: wallet.provider_id,
            available_balance: wallet.available_balance.to_string(),
            pending_balance: wallet.pending_balance.to_string(),
            total_paid_out: wallet.total_paid_out.to_string(),
            currency: wallet.currency,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertDestinationRequest {
    pub momo_number: String,
    pub momo_network: String,
    #[serde(default)]
    pub account_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DestinationResponse {
    pub provider_id: Uuid,
    pub momo_number: String,
    pub momo_network: String,
    pub account_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<PayoutDestination> for DestinationResponse {
    fn from(destination: PayoutDestination) -> Self {
        Self {
            provider_id: destination.provider_id,
            momo_number: destination.momo_number,
            momo_network: destination.momo_network,
            account_name: destination.account_name,
            updated_at: destination.updated_at,
        }
    }
}

/// Wallets are created lazily on the first balance-affecting operation; a
/// provider who has never earned simply has zero everywhere.
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
) -> AppResult<Json<WalletResponse>> {
    let wallet = state.wallet_repo.find_by_provider(provider_id).await?;
    Ok(Json(match wallet {
        Some(wallet) => WalletResponse::from(wallet),
        None => WalletResponse {
            provider_id,
            available_balance: "0".to_string(),
            pending_balance: "0".to_string(),
            total_paid_out: "0".to_string(),
            currency: "GHS".to_string(),
        },
    }))
}

pub async fn put_destination(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
    Json(body): Json<UpsertDestinationRequest>,
) -> AppResult<Json<DestinationResponse>> {
    let network = MomoNetwork::from_str(&body.momo_network)?;
    if body.momo_number.trim().is_empty() {
        return Err(crate::error::AppError::validation_field(
            "momo_number cannot be empty",
            "momo_number",
        ));
    }

    let destination = state
        .destination_repo
        .upsert(
            provider_id,
            body.momo_number.trim(),
            network.as_str(),
            body.account_name.as_deref(),
        )
        .await?;
    Ok(Json(DestinationResponse::from(destination)))
}
