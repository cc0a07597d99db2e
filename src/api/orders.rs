use crate::api::{actor_from_headers, AppState};
use crate::database::order_repository::{NewOrder, Order, OrderEvent};
use crate::error::{AppError, AppResult};
use crate::orders::status::OrderStatus;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub buyer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub tier_id: Uuid,
    pub amount_gross: String,
    pub platform_fee: String,
    pub tax_amount: String,
    pub amount_net_provider: String,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Order as serialized to clients. Amounts go out as strings so clients
/// never see float rounding.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub tier_id: Uuid,
    pub amount_gross: String,
    pub platform_fee: String,
    pub tax_amount: String,
    pub amount_net_provider: String,
    pub currency: String,
    pub status: String,
    pub accepted_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            buyer_id: order.buyer_id,
            provider_id: order.provider_id,
            service_id: order.service_id,
            tier_id: order.tier_id,
            amount_gross: order.amount_gross.to_string(),
            platform_fee: order.platform_fee.to_string(),
            tax_amount: order.tax_amount.to_string(),
            amount_net_provider: order.amount_net_provider.to_string(),
            currency: order.currency,
            status: order.status,
            accepted_at: order.accepted_at,
            delivered_at: order.delivered_at,
            approved_at: order.approved_at,
            released_at: order.released_at,
            cancelled_at: order.cancelled_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderEventResponse {
    pub event_id: i64,
    pub event_type: String,
    pub previous_status: Option<String>,
    pub next_status: Option<String>,
    pub actor: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderEvent> for OrderEventResponse {
    fn from(event: OrderEvent) -> Self {
        Self {
            event_id: event.event_id,
            event_type: event.event_type,
            previous_status: event.previous_status,
            next_status: event.next_status,
            actor: event.actor,
            note: event.note,
            created_at: event.created_at,
        }
    }
}

fn parse_amount(raw: &str, field: &str) -> AppResult<BigDecimal> {
    BigDecimal::from_str(raw.trim())
        .map_err(|_| AppError::validation_field(format!("invalid amount: {}", raw), field))
}

pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> AppResult<impl IntoResponse> {
    let new = NewOrder {
        buyer_id: body.buyer_id,
        provider_id: body.provider_id,
        service_id: body.service_id,
        tier_id: body.tier_id,
        amount_gross: parse_amount(&body.amount_gross, "amount_gross")?,
        platform_fee: parse_amount(&body.platform_fee, "platform_fee")?,
        tax_amount: parse_amount(&body.tax_amount, "tax_amount")?,
        amount_net_provider: parse_amount(&body.amount_net_provider, "amount_net_provider")?,
        currency: body.currency.unwrap_or_else(|| "GHS".to_string()),
    };
    let actor = actor_from_headers(&headers);

    let order = state.lifecycle.create_order(new, &actor).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderResponse>> {
    let order = state
        .order_repo
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "Order",
            id: order_id.to_string(),
        })?;
    Ok(Json(OrderResponse::from(order)))
}

pub async fn list_order_events(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Vec<OrderEventResponse>>> {
    state
        .order_repo
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "Order",
            id: order_id.to_string(),
        })?;

    let events = state.order_repo.list_events(order_id).await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

pub async fn transition_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<TransitionRequest>,
) -> AppResult<Json<OrderResponse>> {
    let requested = OrderStatus::from_str(&body.status)?;
    let actor = actor_from_headers(&headers);

    let order = state
        .lifecycle
        .transition(order_id, requested, &actor, body.note)
        .await?;
    Ok(Json(OrderResponse::from(order)))
}
