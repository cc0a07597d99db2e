use crate::database::error::DatabaseError;
use crate::orders::status::{OrderStatus, TimestampField};
use chrono::{DateTime, Utc};
use sqlx::{types::BigDecimal, FromRow, PgConnection, PgPool};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "order_id, buyer_id, provider_id, service_id, tier_id, \
     amount_gross, platform_fee, tax_amount, amount_net_provider, currency, status, \
     accepted_at, delivered_at, approved_at, released_at, cancelled_at, \
     created_at, updated_at";

const EVENT_COLUMNS: &str =
    "event_id, order_id, event_type, previous_status, next_status, actor, note, payload, created_at";

/// Order entity. Rows are never deleted; terminal orders stay for audit.
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub tier_id: Uuid,
    pub amount_gross: BigDecimal,
    pub platform_fee: BigDecimal,
    pub tax_amount: BigDecimal,
    pub amount_net_provider: BigDecimal,
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

/// Append-only transition record.
#[derive(Debug, Clone, FromRow)]
pub struct OrderEvent {
    pub event_id: i64,
    pub order_id: Uuid,
    pub event_type: String,
    pub previous_status: Option<String>,
    pub next_status: Option<String>,
    pub actor: String,
    pub note: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create an order at checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub tier_id: Uuid,
    pub amount_gross: BigDecimal,
    pub platform_fee: BigDecimal,
    pub tax_amount: BigDecimal,
    pub amount_net_provider: BigDecimal,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct NewOrderEvent {
    pub order_id: Uuid,
    pub event_type: String,
    pub previous_status: Option<String>,
    pub next_status: Option<String>,
    pub actor: String,
    pub note: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Repository for orders and their event history.
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, DatabaseError> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE order_id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn list_events(&self, order_id: Uuid) -> Result<Vec<OrderEvent>, DatabaseError> {
        sqlx::query_as::<_, OrderEvent>(&format!(
            "SELECT {} FROM order_events WHERE order_id = $1 ORDER BY event_id ASC",
            EVENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Insert a new order inside the caller's transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        new: &NewOrder,
        created_at: DateTime<Utc>,
    ) -> Result<Order, DatabaseError> {
        sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders \
             (buyer_id, provider_id, service_id, tier_id, amount_gross, platform_fee, \
              tax_amount, amount_net_provider, currency, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'created', $10, $10) \
             RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(new.buyer_id)
        .bind(new.provider_id)
        .bind(new.service_id)
        .bind(new.tier_id)
        .bind(&new.amount_gross)
        .bind(&new.platform_fee)
        .bind(&new.tax_amount)
        .bind(&new.amount_net_provider)
        .bind(&new.currency)
        .bind(created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Lock the order row for the duration of the caller's transaction.
    ///
    /// Two concurrent transitions for the same order serialize here: the
    /// second waits for the first to commit, then re-validates against the
    /// committed status.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Option<Order>, DatabaseError> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE order_id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Write the new status and, when the transition defines one, its
    /// timestamp column. Must run inside the transaction that holds the row
    /// lock taken by `lock_by_id`.
    pub async fn update_status(
        conn: &mut PgConnection,
        order_id: Uuid,
        status: OrderStatus,
        timestamp_field: Option<TimestampField>,
        at: DateTime<Utc>,
    ) -> Result<Order, DatabaseError> {
        let timestamp_set = match timestamp_field {
            Some(TimestampField::AcceptedAt) => ", accepted_at = $3",
            Some(TimestampField::DeliveredAt) => ", delivered_at = $3",
            Some(TimestampField::ApprovedAt) => ", approved_at = $3",
            Some(TimestampField::ReleasedAt) => ", released_at = $3",
            Some(TimestampField::CancelledAt) => ", cancelled_at = $3",
            None => "",
        };

        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2, updated_at = $3{} WHERE order_id = $1 RETURNING {}",
            timestamp_set, ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(status.as_str())
        .bind(at)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Append an event record. Events are insert-only; there is no update or
    /// delete path anywhere in the codebase.
    pub async fn append_event(
        conn: &mut PgConnection,
        event: &NewOrderEvent,
    ) -> Result<OrderEvent, DatabaseError> {
        sqlx::query_as::<_, OrderEvent>(&format!(
            "INSERT INTO order_events \
             (order_id, event_type, previous_status, next_status, actor, note, payload, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(event.order_id)
        .bind(&event.event_type)
        .bind(&event.previous_status)
        .bind(&event.next_status)
        .bind(&event.actor)
        .bind(&event.note)
        .bind(&event.payload)
        .bind(event.created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
