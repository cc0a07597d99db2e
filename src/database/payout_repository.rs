use crate::database::error::DatabaseError;
use crate::payouts::status::PayoutStatus;
use chrono::{DateTime, Utc};
use sqlx::{types::BigDecimal, FromRow, PgConnection, PgPool};
use uuid::Uuid;

const PAYOUT_COLUMNS: &str = "payout_id, provider_id, amount, currency, momo_number, \
     momo_network, status, reference, gateway_transfer_id, failure_reason, metadata, \
     created_at, updated_at";

/// Payout request entity.
///
/// `reference` is the idempotency key sent to the transfer gateway; it is
/// generated once at creation and never reused. `metadata` accumulates raw
/// gateway payloads for audit and is never pruned.
#[derive(Debug, Clone, FromRow)]
pub struct PayoutRequest {
    pub payout_id: Uuid,
    pub provider_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub momo_number: String,
    pub momo_network: String,
    pub status: String,
    pub reference: String,
    pub gateway_transfer_id: Option<String>,
    pub failure_reason: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayoutRequest {
    pub provider_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub momo_number: String,
    pub momo_network: String,
    pub reference: String,
}

/// Repository for payout requests.
pub struct PayoutRepository {
    pool: PgPool,
}

impl PayoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        payout_id: Uuid,
    ) -> Result<Option<PayoutRequest>, DatabaseError> {
        sqlx::query_as::<_, PayoutRequest>(&format!(
            "SELECT {} FROM payout_requests WHERE payout_id = $1",
            PAYOUT_COLUMNS
        ))
        .bind(payout_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PayoutRequest>, DatabaseError> {
        sqlx::query_as::<_, PayoutRequest>(&format!(
            "SELECT {} FROM payout_requests WHERE reference = $1",
            PAYOUT_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Processing requests last touched before the cutoff; the
    /// reconciliation worker walks these oldest-first.
    pub async fn list_processing_before(
        &self,
        updated_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PayoutRequest>, DatabaseError> {
        sqlx::query_as::<_, PayoutRequest>(&format!(
            "SELECT {} FROM payout_requests \
             WHERE status = 'processing' AND updated_at < $1 \
             ORDER BY updated_at ASC \
             LIMIT $2",
            PAYOUT_COLUMNS
        ))
        .bind(updated_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Insert a `requested` row inside the caller's transaction, after the
    /// reservation against the wallet has succeeded.
    pub async fn insert(
        conn: &mut PgConnection,
        new: &NewPayoutRequest,
        created_at: DateTime<Utc>,
    ) -> Result<PayoutRequest, DatabaseError> {
        sqlx::query_as::<_, PayoutRequest>(&format!(
            "INSERT INTO payout_requests \
             (provider_id, amount, currency, momo_number, momo_network, status, reference, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 'requested', $6, $7, $7) \
             RETURNING {}",
            PAYOUT_COLUMNS
        ))
        .bind(new.provider_id)
        .bind(&new.amount)
        .bind(&new.currency)
        .bind(&new.momo_number)
        .bind(&new.momo_network)
        .bind(&new.reference)
        .bind(created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Lock the payout row for the duration of the caller's transaction.
    /// Concurrent approvals serialize here; the loser re-reads a status that
    /// is no longer `requested` and backs off.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        payout_id: Uuid,
    ) -> Result<Option<PayoutRequest>, DatabaseError> {
        sqlx::query_as::<_, PayoutRequest>(&format!(
            "SELECT {} FROM payout_requests WHERE payout_id = $1 FOR UPDATE",
            PAYOUT_COLUMNS
        ))
        .bind(payout_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Write a status change, merging the gateway payload into the audit
    /// metadata. Existing metadata keys are preserved; patches only add.
    pub async fn update_status(
        conn: &mut PgConnection,
        payout_id: Uuid,
        status: PayoutStatus,
        gateway_transfer_id: Option<&str>,
        failure_reason: Option<&str>,
        metadata_patch: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<PayoutRequest, DatabaseError> {
        sqlx::query_as::<_, PayoutRequest>(&format!(
            "UPDATE payout_requests \
             SET status = $2, \
                 gateway_transfer_id = COALESCE($3, gateway_transfer_id), \
                 failure_reason = COALESCE($4, failure_reason), \
                 metadata = metadata || $5, \
                 updated_at = $6 \
             WHERE payout_id = $1 \
             RETURNING {}",
            PAYOUT_COLUMNS
        ))
        .bind(payout_id)
        .bind(status.as_str())
        .bind(gateway_transfer_id)
        .bind(failure_reason)
        .bind(metadata_patch)
        .bind(at)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
