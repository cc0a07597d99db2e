use crate::database::error::DatabaseError;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

const DESTINATION_COLUMNS: &str = "provider_id, momo_number, momo_network, account_name, updated_at";

/// Mobile money destination a provider has on file for payouts.
#[derive(Debug, Clone, FromRow)]
pub struct PayoutDestination {
    pub provider_id: Uuid,
    pub momo_number: String,
    pub momo_network: String,
    pub account_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

pub struct DestinationRepository {
    pool: PgPool,
}

impl DestinationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_provider(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<PayoutDestination>, DatabaseError> {
        sqlx::query_as::<_, PayoutDestination>(&format!(
            "SELECT {} FROM payout_destinations WHERE provider_id = $1",
            DESTINATION_COLUMNS
        ))
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Read the destination inside a transaction, so a payout creation sees
    /// a consistent snapshot of the details it copies onto the request.
    pub async fn find_in_tx(
        conn: &mut PgConnection,
        provider_id: Uuid,
    ) -> Result<Option<PayoutDestination>, DatabaseError> {
        sqlx::query_as::<_, PayoutDestination>(&format!(
            "SELECT {} FROM payout_destinations WHERE provider_id = $1",
            DESTINATION_COLUMNS
        ))
        .bind(provider_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn upsert(
        &self,
        provider_id: Uuid,
        momo_number: &str,
        momo_network: &str,
        account_name: Option<&str>,
    ) -> Result<PayoutDestination, DatabaseError> {
        sqlx::query_as::<_, PayoutDestination>(&format!(
            "INSERT INTO payout_destinations (provider_id, momo_number, momo_network, account_name) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (provider_id) DO UPDATE \
             SET momo_number = EXCLUDED.momo_number, \
                 momo_network = EXCLUDED.momo_network, \
                 account_name = EXCLUDED.account_name, \
                 updated_at = NOW() \
             RETURNING {}",
            DESTINATION_COLUMNS
        ))
        .bind(provider_id)
        .bind(momo_number)
        .bind(momo_network)
        .bind(account_name)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
