use crate::database::error::DatabaseError;
use chrono::{DateTime, Utc};
use sqlx::{types::BigDecimal, FromRow, PgConnection, PgPool};
use uuid::Uuid;

const WALLET_COLUMNS: &str = "provider_id, available_balance, pending_balance, total_paid_out, \
     currency, created_at, updated_at";

/// Provider wallet row. One per provider, created lazily on first use.
#[derive(Debug, Clone, FromRow)]
pub struct ProviderWallet {
    pub provider_id: Uuid,
    pub available_balance: BigDecimal,
    pub pending_balance: BigDecimal,
    pub total_paid_out: BigDecimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for provider wallets.
///
/// Balance writes never go through here directly; the wallet ledger
/// (`wallet::ledger`) is the only caller of `apply_balances`, always under
/// the row lock taken by `lock_or_create`.
pub struct WalletRepository {
    pool: PgPool,
}

impl WalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_provider(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<ProviderWallet>, DatabaseError> {
        sqlx::query_as::<_, ProviderWallet>(&format!(
            "SELECT {} FROM provider_wallets WHERE provider_id = $1",
            WALLET_COLUMNS
        ))
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Create the wallet row if it does not exist, then lock it for the
    /// duration of the caller's transaction. This lock is the only barrier
    /// against concurrent balance updates for the same provider.
    pub async fn lock_or_create(
        conn: &mut PgConnection,
        provider_id: Uuid,
    ) -> Result<ProviderWallet, DatabaseError> {
        sqlx::query("INSERT INTO provider_wallets (provider_id) VALUES ($1) ON CONFLICT (provider_id) DO NOTHING")
            .bind(provider_id)
            .execute(&mut *conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        sqlx::query_as::<_, ProviderWallet>(&format!(
            "SELECT {} FROM provider_wallets WHERE provider_id = $1 FOR UPDATE",
            WALLET_COLUMNS
        ))
        .bind(provider_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Persist a full balance snapshot for a locked wallet row.
    pub async fn apply_balances(
        conn: &mut PgConnection,
        provider_id: Uuid,
        available_balance: &BigDecimal,
        pending_balance: &BigDecimal,
        total_paid_out: &BigDecimal,
    ) -> Result<ProviderWallet, DatabaseError> {
        sqlx::query_as::<_, ProviderWallet>(&format!(
            "UPDATE provider_wallets \
             SET available_balance = $2, pending_balance = $3, total_paid_out = $4, updated_at = NOW() \
             WHERE provider_id = $1 \
             RETURNING {}",
            WALLET_COLUMNS
        ))
        .bind(provider_id)
        .bind(available_balance)
        .bind(pending_balance)
        .bind(total_paid_out)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
