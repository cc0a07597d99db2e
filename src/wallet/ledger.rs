//! Provider wallet ledger.
//!
//! The only code path allowed to change `available_balance`,
//! `pending_balance` or `total_paid_out`. Every operation runs on the
//! caller's transaction and starts by taking a `FOR UPDATE` lock on the
//! wallet row, so concurrent order releases and payout reservations for the
//! same provider serialize instead of losing updates.
//!
//! Subtractions that would go negative abort the transaction with
//! `BalanceUnderflow` (for escrow bookkeeping) or `InsufficientFunds` (for
//! payout reservations); a negative balance is never written.

use crate::database::wallet_repository::{ProviderWallet, WalletRepository};
use crate::error::{AppError, AppResult};
use sqlx::types::BigDecimal;
use sqlx::PgConnection;
use tracing::{debug, error};
use uuid::Uuid;

/// Attribute an order's net amount to the provider's pending balance when
/// the buyer's money enters escrow.
pub async fn accrue(
    conn: &mut PgConnection,
    provider_id: Uuid,
    amount: &BigDecimal,
) -> AppResult<ProviderWallet> {
    let wallet = WalletRepository::lock_or_create(conn, provider_id).await?;
    let pending = &wallet.pending_balance + amount;

    debug!(%provider_id, amount = %amount, pending = %pending, "accruing pending balance");
    let updated = WalletRepository::apply_balances(
        conn,
        provider_id,
        &wallet.available_balance,
        &pending,
        &wallet.total_paid_out,
    )
    .await?;
    Ok(updated)
}

/// Move an order's net amount from pending to available on release.
pub async fn settle(
    conn: &mut PgConnection,
    provider_id: Uuid,
    amount: &BigDecimal,
) -> AppResult<ProviderWallet> {
    let wallet = WalletRepository::lock_or_create(conn, provider_id).await?;
    if wallet.pending_balance < *amount {
        // Invariant breach: either an accrual was missed upstream or this is
        // a double settle that slipped past the lifecycle guard. Abort so
        // nothing is persisted, and alert loudly.
        error!(
            %provider_id,
            pending = %wallet.pending_balance,
            attempted = %amount,
            "pending balance underflow on settle; aborting transaction"
        );
        return Err(AppError::BalanceUnderflow {
            provider_id,
            balance: wallet.pending_balance.to_string(),
            attempted: amount.to_string(),
        });
    }

    let pending = &wallet.pending_balance - amount;
    let available = &wallet.available_balance + amount;

    debug!(%provider_id, amount = %amount, available = %available, pending = %pending, "settling released order");
    let updated = WalletRepository::apply_balances(
        conn,
        provider_id,
        &available,
        &pending,
        &wallet.total_paid_out,
    )
    .await?;
    Ok(updated)
}

/// Remove an order's net amount from pending without crediting available,
/// when escrow resolves back to the buyer (refund, chargeback, or an
/// escrow-held cancellation/expiry).
pub async fn reverse_accrual(
    conn: &mut PgConnection,
    provider_id: Uuid,
    amount: &BigDecimal,
) -> AppResult<ProviderWallet> {
    let wallet = WalletRepository::lock_or_create(conn, provider_id).await?;
    if wallet.pending_balance < *amount {
        error!(
            %provider_id,
            pending = %wallet.pending_balance,
            attempted = %amount,
            "pending balance underflow on reversal; aborting transaction"
        );
        return Err(AppError::BalanceUnderflow {
            provider_id,
            balance: wallet.pending_balance.to_string(),
            attempted: amount.to_string(),
        });
    }

    let pending = &wallet.pending_balance - amount;
    debug!(%provider_id, amount = %amount, pending = %pending, "reversing escrow accrual");
    let updated = WalletRepository::apply_balances(
        conn,
        provider_id,
        &wallet.available_balance,
        &pending,
        &wallet.total_paid_out,
    )
    .await?;
    Ok(updated)
}

/// Debit available balance for a new payout request. Fails with
/// `InsufficientFunds` and mutates nothing when the balance cannot cover
/// the amount.
pub async fn reserve_for_payout(
    conn: &mut PgConnection,
    provider_id: Uuid,
    amount: &BigDecimal,
) -> AppResult<ProviderWallet> {
    let wallet = WalletRepository::lock_or_create(conn, provider_id).await?;
    if wallet.available_balance < *amount {
        return Err(AppError::InsufficientFunds {
            available: wallet.available_balance.to_string(),
            requested: amount.to_string(),
        });
    }

    let available = &wallet.available_balance - amount;
    debug!(%provider_id, amount = %amount, available = %available, "reserving funds for payout");
    let updated = WalletRepository::apply_balances(
        conn,
        provider_id,
        &available,
        &wallet.pending_balance,
        &wallet.total_paid_out,
    )
    .await?;
    Ok(updated)
}

/// Credit a reservation back to available balance when a payout fails or
/// is denied.
pub async fn return_reservation(
    conn: &mut PgConnection,
    provider_id: Uuid,
    amount: &BigDecimal,
) -> AppResult<ProviderWallet> {
    let wallet = WalletRepository::lock_or_create(conn, provider_id).await?;
    let available = &wallet.available_balance + amount;

    debug!(%provider_id, amount = %amount, available = %available, "returning payout reservation");
    let updated = WalletRepository::apply_balances(
        conn,
        provider_id,
        &available,
        &wallet.pending_balance,
        &wallet.total_paid_out,
    )
    .await?;
    Ok(updated)
}

/// Record a completed transfer. The funds left the wallet at reservation
/// time; this only accumulates the lifetime paid-out figure.
pub async fn finalize_payout(
    conn: &mut PgConnection,
    provider_id: Uuid,
    amount: &BigDecimal,
) -> AppResult<ProviderWallet> {
    let wallet = WalletRepository::lock_or_create(conn, provider_id).await?;
    let total_paid_out = &wallet.total_paid_out + amount;

    debug!(%provider_id, amount = %amount, total_paid_out = %total_paid_out, "finalizing payout");
    let updated = WalletRepository::apply_balances(
        conn,
        provider_id,
        &wallet.available_balance,
        &wallet.pending_balance,
        &total_paid_out,
    )
    .await?;
    Ok(updated)
}
