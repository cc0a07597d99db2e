//! Order lifecycle manager.
//!
//! All order state changes flow through [`OrderLifecycle::transition`]. Each
//! transition runs in one database transaction that holds a row lock on the
//! order: validate against the transition table, apply the wallet effect if
//! the transition carries one, write the status and its timestamp column,
//! append the audit event, commit. If any step fails the whole transition
//! rolls back, so the order status and the wallet can never disagree.

use crate::clock::Clock;
use crate::database::order_repository::{NewOrder, NewOrderEvent, Order, OrderRepository};
use crate::error::{AppError, AppResult};
use crate::orders::status::OrderStatus;
use crate::services::notification::NotificationService;
use crate::wallet::ledger;
use sqlx::types::BigDecimal;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Wallet side effect carried by an order transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEffect {
    /// Buyer's money entered escrow; credit the provider's pending balance.
    Accrue,
    /// Escrow released to the provider; move pending to available.
    Settle,
    /// Escrow resolved back to the buyer; remove the pending attribution.
    ReverseAccrual,
}

/// The wallet effect of moving an order from `from` to `to`, if any.
///
/// Cancellations and expiries only touch the wallet when the money was
/// already in escrow; cancelling an unpaid order is bookkeeping-free.
pub fn wallet_effect(from: OrderStatus, to: OrderStatus) -> Option<WalletEffect> {
    match to {
        OrderStatus::PaidToEscrow => Some(WalletEffect::Accrue),
        OrderStatus::Released => Some(WalletEffect::Settle),
        OrderStatus::Refunded | OrderStatus::Chargeback => Some(WalletEffect::ReverseAccrual),
        OrderStatus::Cancelled | OrderStatus::Expired if from.holds_escrow() => {
            Some(WalletEffect::ReverseAccrual)
        }
        _ => None,
    }
}

/// Checkout amounts must be positive and add up before anything is written.
fn validate_amounts(new: &NewOrder) -> AppResult<()> {
    let zero = BigDecimal::from(0);
    if new.amount_gross <= zero {
        return Err(AppError::validation_field(
            "amount_gross must be positive",
            "amount_gross",
        ));
    }
    if new.platform_fee < zero || new.tax_amount < zero {
        return Err(AppError::validation(
            "platform_fee and tax_amount must not be negative",
        ));
    }
    if new.amount_net_provider <= zero {
        return Err(AppError::validation_field(
            "amount_net_provider must be positive",
            "amount_net_provider",
        ));
    }
    let expected = &new.platform_fee + &new.tax_amount + &new.amount_net_provider;
    if new.amount_gross != expected {
        return Err(AppError::validation(format!(
            "amount_gross {} does not equal platform_fee + tax_amount + amount_net_provider {}",
            new.amount_gross, expected
        )));
    }
    Ok(())
}

pub struct OrderLifecycle {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    notifier: NotificationService,
}

impl OrderLifecycle {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, notifier: NotificationService) -> Self {
        Self {
            pool,
            clock,
            notifier,
        }
    }

    /// Create an order in `created` status with its first audit event.
    #[instrument(skip(self, new), fields(buyer_id = %new.buyer_id, provider_id = %new.provider_id))]
    pub async fn create_order(&self, new: NewOrder, actor: &str) -> AppResult<Order> {
        validate_amounts(&new)?;

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let order = OrderRepository::insert(&mut tx, &new, now).await?;
        OrderRepository::append_event(
            &mut tx,
            &NewOrderEvent {
                order_id: order.order_id,
                event_type: "created".to_string(),
                previous_status: None,
                next_status: Some(OrderStatus::Created.as_str().to_string()),
                actor: actor.to_string(),
                note: None,
                payload: serde_json::json!({
                    "amount_gross": order.amount_gross.to_string(),
                    "amount_net_provider": order.amount_net_provider.to_string(),
                    "currency": order.currency,
                }),
                created_at: now,
            },
        )
        .await?;
        tx.commit().await?;

        info!(order_id = %order.order_id, "order created");
        Ok(order)
    }

    /// Move an order to `requested`, applying the wallet effect the
    /// transition carries. Returns the updated order.
    ///
    /// Repeating a release that already happened is a no-op rather than an
    /// error, so a retried release request cannot settle the same money
    /// twice.
    #[instrument(skip(self, note), fields(%order_id, to = %requested))]
    pub async fn transition(
        &self,
        order_id: Uuid,
        requested: OrderStatus,
        actor: &str,
        note: Option<String>,
    ) -> AppResult<Order> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::lock_by_id(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "Order",
                id: order_id.to_string(),
            })?;
        let current = OrderStatus::from_str(&order.status)?;

        if current == OrderStatus::Released && requested == OrderStatus::Released {
            tx.rollback().await?;
            return Ok(order);
        }

        if !current.can_transition_to(requested) {
            return Err(AppError::InvalidTransition {
                from: current.as_str().to_string(),
                to: requested.as_str().to_string(),
            });
        }

        match wallet_effect(current, requested) {
            Some(WalletEffect::Accrue) => {
                ledger::accrue(&mut tx, order.provider_id, &order.amount_net_provider).await?;
            }
            Some(WalletEffect::Settle) => {
                ledger::settle(&mut tx, order.provider_id, &order.amount_net_provider).await?;
            }
            Some(WalletEffect::ReverseAccrual) => {
                ledger::reverse_accrual(&mut tx, order.provider_id, &order.amount_net_provider)
                    .await?;
            }
            None => {}
        }

        let updated =
            OrderRepository::update_status(&mut tx, order_id, requested, requested.timestamp_field(), now)
                .await?;
        OrderRepository::append_event(
            &mut tx,
            &NewOrderEvent {
                order_id,
                event_type: "status_changed".to_string(),
                previous_status: Some(current.as_str().to_string()),
                next_status: Some(requested.as_str().to_string()),
                actor: actor.to_string(),
                note,
                payload: serde_json::Value::Object(Default::default()),
                created_at: now,
            },
        )
        .await?;
        tx.commit().await?;

        info!(%order_id, from = %current, to = %requested, "order transitioned");
        self.notifier.order_status_changed(&updated, current, requested);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn escrow_entry_accrues() {
        assert_eq!(
            wallet_effect(Created, PaidToEscrow),
            Some(WalletEffect::Accrue)
        );
    }

    #[test]
    fn release_settles_from_any_legal_predecessor() {
        assert_eq!(wallet_effect(Approved, Released), Some(WalletEffect::Settle));
        assert_eq!(wallet_effect(Disputed, Released), Some(WalletEffect::Settle));
    }

    #[test]
    fn refund_and_chargeback_reverse_the_accrual() {
        assert_eq!(
            wallet_effect(RefundPending, Refunded),
            Some(WalletEffect::ReverseAccrual)
        );
        assert_eq!(
            wallet_effect(RefundPending, Chargeback),
            Some(WalletEffect::ReverseAccrual)
        );
    }

    #[test]
    fn cancellation_reverses_only_when_escrow_was_funded() {
        assert_eq!(
            wallet_effect(PaidToEscrow, Cancelled),
            Some(WalletEffect::ReverseAccrual)
        );
        assert_eq!(
            wallet_effect(InProgress, Cancelled),
            Some(WalletEffect::ReverseAccrual)
        );
        assert_eq!(wallet_effect(Created, Cancelled), None);
        assert_eq!(wallet_effect(Created, Expired), None);
    }

    #[test]
    fn plain_progress_transitions_touch_no_balances() {
        assert_eq!(wallet_effect(PaidToEscrow, Accepted), None);
        assert_eq!(wallet_effect(Accepted, InProgress), None);
        assert_eq!(wallet_effect(InProgress, Delivered), None);
        assert_eq!(wallet_effect(Delivered, Approved), None);
        assert_eq!(wallet_effect(Approved, Disputed), None);
    }

    fn order(gross: &str, fee: &str, tax: &str, net: &str) -> NewOrder {
        use std::str::FromStr as _;
        NewOrder {
            buyer_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            tier_id: Uuid::new_v4(),
            amount_gross: BigDecimal::from_str(gross).unwrap(),
            platform_fee: BigDecimal::from_str(fee).unwrap(),
            tax_amount: BigDecimal::from_str(tax).unwrap(),
            amount_net_provider: BigDecimal::from_str(net).unwrap(),
            currency: "GHS".to_string(),
        }
    }

    #[test]
    fn checkout_amounts_must_be_positive_and_add_up() {
        assert!(validate_amounts(&order("500.00", "50.00", "25.00", "425.00")).is_ok());
        assert!(validate_amounts(&order("0", "0", "0", "0")).is_err());
        assert!(validate_amounts(&order("100.00", "-10.00", "0", "110.00")).is_err());
        assert!(validate_amounts(&order("100.00", "10.00", "0", "80.00")).is_err());
    }

    #[test]
    fn zero_net_amount_is_rejected() {
        let err = validate_amounts(&order("10.00", "10.00", "0", "0")).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
