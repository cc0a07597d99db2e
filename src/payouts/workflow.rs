//! Payout request workflow.
//!
//! Money leaves the platform here, so the workflow is built around two
//! rules. First, funds are reserved (debited from available balance) in the
//! same transaction that creates the request, and are returned only when the
//! request reaches `failed` or `cancelled`. Second, the gateway is called at
//! most once per approval: the approver claims the request by flipping it to
//! `processing` under a row lock and committing before the call, so a
//! concurrent approval finds a non-`requested` status and backs off.
//!
//! The gateway call itself runs outside any transaction. When its outcome is
//! uncertain (timeout, outage, or an answer that could not be decoded) the
//! request stays `processing` until a status query, here or in the
//! reconciliation worker, confirms what happened. Reserved funds are never
//! returned on uncertainty alone; only an explicit refusal refunds
//! immediately.

use crate::clock::Clock;
use crate::config::PayoutConfig;
use crate::database::destination_repository::DestinationRepository;
use crate::database::payout_repository::{NewPayoutRequest, PayoutRepository, PayoutRequest};
use crate::error::{AppError, AppResult};
use crate::gateway::client::TransferGateway;
use crate::gateway::types::{MomoNetwork, TransferOutcome, TransferRequest, TransferStatus};
use crate::payouts::status::PayoutStatus;
use crate::services::notification::NotificationService;
use crate::wallet::ledger;
use sqlx::types::BigDecimal;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

fn validate_requested_amount(amount: &BigDecimal, minimum: &BigDecimal) -> AppResult<()> {
    if *amount <= BigDecimal::from(0) {
        return Err(AppError::validation_field(
            "amount must be positive",
            "amount",
        ));
    }
    if amount < minimum {
        return Err(AppError::validation_field(
            format!("amount {} is below the minimum payout of {}", amount, minimum),
            "amount",
        ));
    }
    Ok(())
}

pub struct PayoutWorkflow {
    pool: PgPool,
    gateway: Arc<dyn TransferGateway>,
    config: PayoutConfig,
    clock: Arc<dyn Clock>,
    notifier: NotificationService,
}

impl PayoutWorkflow {
    pub fn new(
        pool: PgPool,
        gateway: Arc<dyn TransferGateway>,
        config: PayoutConfig,
        clock: Arc<dyn Clock>,
        notifier: NotificationService,
    ) -> Self {
        Self {
            pool,
            gateway,
            config,
            clock,
            notifier,
        }
    }

    /// Create a payout request, reserving the amount against the provider's
    /// available balance. Reservation and request row commit atomically; if
    /// the balance cannot cover the amount, no row is created.
    #[instrument(skip(self, amount), fields(%provider_id, amount = %amount))]
    pub async fn create(&self, provider_id: Uuid, amount: BigDecimal) -> AppResult<PayoutRequest> {
        validate_requested_amount(&amount, &self.config.minimum_amount)?;

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let destination = DestinationRepository::find_in_tx(&mut tx, provider_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "PayoutDestination",
                id: provider_id.to_string(),
            })?;
        // Reject an unpayable network before touching the wallet.
        let network = MomoNetwork::from_str(&destination.momo_network)?;

        ledger::reserve_for_payout(&mut tx, provider_id, &amount).await?;

        let reference = format!("adw-po-{}", Uuid::new_v4().simple());
        let payout = PayoutRepository::insert(
            &mut tx,
            &NewPayoutRequest {
                provider_id,
                amount,
                currency: self.config.currency.clone(),
                momo_number: destination.momo_number,
                momo_network: network.as_str().to_string(),
                reference,
            },
            now,
        )
        .await?;
        tx.commit().await?;

        info!(payout_id = %payout.payout_id, reference = %payout.reference, "payout requested");
        self.notifier.payout_status_changed(&payout);
        Ok(payout)
    }

    /// Approve a `requested` payout and submit the transfer to the gateway.
    #[instrument(skip(self), fields(%payout_id))]
    pub async fn approve(&self, payout_id: Uuid) -> AppResult<PayoutRequest> {
        let claimed = self.claim(payout_id).await?;

        let network = MomoNetwork::from_str(&claimed.momo_network)?;
        let destination = DestinationRepository::new(self.pool.clone())
            .find_by_provider(claimed.provider_id)
            .await?;
        let transfer = TransferRequest {
            network,
            destination_number: claimed.momo_number.clone(),
            destination_name: destination.and_then(|d| d.account_name),
            amount: claimed.amount.clone(),
            currency: claimed.currency.clone(),
            reference: claimed.reference.clone(),
            narration: format!("Payout {}", claimed.payout_id),
        };

        match self.gateway.transfer(transfer).await {
            Ok(outcome) => self.apply_outcome(payout_id, &outcome).await,
            Err(err) if err.completion_uncertain() => {
                warn!(
                    %payout_id,
                    reference = %claimed.reference,
                    error = %err,
                    "transfer outcome uncertain; querying gateway before deciding"
                );
                self.resolve_uncertain(payout_id, &claimed.reference, &err.to_string())
                    .await
            }
            Err(err) => {
                // An explicit refusal; the gateway never executed the
                // transfer, so the reservation comes straight back.
                self.record_failure(payout_id, &err.to_string()).await
            }
        }
    }

    /// Deny a `requested` payout and return the reserved funds.
    #[instrument(skip(self, reason), fields(%payout_id))]
    pub async fn deny(&self, payout_id: Uuid, reason: Option<String>) -> AppResult<PayoutRequest> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let payout = PayoutRepository::lock_by_id(&mut tx, payout_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "PayoutRequest",
                id: payout_id.to_string(),
            })?;
        let current = PayoutStatus::from_str(&payout.status)?;
        if !current.can_transition_to(PayoutStatus::Cancelled) {
            return Err(AppError::InvalidPayoutTransition {
                from: current.as_str().to_string(),
                to: PayoutStatus::Cancelled.as_str().to_string(),
            });
        }

        ledger::return_reservation(&mut tx, payout.provider_id, &payout.amount).await?;
        let updated = PayoutRepository::update_status(
            &mut tx,
            payout_id,
            PayoutStatus::Cancelled,
            None,
            reason.as_deref(),
            serde_json::json!({}),
            now,
        )
        .await?;
        tx.commit().await?;

        info!(%payout_id, "payout denied");
        self.notifier.payout_status_changed(&updated);
        Ok(updated)
    }

    /// Re-check one `processing` request against the gateway. Called by the
    /// reconciliation worker for requests stranded by an uncertain outcome.
    #[instrument(skip(self, payout), fields(payout_id = %payout.payout_id))]
    pub async fn reconcile(&self, payout: &PayoutRequest) -> AppResult<PayoutRequest> {
        self.resolve_uncertain(
            payout.payout_id,
            &payout.reference,
            "transfer outcome unresolved at submission time",
        )
        .await
    }

    /// Claim the request for gateway submission: `requested` flips to
    /// `processing` under the row lock and commits before any network call.
    async fn claim(&self, payout_id: Uuid) -> AppResult<PayoutRequest> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let payout = PayoutRepository::lock_by_id(&mut tx, payout_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "PayoutRequest",
                id: payout_id.to_string(),
            })?;
        let current = PayoutStatus::from_str(&payout.status)?;
        if !current.can_transition_to(PayoutStatus::Processing) {
            return Err(AppError::InvalidPayoutTransition {
                from: current.as_str().to_string(),
                to: PayoutStatus::Processing.as_str().to_string(),
            });
        }

        let claimed = PayoutRepository::update_status(
            &mut tx,
            payout_id,
            PayoutStatus::Processing,
            None,
            None,
            serde_json::json!({}),
            now,
        )
        .await?;
        tx.commit().await?;
        Ok(claimed)
    }

    /// Record a definitive gateway outcome for a `processing` request. A
    /// request that is no longer `processing` was already resolved by a
    /// competing path and is returned unchanged.
    async fn apply_outcome(
        &self,
        payout_id: Uuid,
        outcome: &TransferOutcome,
    ) -> AppResult<PayoutRequest> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let payout = PayoutRepository::lock_by_id(&mut tx, payout_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "PayoutRequest",
                id: payout_id.to_string(),
            })?;
        if PayoutStatus::from_str(&payout.status)? != PayoutStatus::Processing {
            tx.rollback().await?;
            return Ok(payout);
        }

        let patch = serde_json::json!({ "gateway_response": outcome.raw });
        let updated = match outcome.status {
            TransferStatus::Succeeded => {
                ledger::finalize_payout(&mut tx, payout.provider_id, &payout.amount).await?;
                PayoutRepository::update_status(
                    &mut tx,
                    payout_id,
                    PayoutStatus::Paid,
                    outcome.gateway_transfer_id.as_deref(),
                    None,
                    patch,
                    now,
                )
                .await?
            }
            TransferStatus::Pending => {
                // Still in flight at the gateway; keep the claim and let the
                // reconciliation worker follow up.
                PayoutRepository::update_status(
                    &mut tx,
                    payout_id,
                    PayoutStatus::Processing,
                    outcome.gateway_transfer_id.as_deref(),
                    None,
                    patch,
                    now,
                )
                .await?
            }
            TransferStatus::Failed => {
                ledger::return_reservation(&mut tx, payout.provider_id, &payout.amount).await?;
                PayoutRepository::update_status(
                    &mut tx,
                    payout_id,
                    PayoutStatus::Failed,
                    outcome.gateway_transfer_id.as_deref(),
                    Some(
                        outcome
                            .gateway_status
                            .as_deref()
                            .unwrap_or("transfer failed"),
                    ),
                    patch,
                    now,
                )
                .await?
            }
        };
        tx.commit().await?;

        info!(%payout_id, status = %updated.status, "payout outcome recorded");
        if outcome.status != TransferStatus::Pending {
            self.notifier.payout_status_changed(&updated);
        }
        Ok(updated)
    }

    /// Decide a request whose submission outcome is unknown. One status
    /// query: no record at the gateway means the transfer never executed and
    /// the reservation is safe to return; a definitive record is applied as
    /// usual; anything else leaves the request `processing` for the
    /// reconciliation worker.
    async fn resolve_uncertain(
        &self,
        payout_id: Uuid,
        reference: &str,
        cause: &str,
    ) -> AppResult<PayoutRequest> {
        match self.gateway.transfer_status(reference).await {
            Ok(Some(outcome)) => self.apply_outcome(payout_id, &outcome).await,
            Ok(None) => self.record_failure(payout_id, cause).await,
            Err(err) => {
                warn!(
                    %payout_id,
                    reference = %reference,
                    error = %err,
                    "gateway status query failed; leaving request processing"
                );
                let repo = PayoutRepository::new(self.pool.clone());
                repo.find_by_id(payout_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound {
                        entity: "PayoutRequest",
                        id: payout_id.to_string(),
                    })
            }
        }
    }

    /// Mark a `processing` request failed and return the reservation.
    async fn record_failure(&self, payout_id: Uuid, reason: &str) -> AppResult<PayoutRequest> {
        self.apply_outcome(
            payout_id,
            &TransferOutcome {
                status: TransferStatus::Failed,
                gateway_transfer_id: None,
                gateway_status: Some(reason.to_string()),
                raw: serde_json::json!({ "failure": reason }),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn requested_amount_must_be_positive() {
        let minimum = dec("10.00");
        assert!(validate_requested_amount(&dec("0"), &minimum).is_err());
        assert!(validate_requested_amount(&dec("-5.00"), &minimum).is_err());
        assert!(validate_requested_amount(&dec("10.00"), &minimum).is_ok());
    }

    #[test]
    fn requested_amount_must_meet_the_minimum() {
        let minimum = dec("10.00");
        let err = validate_requested_amount(&dec("9.99"), &minimum).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(validate_requested_amount(&dec("250.00"), &minimum).is_ok());
    }
}
