//! Background reconciliation of stranded payout requests.
//!
//! A payout can be left in `processing` when the gateway's answer to the
//! original submission was lost (timeout, outage, or an in-flight "pending").
//! This worker periodically queries the gateway for each such request and
//! applies the definitive outcome through the same workflow the approval
//! path uses. Requests claimed very recently are skipped so the worker does
//! not race an approval that is still talking to the gateway.

use crate::config::ReconcilerConfig;
use crate::database::payout_repository::PayoutRepository;
use crate::payouts::workflow::PayoutWorkflow;
use chrono::Duration as ChronoDuration;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct PayoutReconciler {
    pool: PgPool,
    workflow: Arc<PayoutWorkflow>,
    config: ReconcilerConfig,
}

impl PayoutReconciler {
    pub fn new(pool: PgPool, workflow: Arc<PayoutWorkflow>, config: ReconcilerConfig) -> Self {
        Self {
            pool,
            workflow,
            config,
        }
    }

    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            min_age_secs = self.config.min_age_secs,
            batch_size = self.config.batch_size,
            "payout reconciler started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("payout reconciler stopping");
                        break;
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)) => {
                    if let Err(e) = self.run_cycle().await {
                        warn!(error = %e, "payout reconciliation cycle failed");
                    }
                }
            }
        }

        info!("payout reconciler stopped");
    }

    async fn run_cycle(&self) -> Result<(), crate::error::AppError> {
        let repo = PayoutRepository::new(self.pool.clone());
        let cutoff = chrono::Utc::now() - ChronoDuration::seconds(self.config.min_age_secs);
        let stranded = repo
            .list_processing_before(cutoff, self.config.batch_size)
            .await?;

        if stranded.is_empty() {
            return Ok(());
        }
        info!(count = stranded.len(), "reconciling stranded payouts");

        for payout in &stranded {
            match self.workflow.reconcile(payout).await {
                Ok(updated) if updated.status != payout.status => {
                    info!(
                        payout_id = %payout.payout_id,
                        from = %payout.status,
                        to = %updated.status,
                        "payout reconciled"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        payout_id = %payout.payout_id,
                        error = %e,
                        "payout reconciliation failed; will retry next cycle"
                    );
                }
            }
        }

        Ok(())
    }
}
