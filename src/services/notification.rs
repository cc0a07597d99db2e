//! Outbound notifications for order and payout status changes.
//!
//! Delivery is fire-and-forget and happens after the owning transaction has
//! committed. A lost notification never rolls back money movement; the event
//! history remains the source of truth.

use crate::database::order_repository::Order;
use crate::database::payout_repository::PayoutRequest;
use crate::orders::status::OrderStatus;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }

    pub fn order_status_changed(&self, order: &Order, from: OrderStatus, to: OrderStatus) {
        info!(
            order_id = %order.order_id,
            buyer_id = %order.buyer_id,
            provider_id = %order.provider_id,
            from = %from,
            to = %to,
            "notify: order status changed"
        );
    }

    pub fn payout_status_changed(&self, payout: &PayoutRequest) {
        info!(
            payout_id = %payout.payout_id,
            provider_id = %payout.provider_id,
            status = %payout.status,
            reference = %payout.reference,
            "notify: payout status changed"
        );
    }
}
