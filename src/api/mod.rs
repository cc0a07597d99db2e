//! HTTP surface: request/response types and handlers.

pub mod orders;
pub mod payouts;
pub mod wallets;

use crate::database::destination_repository::DestinationRepository;
use crate::database::order_repository::OrderRepository;
use crate::database::payout_repository::PayoutRepository;
use crate::database::wallet_repository::WalletRepository;
use crate::orders::lifecycle::OrderLifecycle;
use crate::payouts::workflow::PayoutWorkflow;
use axum::http::HeaderMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<OrderLifecycle>,
    pub payouts: Arc<PayoutWorkflow>,
    pub order_repo: Arc<OrderRepository>,
    pub payout_repo: Arc<PayoutRepository>,
    pub wallet_repo: Arc<WalletRepository>,
    pub destination_repo: Arc<DestinationRepository>,
}

/// The acting party for audit events, from the `x-actor-id` header.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("system")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn actor_defaults_to_system() {
        let headers = HeaderMap::new();
        assert_eq!(actor_from_headers(&headers), "system");
    }

    #[test]
    fn actor_comes_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-id", HeaderValue::from_static("buyer:42"));
        assert_eq!(actor_from_headers(&headers), "buyer:42");
    }
}
