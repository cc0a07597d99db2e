//! Escrow order and provider payout engine for a services marketplace.
//!
//! Buyers pay into escrow at checkout; the money is released to the
//! provider's wallet when the work is approved, or returned to the buyer on
//! refund. Providers withdraw their available balance through payout
//! requests settled over a mobile money transfer gateway.

pub mod api;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod orders;
pub mod payouts;
pub mod services;
pub mod wallet;
pub mod workers;
