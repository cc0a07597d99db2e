pub mod payout_reconciler;
