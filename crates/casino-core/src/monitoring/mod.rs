//! Confirmation tracking for submitted wagers.

pub mod transaction;

pub use transaction::TransactionMonitor;
