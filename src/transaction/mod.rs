//! Transactions processed by the rule engine.
//!
//! This module contains:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - CSV reading and writing for batches of transactions

mod core;
mod csv;

pub use self::core::{PREVIEW_TRANSACTION_ID, Transaction, TransactionBuilder};
pub use self::csv::{read_transactions_csv, write_transactions_csv};
