//! Fixtures shared by the unit tests.

use crate::{
    rule::{Criterion, Field, Operator},
    transaction::Transaction,
};

/// A transaction on 2025-01-15 with only a payee and amount.
pub(crate) fn transaction(payee: &str, amount: f64) -> Transaction {
    Transaction::build(payee, amount, "2025-01-15").finalise()
}

/// A criterion matching payees that contain `value`.
pub(crate) fn payee_contains(value: &str) -> Criterion {
    Criterion::new(Field::Payee, Operator::Contains, value)
        .expect("contains is a valid payee operator")
}
