//! Defines the core data model for transactions fed to the rule engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A bank transaction, as supplied to the rule engine.
///
/// The rule engine treats transactions as read-only input: processing a
/// transaction returns a new [Transaction] with the rule actions applied.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction, if it has one.
    ///
    /// Transactions without an ID are treated as previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Who the money was paid to or received from.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payee: String,
    /// Free text attached to the transaction.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub memo: String,
    /// The amount of money spent or earned, in currency units (not cents).
    pub amount: f64,
    /// When the transaction happened, as an ISO-8601 date or date-time.
    pub date: String,
    /// The name of the account the transaction belongs to.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub account: String,
    /// The category assigned to the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The flag assigned to the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    /// Any other fields supplied with the transaction.
    ///
    /// These are carried through processing untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(payee: &str, amount: f64, date: &str) -> TransactionBuilder {
        TransactionBuilder {
            id: None,
            payee: payee.to_owned(),
            memo: String::new(),
            amount,
            date: date.to_owned(),
            account: String::new(),
            category: None,
            flag: None,
        }
    }

    /// The ID used when recording rule executions for this transaction.
    pub fn execution_id(&self) -> &str {
        self.id.as_deref().unwrap_or(PREVIEW_TRANSACTION_ID)
    }
}

/// Read a text field that may be `null` as an empty string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The transaction ID recorded for transactions without an ID.
pub const PREVIEW_TRANSACTION_ID: &str = "preview";

/// A builder for creating [Transaction] instances.
///
/// # Examples
///
/// ```
/// use budget_rules::Transaction;
///
/// let transaction = Transaction::build("Kroger #512", -45.99, "2025-01-15")
///     .memo("weekly shop")
///     .account("Checking")
///     .finalise();
///
/// assert_eq!(transaction.category, None);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    id: Option<String>,
    payee: String,
    memo: String,
    amount: f64,
    date: String,
    account: String,
    category: Option<String>,
    flag: Option<String>,
}

impl TransactionBuilder {
    /// Set the ID for the transaction.
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_owned());
        self
    }

    /// Set the memo for the transaction.
    pub fn memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_owned();
        self
    }

    /// Set the account name for the transaction.
    pub fn account(mut self, account: &str) -> Self {
        self.account = account.to_owned();
        self
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category: Option<&str>) -> Self {
        self.category = category.map(str::to_owned);
        self
    }

    /// Set the flag for the transaction.
    pub fn flag(mut self, flag: Option<&str>) -> Self {
        self.flag = flag.map(str::to_owned);
        self
    }

    /// Create the [Transaction].
    pub fn finalise(self) -> Transaction {
        Transaction {
            id: self.id,
            payee: self.payee,
            memo: self.memo,
            amount: self.amount,
            date: self.date,
            account: self.account,
            category: self.category,
            flag: self.flag,
            extra: BTreeMap::new(),
        }
    }
}
