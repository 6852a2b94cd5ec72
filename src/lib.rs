//! Budget rules is a rule engine for categorizing bank transactions.
//!
//! Users write rules made of criteria (e.g. "payee contains Kroger") and
//! actions (e.g. "set category to Groceries"). This library decides which
//! rules match a transaction and works out the changes those rules make:
//!
//! - [evaluate_predicate] checks one field/operator/value condition.
//! - [rule_matches] combines a rule's criteria with AND or OR.
//! - [find_first_match] finds the highest precedence matching rule.
//! - [apply_actions] applies category, flag and memo actions.
//! - [process_transaction] and [RuleEngine] apply every matching active
//!   rule and record an [ExecutionRecord] for each.
//! - [export_rules] and [parse_rule_export] move rule sets in and out as JSON.
//!
//! The engine is a pure function of its inputs: it does not store rules,
//! transactions or execution records.

#![warn(missing_docs)]

mod config;
mod error;
mod logging;
mod rule;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use config::EngineConfig;
pub use error::Error;
pub use logging::setup_logging;
pub use rule::{
    Action, ActionKind, AmountOperator, Criterion, DateOperator, EXPORT_VERSION, ExecutionRecord,
    ExecutionSummary, Field, FieldValue, Operator, Predicate, ProcessOutcome, RelationOperator,
    Rule, RuleBuilder, RuleEngine, RuleId, RuleProblem, RuleStatus, RuleTally, RuleTest, TextField,
    TextOperator, apply_actions, category_for_transaction, evaluate_predicate, export_rules,
    find_first_match, import_rules, matching_transactions, order_by_precedence, parse_rule_export,
    process_transaction, rule_matches, test_rule, try_apply_actions, validate_rule,
    validate_rule_export,
};
pub use transaction::{
    PREVIEW_TRANSACTION_ID, Transaction, TransactionBuilder, read_transactions_csv,
    write_transactions_csv,
};
