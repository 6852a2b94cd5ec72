//! This file defines the `Rule` type and the engine that applies rules to transactions.
//! A rule matches transactions with field/operator/value criteria combined with AND or OR,
//! and sets the category, flag or memo of the transactions it matches.

mod actions;
mod import_export;
mod matcher;
mod models;
mod predicate;
mod processor;
mod validation;

pub use actions::{apply_actions, try_apply_actions};
pub use import_export::{
    EXPORT_VERSION, export_rules, import_rules, parse_rule_export, validate_rule_export,
};
pub use matcher::{category_for_transaction, find_first_match, matching_transactions, rule_matches};
pub use models::{
    Action, ActionKind, Criterion, RelationOperator, Rule, RuleBuilder, RuleId, RuleStatus,
    order_by_precedence,
};
pub use predicate::{
    AmountOperator, DateOperator, Field, FieldValue, Operator, Predicate, TextField, TextOperator,
    evaluate_predicate,
};
pub use processor::{
    ExecutionRecord, ExecutionSummary, ProcessOutcome, RuleEngine, RuleTally, RuleTest,
    process_transaction, test_rule,
};
pub use validation::{RuleProblem, validate_rule};
