//! Decides whether rules match a transaction.

use crate::{
    rule::models::{ActionKind, RelationOperator, Rule, order_by_precedence},
    transaction::Transaction,
};

/// Check whether `transaction` meets the criteria of `rule`.
///
/// Every criterion is evaluated, then the results are combined with the
/// rule's relation operator. A rule without criteria never matches.
pub fn rule_matches(rule: &Rule, transaction: &Transaction) -> bool {
    if rule.criteria.is_empty() {
        return false;
    }

    let results: Vec<bool> = rule
        .criteria
        .iter()
        .map(|criterion| criterion.evaluate(transaction))
        .collect();

    tracing::debug!(
        "rule \"{}\" criteria results for transaction {}: {results:?}",
        rule.name,
        transaction.execution_id()
    );

    match rule.relation_operator {
        RelationOperator::And => results.iter().all(|result| *result),
        RelationOperator::Or => results.iter().any(|result| *result),
    }
}

/// Find the first rule, in evaluation order, that matches `transaction`.
///
/// Rules are ordered with [Rule::precedence], and the status of each rule is
/// not checked. Only the first match is returned: use
/// [crate::process_transaction] to apply every matching rule.
pub fn find_first_match<'a>(transaction: &Transaction, rules: &'a [Rule]) -> Option<&'a Rule> {
    order_by_precedence(rules)
        .into_iter()
        .find(|rule| rule_matches(rule, transaction))
}

/// Get the category that the first matching active rule would assign.
///
/// Returns `None` if no active rule matches or the matching rule has no
/// category action. If the rule has several category actions, the last one
/// wins, as it would when the actions are applied.
pub fn category_for_transaction(transaction: &Transaction, rules: &[Rule]) -> Option<String> {
    let rule = order_by_precedence(rules)
        .into_iter()
        .filter(|rule| rule.is_active())
        .find(|rule| rule_matches(rule, transaction))?;

    rule.actions
        .iter()
        .rev()
        .find(|action| action.kind == ActionKind::Category)
        .map(|action| action.value.clone())
}

/// Get the transactions that `rule` matches, keeping their input order.
pub fn matching_transactions<'a>(
    rule: &Rule,
    transactions: &'a [Transaction],
) -> Vec<&'a Transaction> {
    transactions
        .iter()
        .filter(|transaction| rule_matches(rule, transaction))
        .collect()
}
