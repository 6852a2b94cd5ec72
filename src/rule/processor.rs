//! Runs rule sets over transactions and records the outcome of each rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    config::EngineConfig,
    rule::{
        actions::{apply_actions, try_apply_actions},
        matcher::rule_matches,
        models::{Rule, RuleId, order_by_precedence},
    },
    transaction::Transaction,
};

/// An audit entry for one rule that matched one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// The rule that matched.
    pub rule_id: RuleId,
    /// The transaction the rule matched, or `"preview"` if it has no ID.
    pub transaction_id: String,
    /// Whether the rule's actions were applied.
    pub success: bool,
    /// Why the actions could not be applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the rule was run.
    #[serde(with = "time::serde::rfc3339")]
    pub executed_at: OffsetDateTime,
}

impl ExecutionRecord {
    fn succeeded(rule: &Rule, transaction: &Transaction) -> Self {
        Self {
            rule_id: rule.id.clone(),
            transaction_id: transaction.execution_id().to_owned(),
            success: true,
            error_message: None,
            executed_at: OffsetDateTime::now_utc(),
        }
    }

    fn failed(rule: &Rule, transaction: &Transaction, error: &Error) -> Self {
        Self {
            rule_id: rule.id.clone(),
            transaction_id: transaction.execution_id().to_owned(),
            success: false,
            error_message: Some(error.to_string()),
            executed_at: OffsetDateTime::now_utc(),
        }
    }
}

/// The result of running a rule set over one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    /// The transaction with the actions of every matching rule applied.
    pub transaction: Transaction,
    /// One record per matching rule, in the order the rules were run.
    pub executions: Vec<ExecutionRecord>,
}

/// The result of a dry run of one rule against one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTest {
    /// Whether the rule matched.
    pub matches: bool,
    /// The transaction with the rule's actions applied if it matched,
    /// otherwise the unchanged transaction.
    pub result: Transaction,
}

/// Applies rule sets to transactions.
///
/// The engine holds no state between calls apart from its [EngineConfig],
/// which lists the categories and flags that actions may assign.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: EngineConfig,
}

impl RuleEngine {
    /// Create an engine that checks actions against `config`.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The categories and flags this engine allows.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply every matching active rule to `transaction`.
    ///
    /// Rules are run in the order given by [Rule::precedence], skipping rules
    /// that are not active. Each rule is matched against the input
    /// transaction, and the actions of matching rules are applied on top of
    /// the changes made by earlier rules, so later rules overwrite the
    /// category and flag and add to the memo.
    ///
    /// A rule whose actions are not allowed by the engine config is recorded
    /// as failed and leaves the transaction as it was, and the remaining rules
    /// are still run.
    ///
    /// # Errors
    /// Returns [Error::NoRules] if `rules` is empty.
    pub fn process_transaction(
        &self,
        transaction: &Transaction,
        rules: &[Rule],
    ) -> Result<ProcessOutcome, Error> {
        if rules.is_empty() {
            return Err(Error::NoRules);
        }

        let mut working = transaction.clone();
        let mut executions = Vec::new();

        for rule in order_by_precedence(rules) {
            if !rule.is_active() {
                tracing::debug!("skipping {:?} rule \"{}\"", rule.status, rule.name);
                continue;
            }

            if !rule_matches(rule, transaction) {
                continue;
            }

            match try_apply_actions(&rule.actions, &working, &self.config) {
                Ok(updated) => {
                    tracing::debug!(
                        "rule \"{}\" applied to transaction {}",
                        rule.name,
                        transaction.execution_id()
                    );
                    working = updated;
                    executions.push(ExecutionRecord::succeeded(rule, transaction));
                }
                Err(error) => {
                    tracing::warn!(
                        "rule \"{}\" failed on transaction {}: {error}",
                        rule.name,
                        transaction.execution_id()
                    );
                    executions.push(ExecutionRecord::failed(rule, transaction, &error));
                }
            }
        }

        Ok(ProcessOutcome {
            transaction: working,
            executions,
        })
    }

    /// Apply [RuleEngine::process_transaction] to each transaction.
    ///
    /// Outcomes are returned in the same order as `transactions`.
    ///
    /// # Errors
    /// Returns [Error::NoTransactions] if `transactions` is empty, or
    /// [Error::NoRules] if `rules` is empty.
    pub fn process_batch(
        &self,
        transactions: &[Transaction],
        rules: &[Rule],
    ) -> Result<Vec<ProcessOutcome>, Error> {
        if transactions.is_empty() {
            return Err(Error::NoTransactions);
        }

        transactions
            .iter()
            .map(|transaction| self.process_transaction(transaction, rules))
            .collect()
    }
}

/// Apply every matching active rule to `transaction` with a default engine.
///
/// See [RuleEngine::process_transaction].
///
/// # Errors
/// Returns [Error::NoRules] if `rules` is empty.
pub fn process_transaction(
    transaction: &Transaction,
    rules: &[Rule],
) -> Result<ProcessOutcome, Error> {
    RuleEngine::default().process_transaction(transaction, rules)
}

/// Dry run `rule` against `transaction`.
///
/// The rule status is ignored and the actions are not checked against any
/// config, so this always returns a result.
pub fn test_rule(rule: &Rule, transaction: &Transaction) -> RuleTest {
    let matches = rule_matches(rule, transaction);
    let result = if matches {
        apply_actions(&rule.actions, transaction)
    } else {
        transaction.clone()
    };

    RuleTest { matches, result }
}

/// Success and failure counts for one rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleTally {
    /// Number of successful executions.
    pub succeeded: usize,
    /// Number of failed executions.
    pub failed: usize,
}

/// Totals over a set of execution records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    /// Number of successful executions.
    pub succeeded: usize,
    /// Number of failed executions.
    pub failed: usize,
    /// Counts per rule ID.
    pub by_rule: BTreeMap<RuleId, RuleTally>,
}

impl ExecutionSummary {
    /// Count the successes and failures in `records`.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ExecutionRecord>) -> Self {
        let mut summary = Self::default();

        for record in records {
            let tally = summary.by_rule.entry(record.rule_id.clone()).or_default();

            if record.success {
                summary.succeeded += 1;
                tally.succeeded += 1;
            } else {
                summary.failed += 1;
                tally.failed += 1;
            }
        }

        summary
    }

    /// The number of records counted.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod processor_tests {
    use crate::{
        Error,
        config::EngineConfig,
        rule::models::{Action, Rule, RuleStatus},
        test_utils::{payee_contains, transaction},
        transaction::Transaction,
    };

    use super::{ExecutionSummary, RuleEngine, RuleTally, process_transaction, test_rule};

    fn category_rule(id: &str, priority: i64, category: &str) -> Rule {
        Rule::build(id)
            .id(id)
            .priority(priority)
            .criterion(payee_contains("kroger"))
            .action(Action::category(category))
            .finalise()
    }

    #[test]
    fn no_rules_is_an_error() {
        let result = process_transaction(&transaction("Kroger", 10.0), &[]);

        assert_eq!(result, Err(Error::NoRules));
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let input = transaction("Kroger", 10.0);
        let rules = vec![
            Rule::build("Inactive")
                .id("inactive")
                .status(RuleStatus::Inactive)
                .criterion(payee_contains("kroger"))
                .action(Action::category("Groceries"))
                .action(Action::memo("auto"))
                .finalise(),
            Rule::build("Pending")
                .id("pending")
                .status(RuleStatus::Pending)
                .criterion(payee_contains("kroger"))
                .action(Action::flag("red"))
                .finalise(),
        ];

        let outcome = process_transaction(&input, &rules).unwrap();

        assert!(outcome.executions.is_empty());
        assert_eq!(outcome.transaction, input);
    }

    #[test]
    fn later_rules_overwrite_earlier_ones() {
        let rules = vec![
            category_rule("second", 2, "Household"),
            category_rule("first", 1, "Groceries"),
        ];

        let outcome = process_transaction(&transaction("Kroger", 10.0), &rules).unwrap();

        assert_eq!(outcome.transaction.category.as_deref(), Some("Household"));
        let rule_ids: Vec<&str> = outcome
            .executions
            .iter()
            .map(|record| record.rule_id.as_str())
            .collect();
        assert_eq!(rule_ids, vec!["first", "second"]);
    }

    #[test]
    fn memo_actions_accumulate_across_rules() {
        let rules = vec![
            Rule::build("a")
                .priority(1)
                .criterion(payee_contains("kroger"))
                .action(Action::memo("groceries"))
                .finalise(),
            Rule::build("b")
                .priority(2)
                .criterion(payee_contains("kroger"))
                .action(Action::memo("reviewed"))
                .finalise(),
        ];
        let mut input = transaction("Kroger", 10.0);
        input.memo = "x".to_owned();

        let outcome = process_transaction(&input, &rules).unwrap();

        assert_eq!(outcome.transaction.memo, "x groceries reviewed");
        assert_eq!(input.memo, "x");
    }

    #[test]
    fn records_use_transaction_id() {
        let input = Transaction::build("Kroger", 10.0, "2025-01-01")
            .id("tx-9")
            .finalise();

        let outcome = process_transaction(&input, &[category_rule("r", 1, "Groceries")]).unwrap();

        assert_eq!(outcome.executions.len(), 1);
        assert_eq!(outcome.executions[0].transaction_id, "tx-9");
        assert!(outcome.executions[0].success);
        assert_eq!(outcome.executions[0].error_message, None);
    }

    #[test]
    fn failing_rule_does_not_stop_processing() {
        let engine = RuleEngine::new(EngineConfig::new(["Groceries", "Household"], ["blue"]));
        let rules = vec![
            category_rule("good", 1, "Groceries"),
            Rule::build("bad")
                .id("bad")
                .priority(2)
                .criterion(payee_contains("kroger"))
                .action(Action::memo("not applied"))
                .action(Action::category("Takeaways"))
                .finalise(),
            category_rule("also good", 3, "Household"),
        ];

        let outcome = engine
            .process_transaction(&transaction("Kroger", 10.0), &rules)
            .unwrap();

        assert_eq!(outcome.transaction.category.as_deref(), Some("Household"));
        assert_eq!(outcome.transaction.memo, "");
        let results: Vec<(&str, bool)> = outcome
            .executions
            .iter()
            .map(|record| (record.rule_id.as_str(), record.success))
            .collect();
        assert_eq!(
            results,
            vec![("good", true), ("bad", false), ("also good", true)]
        );
        assert_eq!(
            outcome.executions[1].error_message.as_deref(),
            Some("the category \"Takeaways\" is not one of the available categories")
        );
    }

    #[test]
    fn non_matching_rules_leave_no_record() {
        let outcome = process_transaction(
            &transaction("Shell", 80.0),
            &[category_rule("groceries", 1, "Groceries")],
        )
        .unwrap();

        assert!(outcome.executions.is_empty());
        assert_eq!(outcome.transaction.category, None);
    }

    #[test]
    fn batch_keeps_order() {
        let rules = vec![category_rule("groceries", 1, "Groceries")];
        let transactions = vec![transaction("Kroger", 10.0), transaction("Shell", 80.0)];

        let outcomes = RuleEngine::default()
            .process_batch(&transactions, &rules)
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].transaction.category.as_deref(), Some("Groceries"));
        assert_eq!(outcomes[1].transaction.category, None);
    }

    #[test]
    fn empty_batch_is_an_error() {
        let rules = vec![category_rule("groceries", 1, "Groceries")];

        let result = RuleEngine::default().process_batch(&[], &rules);

        assert_eq!(result, Err(Error::NoTransactions));
    }

    #[test]
    fn test_rule_applies_only_on_match() {
        let rule = category_rule("groceries", 1, "Groceries");

        let hit = test_rule(&rule, &transaction("Kroger", 10.0));
        let miss = test_rule(&rule, &transaction("Shell", 10.0));

        assert!(hit.matches);
        assert_eq!(hit.result.category.as_deref(), Some("Groceries"));
        assert!(!miss.matches);
        assert_eq!(miss.result, transaction("Shell", 10.0));
    }

    #[test]
    fn test_rule_ignores_status() {
        let mut rule = category_rule("groceries", 1, "Groceries");
        rule.status = RuleStatus::Inactive;

        assert!(test_rule(&rule, &transaction("Kroger", 10.0)).matches);
    }

    #[test]
    fn summary_counts_by_rule() {
        let engine = RuleEngine::new(EngineConfig::new(["Groceries"], Vec::<String>::new()));
        let rules = vec![
            category_rule("good", 1, "Groceries"),
            category_rule("bad", 2, "Unknown"),
        ];
        let transactions = vec![transaction("Kroger", 1.0), transaction("kroger", 2.0)];

        let outcomes = engine.process_batch(&transactions, &rules).unwrap();
        let summary = ExecutionSummary::from_records(
            outcomes.iter().flat_map(|outcome| outcome.executions.iter()),
        );

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(
            summary.by_rule["good"],
            RuleTally {
                succeeded: 2,
                failed: 0
            }
        );
        assert_eq!(
            summary.by_rule["bad"],
            RuleTally {
                succeeded: 0,
                failed: 2
            }
        );
    }
}
