//! Checks that a rule is complete before it is saved or run.

use crate::rule::{models::Rule, predicate::Operator};

/// Something wrong with a rule as written.
///
/// Criterion and action positions are counted from 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleProblem {
    /// The rule name is empty.
    #[error("Rule name is required")]
    MissingName,

    /// The rule has no criteria, so it can never match.
    #[error("At least one condition is required")]
    NoCriteria,

    /// A criterion has an empty value.
    #[error("Condition #{0}: Value is required")]
    EmptyCriterionValue(usize),

    /// A criterion value cannot be read for its field, e.g. `between` with
    /// only one number.
    #[error("Condition #{0}: \"{1}\" is not a valid value for this condition")]
    MalformedCriterionValue(usize, String),

    /// A `regex` criterion value does not compile.
    #[error("Condition #{0}: Invalid regex pattern")]
    InvalidPattern(usize),

    /// The rule has no actions, so matching it changes nothing.
    #[error("At least one action is required")]
    NoActions,

    /// An action has an empty value.
    #[error("Action #{0}: Value is required")]
    EmptyActionValue(usize),
}

/// Check that `rule` has a name, at least one criterion and one action, and
/// that every criterion and action has a usable value.
///
/// # Errors
/// Returns every [RuleProblem] found, in the order the parts of the rule are
/// written.
pub fn validate_rule(rule: &Rule) -> Result<(), Vec<RuleProblem>> {
    let mut problems = Vec::new();

    if rule.name.trim().is_empty() {
        problems.push(RuleProblem::MissingName);
    }

    if rule.criteria.is_empty() {
        problems.push(RuleProblem::NoCriteria);
    }

    for (index, criterion) in rule.criteria.iter().enumerate() {
        let position = index + 1;

        if criterion.value.trim().is_empty() {
            problems.push(RuleProblem::EmptyCriterionValue(position));
        } else if criterion.predicate().accepts_value(&criterion.value) {
            continue;
        } else if criterion.operator() == Operator::Matches {
            problems.push(RuleProblem::InvalidPattern(position));
        } else {
            problems.push(RuleProblem::MalformedCriterionValue(
                position,
                criterion.value.clone(),
            ));
        }
    }

    if rule.actions.is_empty() {
        problems.push(RuleProblem::NoActions);
    }

    for (index, action) in rule.actions.iter().enumerate() {
        if action.value.trim().is_empty() {
            problems.push(RuleProblem::EmptyActionValue(index + 1));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}
