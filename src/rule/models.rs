use std::{cmp::Ordering, fmt::Display};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    rule::predicate::{Field, Operator, Predicate},
    transaction::Transaction,
};

/// Identifier for a rule.
pub type RuleId = String;

/// A single field/operator/value condition within a rule.
///
/// The value is kept as it was written and parsed for the field at evaluation
/// time. The field and operator are checked when the criterion is built, so a
/// `Criterion` always holds an operator that is valid for its field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CriterionData", into = "CriterionData")]
pub struct Criterion {
    /// Identifies the criterion within its rule.
    pub id: String,
    predicate: Predicate,
    /// The value to compare the transaction field against.
    pub value: String,
}

impl Criterion {
    /// Create a criterion with an empty ID.
    ///
    /// # Errors
    /// Returns [Error::InvalidOperator] if `operator` cannot be used with `field`.
    pub fn new(field: Field, operator: Operator, value: &str) -> Result<Self, Error> {
        Ok(Self {
            id: String::new(),
            predicate: Predicate::new(field, operator)?,
            value: value.to_owned(),
        })
    }

    /// Set the ID of the criterion.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_owned();
        self
    }

    /// The transaction field this criterion looks at.
    pub fn field(&self) -> Field {
        self.predicate.field()
    }

    /// The comparison this criterion makes.
    pub fn operator(&self) -> Operator {
        self.predicate.operator()
    }

    /// The checked field/operator pair.
    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    /// Whether `transaction` satisfies this criterion.
    pub fn evaluate(&self, transaction: &Transaction) -> bool {
        self.predicate.evaluate(&self.value, transaction)
    }
}

/// The shape of a criterion in JSON.
///
/// Older exports name the field `type`, so that is accepted as an alias.
#[derive(Debug, Serialize, Deserialize)]
struct CriterionData {
    #[serde(default)]
    id: String,
    #[serde(alias = "type")]
    field: String,
    operator: String,
    value: String,
}

impl TryFrom<CriterionData> for Criterion {
    type Error = Error;

    fn try_from(data: CriterionData) -> Result<Self, Self::Error> {
        Ok(Self {
            id: data.id,
            predicate: Predicate::parse(&data.field, &data.operator)?,
            value: data.value,
        })
    }
}

impl From<Criterion> for CriterionData {
    fn from(criterion: Criterion) -> Self {
        let field = criterion.field().to_string();
        let operator = criterion.operator().to_string();

        Self {
            id: criterion.id,
            field,
            operator,
            value: criterion.value,
        }
    }
}

/// What an action does to a matching transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionKind {
    /// Set the transaction category.
    Category,
    /// Set the transaction flag.
    Flag,
    /// Append to the transaction memo.
    Memo,
    /// An action type the engine does not know about.
    ///
    /// Unrecognized actions are skipped with a warning when applied.
    Unrecognized(String),
}

impl ActionKind {
    /// The name used for this action type in rule exports.
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Category => "category",
            ActionKind::Flag => "flag",
            ActionKind::Memo => "memo",
            ActionKind::Unrecognized(name) => name,
        }
    }
}

impl TryFrom<String> for ActionKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "" => Err(Error::EmptyActionType),
            "category" => Ok(ActionKind::Category),
            "flag" => Ok(ActionKind::Flag),
            "memo" => Ok(ActionKind::Memo),
            _ => Ok(ActionKind::Unrecognized(value)),
        }
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A change made to a transaction when a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// Identifies the action within its rule.
    #[serde(default)]
    pub id: String,
    /// What the action does.
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// The category, flag or memo text the action applies.
    pub value: String,
}

impl Action {
    /// An action that sets the transaction category to `category`.
    pub fn category(category: &str) -> Self {
        Self::new(ActionKind::Category, category)
    }

    /// An action that sets the transaction flag to `flag`.
    pub fn flag(flag: &str) -> Self {
        Self::new(ActionKind::Flag, flag)
    }

    /// An action that appends `text` to the transaction memo.
    pub fn memo(text: &str) -> Self {
        Self::new(ActionKind::Memo, text)
    }

    /// An action of any kind with an empty ID.
    pub fn new(kind: ActionKind, value: &str) -> Self {
        Self {
            id: String::new(),
            kind,
            value: value.to_owned(),
        }
    }
}

/// How the criteria of a rule are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationOperator {
    /// Every criterion must match.
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    /// At least one criterion must match.
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// Whether a rule takes part in processing.
///
/// Only [RuleStatus::Active] rules are applied by the transaction processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    /// The rule is applied to transactions.
    Active,
    /// The rule is skipped.
    #[default]
    Inactive,
    /// The rule is waiting for review and is skipped.
    Pending,
}

/// A set of criteria and the actions to apply to transactions that meet them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// The ID of the rule.
    #[serde(default)]
    pub id: RuleId,
    /// A short name for the rule.
    pub name: String,
    /// A longer description of what the rule is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The conditions a transaction must meet. A rule without criteria never matches.
    pub criteria: Vec<Criterion>,
    /// The changes to make to matching transactions.
    pub actions: Vec<Action>,
    /// How the criteria are combined.
    #[serde(default)]
    pub relation_operator: RelationOperator,
    /// Whether the rule is applied during processing.
    #[serde(default)]
    pub status: RuleStatus,
    /// Lower numbers are evaluated first. Rules without a priority go last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// When the rule was created, used to order rules with equal priority.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    /// When the rule was last changed.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<OffsetDateTime>,
}

impl Rule {
    /// Create a new rule.
    ///
    /// Shortcut for [RuleBuilder] for discoverability.
    pub fn build(name: &str) -> RuleBuilder {
        RuleBuilder {
            rule: Rule {
                id: RuleId::new(),
                name: name.to_owned(),
                description: None,
                criteria: Vec::new(),
                actions: Vec::new(),
                relation_operator: RelationOperator::And,
                status: RuleStatus::Active,
                priority: None,
                created_at: None,
                last_modified: None,
            },
        }
    }

    /// Whether the rule takes part in processing.
    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    /// The evaluation order of two rules.
    ///
    /// Rules are ordered by ascending priority, then by ascending creation
    /// time, then by ID. A missing priority or creation time sorts after
    /// every present one.
    pub fn precedence(&self, other: &Rule) -> Ordering {
        compare_missing_last(self.priority, other.priority)
            .then_with(|| compare_missing_last(self.created_at, other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

fn compare_missing_last<T: Ord>(left: Option<T>, right: Option<T>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort `rules` into evaluation order, see [Rule::precedence].
pub fn order_by_precedence(rules: &[Rule]) -> Vec<&Rule> {
    let mut ordered: Vec<&Rule> = rules.iter().collect();
    ordered.sort_by(|left, right| left.precedence(right));
    ordered
}

/// A builder for creating [Rule] instances.
///
/// Rules start out active, with no criteria or actions, combining criteria
/// with AND.
///
/// # Examples
///
/// ```
/// use budget_rules::{Action, Criterion, Field, Operator, RelationOperator, Rule};
///
/// let rule = Rule::build("Groceries")
///     .criterion(Criterion::new(Field::Payee, Operator::Contains, "kroger").unwrap())
///     .criterion(Criterion::new(Field::Payee, Operator::Contains, "walmart").unwrap())
///     .relation_operator(RelationOperator::Or)
///     .action(Action::category("Groceries"))
///     .finalise();
///
/// assert_eq!(rule.criteria.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBuilder {
    rule: Rule,
}

impl RuleBuilder {
    /// Set the rule ID.
    pub fn id(mut self, id: &str) -> Self {
        self.rule.id = id.to_owned();
        self
    }

    /// Set the rule description.
    pub fn description(mut self, description: &str) -> Self {
        self.rule.description = Some(description.to_owned());
        self
    }

    /// Add a criterion.
    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.rule.criteria.push(criterion);
        self
    }

    /// Add an action.
    pub fn action(mut self, action: Action) -> Self {
        self.rule.actions.push(action);
        self
    }

    /// Set how criteria are combined.
    pub fn relation_operator(mut self, relation_operator: RelationOperator) -> Self {
        self.rule.relation_operator = relation_operator;
        self
    }

    /// Set the rule status.
    pub fn status(mut self, status: RuleStatus) -> Self {
        self.rule.status = status;
        self
    }

    /// Set the rule priority.
    pub fn priority(mut self, priority: i64) -> Self {
        self.rule.priority = Some(priority);
        self
    }

    /// Set when the rule was created.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.rule.created_at = Some(created_at);
        self
    }

    /// Set when the rule was last changed.
    pub fn last_modified(mut self, last_modified: OffsetDateTime) -> Self {
        self.rule.last_modified = Some(last_modified);
        self
    }

    /// Create the [Rule].
    pub fn finalise(self) -> Rule {
        self.rule
    }
}
