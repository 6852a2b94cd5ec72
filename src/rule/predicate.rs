//! Evaluates a single field/operator/value condition against a transaction.
//!
//! Which operators a field accepts is encoded in [Predicate], so an invalid
//! pair such as `payee between` is rejected when the predicate is built rather
//! than silently evaluating to `false` for every transaction.

use std::{fmt::Display, str::FromStr};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::{Error, transaction::Transaction};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const DATE_TIME_SUBSECOND_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// The transaction field a criterion looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Who the money was paid to or received from.
    Payee,
    /// The transaction memo.
    Memo,
    /// The transaction amount.
    Amount,
    /// The transaction date.
    Date,
    /// The account name.
    Account,
}

impl Field {
    /// The operators that may be used with this field.
    pub fn operators(&self) -> &'static [Operator] {
        match self {
            Field::Payee | Field::Memo | Field::Account => &[
                Operator::Contains,
                Operator::Equals,
                Operator::StartsWith,
                Operator::EndsWith,
                Operator::Matches,
            ],
            Field::Amount => &[
                Operator::Equals,
                Operator::GreaterThan,
                Operator::LessThan,
                Operator::Between,
            ],
            Field::Date => &[
                Operator::Equals,
                Operator::After,
                Operator::Before,
                Operator::Between,
            ],
        }
    }

    /// The name used for this field in rule exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Payee => "payee",
            Field::Memo => "memo",
            Field::Amount => "amount",
            Field::Date => "date",
            Field::Account => "account",
        }
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payee" => Ok(Field::Payee),
            "memo" => Ok(Field::Memo),
            "amount" => Ok(Field::Amount),
            "date" => Ok(Field::Date),
            "account" => Ok(Field::Account),
            _ => Err(Error::UnknownField(s.to_owned())),
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a criterion compares its value with the transaction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Case-insensitive substring match.
    Contains,
    /// Case-insensitive text equality, exact numeric equality or same calendar day.
    Equals,
    /// Case-insensitive prefix match.
    StartsWith,
    /// Case-insensitive suffix match.
    EndsWith,
    /// Case-insensitive regular expression search.
    #[serde(rename = "regex")]
    Matches,
    /// Strictly greater than.
    GreaterThan,
    /// Strictly less than.
    LessThan,
    /// Inclusive range written as `"min,max"`.
    Between,
    /// Strictly later than.
    After,
    /// Strictly earlier than.
    Before,
}

impl Operator {
    /// The name used for this operator in rule exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Contains => "contains",
            Operator::Equals => "equals",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Matches => "regex",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::Between => "between",
            Operator::After => "after",
            Operator::Before => "before",
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(Operator::Contains),
            "equals" => Ok(Operator::Equals),
            "starts_with" => Ok(Operator::StartsWith),
            "ends_with" => Ok(Operator::EndsWith),
            "regex" => Ok(Operator::Matches),
            "greater_than" => Ok(Operator::GreaterThan),
            "less_than" => Ok(Operator::LessThan),
            "between" => Ok(Operator::Between),
            "after" => Ok(Operator::After),
            "before" => Ok(Operator::Before),
            _ => Err(Error::UnknownOperator(s.to_owned())),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A text field of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    /// [Field::Payee]
    Payee,
    /// [Field::Memo]
    Memo,
    /// [Field::Account]
    Account,
}

/// Operators for text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextOperator {
    /// [Operator::Contains]
    Contains,
    /// [Operator::Equals]
    Equals,
    /// [Operator::StartsWith]
    StartsWith,
    /// [Operator::EndsWith]
    EndsWith,
    /// [Operator::Matches]
    Matches,
}

/// Operators for the amount field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmountOperator {
    /// [Operator::Equals]
    Equals,
    /// [Operator::GreaterThan]
    GreaterThan,
    /// [Operator::LessThan]
    LessThan,
    /// [Operator::Between]
    Between,
}

/// Operators for the date field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateOperator {
    /// [Operator::Equals]
    Equals,
    /// [Operator::After]
    After,
    /// [Operator::Before]
    Before,
    /// [Operator::Between]
    Between,
}

/// A field together with an operator that is valid for that field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// A comparison on the payee, memo or account.
    Text(TextField, TextOperator),
    /// A comparison on the amount.
    Amount(AmountOperator),
    /// A comparison on the date.
    Date(DateOperator),
}

/// The value of a transaction field, typed by the kind of field it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// The value of a payee, memo or account field.
    Text(&'a str),
    /// The value of the amount field.
    Amount(f64),
    /// The value of the date field, as an ISO-8601 string.
    Date(&'a str),
}

impl Predicate {
    /// Pair `field` with `operator`.
    ///
    /// # Errors
    /// Returns [Error::InvalidOperator] if `operator` cannot be used with `field`.
    pub fn new(field: Field, operator: Operator) -> Result<Self, Error> {
        let invalid = || Error::InvalidOperator {
            field: field.to_string(),
            operator: operator.to_string(),
        };

        let text_field = match field {
            Field::Payee => Some(TextField::Payee),
            Field::Memo => Some(TextField::Memo),
            Field::Account => Some(TextField::Account),
            Field::Amount | Field::Date => None,
        };

        if let Some(text_field) = text_field {
            let operator = match operator {
                Operator::Contains => TextOperator::Contains,
                Operator::Equals => TextOperator::Equals,
                Operator::StartsWith => TextOperator::StartsWith,
                Operator::EndsWith => TextOperator::EndsWith,
                Operator::Matches => TextOperator::Matches,
                _ => return Err(invalid()),
            };
            return Ok(Predicate::Text(text_field, operator));
        }

        match field {
            Field::Amount => match operator {
                Operator::Equals => Ok(Predicate::Amount(AmountOperator::Equals)),
                Operator::GreaterThan => Ok(Predicate::Amount(AmountOperator::GreaterThan)),
                Operator::LessThan => Ok(Predicate::Amount(AmountOperator::LessThan)),
                Operator::Between => Ok(Predicate::Amount(AmountOperator::Between)),
                _ => Err(invalid()),
            },
            _ => match operator {
                Operator::Equals => Ok(Predicate::Date(DateOperator::Equals)),
                Operator::After => Ok(Predicate::Date(DateOperator::After)),
                Operator::Before => Ok(Predicate::Date(DateOperator::Before)),
                Operator::Between => Ok(Predicate::Date(DateOperator::Between)),
                _ => Err(invalid()),
            },
        }
    }

    /// Parse a field and operator given by name, e.g. `("amount", "between")`.
    ///
    /// # Errors
    /// Returns [Error::UnknownField] or [Error::UnknownOperator] for names the
    /// engine does not know, and [Error::InvalidOperator] for a known pair that
    /// does not go together.
    pub fn parse(field: &str, operator: &str) -> Result<Self, Error> {
        Self::new(field.parse()?, operator.parse()?)
    }

    /// The field this predicate looks at.
    pub fn field(&self) -> Field {
        match self {
            Predicate::Text(TextField::Payee, _) => Field::Payee,
            Predicate::Text(TextField::Memo, _) => Field::Memo,
            Predicate::Text(TextField::Account, _) => Field::Account,
            Predicate::Amount(_) => Field::Amount,
            Predicate::Date(_) => Field::Date,
        }
    }

    /// The operator this predicate applies.
    pub fn operator(&self) -> Operator {
        match self {
            Predicate::Text(_, TextOperator::Contains) => Operator::Contains,
            Predicate::Text(_, TextOperator::Equals) => Operator::Equals,
            Predicate::Text(_, TextOperator::StartsWith) => Operator::StartsWith,
            Predicate::Text(_, TextOperator::EndsWith) => Operator::EndsWith,
            Predicate::Text(_, TextOperator::Matches) => Operator::Matches,
            Predicate::Amount(AmountOperator::Equals) => Operator::Equals,
            Predicate::Amount(AmountOperator::GreaterThan) => Operator::GreaterThan,
            Predicate::Amount(AmountOperator::LessThan) => Operator::LessThan,
            Predicate::Amount(AmountOperator::Between) => Operator::Between,
            Predicate::Date(DateOperator::Equals) => Operator::Equals,
            Predicate::Date(DateOperator::After) => Operator::After,
            Predicate::Date(DateOperator::Before) => Operator::Before,
            Predicate::Date(DateOperator::Between) => Operator::Between,
        }
    }

    /// Get the value of the field this predicate looks at from `transaction`.
    pub fn field_value<'a>(&self, transaction: &'a Transaction) -> FieldValue<'a> {
        match self {
            Predicate::Text(TextField::Payee, _) => FieldValue::Text(&transaction.payee),
            Predicate::Text(TextField::Memo, _) => FieldValue::Text(&transaction.memo),
            Predicate::Text(TextField::Account, _) => FieldValue::Text(&transaction.account),
            Predicate::Amount(_) => FieldValue::Amount(transaction.amount),
            Predicate::Date(_) => FieldValue::Date(&transaction.date),
        }
    }

    /// Check `value` against the field of `transaction` this predicate looks at.
    pub fn evaluate(&self, value: &str, transaction: &Transaction) -> bool {
        self.evaluate_field_value(value, self.field_value(transaction))
    }

    /// Check `value` against a field value taken from a transaction.
    ///
    /// Returns `false` if `field_value` is not the kind of value this
    /// predicate's field holds, if the field value is empty, or if `value`
    /// cannot be parsed for the field.
    pub fn evaluate_field_value(&self, value: &str, field_value: FieldValue<'_>) -> bool {
        match (self, field_value) {
            (Predicate::Text(_, operator), FieldValue::Text(text)) => {
                evaluate_text(*operator, value, text)
            }
            (Predicate::Amount(operator), FieldValue::Amount(amount)) => {
                evaluate_amount(*operator, value, amount)
            }
            (Predicate::Date(operator), FieldValue::Date(date)) => {
                evaluate_date(*operator, value, date)
            }
            (predicate, field_value) => {
                tracing::warn!(
                    "field value {field_value:?} does not match the field \"{}\"",
                    predicate.field()
                );
                false
            }
        }
    }

    /// Whether `value` can be parsed the way this predicate reads it.
    ///
    /// Text values are well formed unless they are invalid regular
    /// expressions. Amount values must be numbers, date values must be dates,
    /// and `between` values must hold two of them separated by a comma.
    pub fn accepts_value(&self, value: &str) -> bool {
        match self {
            Predicate::Text(_, TextOperator::Matches) => build_pattern(value).is_some(),
            Predicate::Text(..) => true,
            Predicate::Amount(AmountOperator::Between) => {
                parse_range(value, parse_amount).is_some()
            }
            Predicate::Amount(_) => parse_amount(value).is_some(),
            Predicate::Date(DateOperator::Between) => {
                parse_range(value, parse_timestamp).is_some()
            }
            Predicate::Date(_) => parse_timestamp(value).is_some(),
        }
    }
}

/// Evaluate a condition given by name against one transaction field value.
///
/// Unknown fields and operators, and operators that do not apply to `field`,
/// are logged and evaluate to `false`.
///
/// # Examples
///
/// ```
/// use budget_rules::{FieldValue, evaluate_predicate};
///
/// assert!(evaluate_predicate(
///     "payee",
///     "contains",
///     "Kroger",
///     FieldValue::Text("I bought groceries at KROGER today"),
/// ));
/// assert!(!evaluate_predicate("amount", "between", "10,20", FieldValue::Amount(20.01)));
/// ```
pub fn evaluate_predicate(
    field: &str,
    operator: &str,
    value: &str,
    field_value: FieldValue<'_>,
) -> bool {
    match Predicate::parse(field, operator) {
        Ok(predicate) => predicate.evaluate_field_value(value, field_value),
        Err(error) => {
            tracing::warn!("unrecognized condition \"{field} {operator}\": {error}");
            false
        }
    }
}

fn evaluate_text(operator: TextOperator, value: &str, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let text_lowercase = text.to_lowercase();
    let value_lowercase = value.to_lowercase();

    match operator {
        TextOperator::Contains => text_lowercase.contains(&value_lowercase),
        TextOperator::Equals => text_lowercase == value_lowercase,
        TextOperator::StartsWith => text_lowercase.starts_with(&value_lowercase),
        TextOperator::EndsWith => text_lowercase.ends_with(&value_lowercase),
        TextOperator::Matches => build_pattern(value).is_some_and(|pattern| pattern.is_match(text)),
    }
}

fn build_pattern(value: &str) -> Option<Regex> {
    match RegexBuilder::new(value).case_insensitive(true).build() {
        Ok(pattern) => Some(pattern),
        Err(error) => {
            tracing::debug!("invalid regex pattern \"{value}\": {error}");
            None
        }
    }
}

fn evaluate_amount(operator: AmountOperator, value: &str, amount: f64) -> bool {
    match operator {
        // Exact comparison, there is no tolerance for rounding error.
        AmountOperator::Equals => parse_amount(value).is_some_and(|value| amount == value),
        AmountOperator::GreaterThan => parse_amount(value).is_some_and(|value| amount > value),
        AmountOperator::LessThan => parse_amount(value).is_some_and(|value| amount < value),
        AmountOperator::Between => parse_range(value, parse_amount)
            .is_some_and(|(min, max)| amount >= min && amount <= max),
    }
}

fn evaluate_date(operator: DateOperator, value: &str, date: &str) -> bool {
    if date.trim().is_empty() {
        return false;
    }

    let Some(timestamp) = parse_timestamp(date) else {
        tracing::debug!("could not parse transaction date \"{date}\"");
        return false;
    };

    match operator {
        DateOperator::Equals => parse_timestamp(value)
            .is_some_and(|value| calendar_date(timestamp) == calendar_date(value)),
        DateOperator::After => parse_timestamp(value).is_some_and(|value| timestamp > value),
        DateOperator::Before => parse_timestamp(value).is_some_and(|value| timestamp < value),
        DateOperator::Between => parse_range(value, parse_timestamp)
            .is_some_and(|(start, end)| timestamp >= start && timestamp <= end),
    }
}

fn parse_amount(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

/// Parse a date or date-time.
///
/// Accepts RFC 3339 date-times, date-times without an offset and plain dates.
/// Values without an offset are taken to be in UTC, and plain dates are taken
/// to be midnight.
fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();

    if let Ok(timestamp) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(timestamp);
    }

    if let Ok(timestamp) = PrimitiveDateTime::parse(text, DATE_TIME_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(text, DATE_TIME_SUBSECOND_FORMAT))
    {
        return Some(timestamp.assume_utc());
    }

    Date::parse(text, DATE_FORMAT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// The calendar day of `timestamp` in the offset it was written with.
fn calendar_date(timestamp: OffsetDateTime) -> Date {
    timestamp.date()
}

/// Parse a `"start,end"` pair, trimming whitespace around each half.
///
/// Anything after a second comma is ignored, so `"10,20,"` reads as `10` to `20`.
fn parse_range<T>(text: &str, parse: fn(&str) -> Option<T>) -> Option<(T, T)> {
    let mut parts = text.split(',');
    let start = parts.next()?;
    let end = parts.next()?;

    Some((parse(start)?, parse(end)?))
}
