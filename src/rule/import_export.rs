//! Converts rule sets to and from the portable JSON export format.
//!
//! An export looks like:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "exportDate": "2025-01-15T09:30:00Z",
//!   "rules": [
//!     {
//!       "name": "Groceries",
//!       "criteria": [{"id": "c1", "field": "payee", "operator": "contains", "value": "Kroger"}],
//!       "actions": [{"id": "a1", "type": "category", "value": "Groceries"}],
//!       "relationOperator": "AND",
//!       "status": "active"
//!     }
//!   ]
//! }
//! ```
//!
//! Exports are templates rather than backups, so rule IDs and timestamps are
//! left out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    Error,
    rule::models::{Action, Criterion, RelationOperator, Rule, RuleStatus},
};

/// The export format version written by [export_rules].
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleExport<'a> {
    version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    export_date: OffsetDateTime,
    rules: Vec<ExportedRule<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedRule<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    criteria: &'a [Criterion],
    actions: &'a [Action],
    relation_operator: RelationOperator,
    status: RuleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<i64>,
}

impl<'a> From<&'a Rule> for ExportedRule<'a> {
    fn from(rule: &'a Rule) -> Self {
        Self {
            name: &rule.name,
            description: rule.description.as_deref(),
            criteria: &rule.criteria,
            actions: &rule.actions,
            relation_operator: rule.relation_operator,
            status: rule.status,
            priority: rule.priority,
        }
    }
}

#[derive(Deserialize)]
struct RuleImport {
    rules: Vec<Rule>,
}

/// Write `rules` as a pretty-printed JSON export.
///
/// # Errors
/// Returns [Error::JSONSerializationError] if the export could not be
/// serialized.
pub fn export_rules(rules: &[Rule]) -> Result<String, Error> {
    let export = RuleExport {
        version: EXPORT_VERSION,
        export_date: OffsetDateTime::now_utc(),
        rules: rules.iter().map(ExportedRule::from).collect(),
    };

    serde_json::to_string_pretty(&export)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))
}

/// Check the shape of a parsed export.
///
/// The export must have a `version` and a `rules` array. Each rule must have
/// a `name` and `criteria` and `actions` arrays. Each criterion needs a
/// `field` (or `type`) and an `operator`, and each action needs a `type`. Both
/// need a string `value`, which may be empty.
pub fn validate_rule_export(raw: &Value) -> bool {
    check_export_shape(raw).is_ok()
}

fn check_export_shape(raw: &Value) -> Result<(), String> {
    let is_present = |value: Option<&Value>| match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    };
    let is_non_empty_string =
        |value: Option<&Value>| value.and_then(Value::as_str).is_some_and(|text| !text.is_empty());

    if !is_present(raw.get("version")) {
        return Err("missing version".to_owned());
    }

    let rules = raw
        .get("rules")
        .and_then(Value::as_array)
        .ok_or("missing rules array")?;

    for (index, rule) in rules.iter().enumerate() {
        let position = index + 1;

        if !is_non_empty_string(rule.get("name")) {
            return Err(format!("rule #{position} has no name"));
        }

        let criteria = rule
            .get("criteria")
            .and_then(Value::as_array)
            .ok_or_else(|| format!("rule #{position} has no criteria array"))?;

        for criterion in criteria {
            let field = criterion.get("field").or_else(|| criterion.get("type"));

            if !is_non_empty_string(field)
                || !is_non_empty_string(criterion.get("operator"))
                || !criterion.get("value").is_some_and(Value::is_string)
            {
                return Err(format!("rule #{position} has an incomplete criterion"));
            }
        }

        let actions = rule
            .get("actions")
            .and_then(Value::as_array)
            .ok_or_else(|| format!("rule #{position} has no actions array"))?;

        for action in actions {
            if !is_non_empty_string(action.get("type"))
                || !action.get("value").is_some_and(Value::is_string)
            {
                return Err(format!("rule #{position} has an incomplete action"));
            }
        }
    }

    Ok(())
}

/// Read the rules out of an export.
///
/// Imported rules have no ID or timestamps and are always inactive, so that
/// they do not change any transactions until they have been reviewed and
/// switched on.
///
/// # Errors
/// Returns [Error::InvalidExport] if `text` is not JSON, fails
/// [validate_rule_export], or holds a criterion whose operator does not
/// belong to its field.
pub fn import_rules(text: &str) -> Result<Vec<Rule>, Error> {
    let raw: Value =
        serde_json::from_str(text).map_err(|error| Error::InvalidExport(error.to_string()))?;

    check_export_shape(&raw).map_err(Error::InvalidExport)?;

    let import: RuleImport =
        serde_json::from_value(raw).map_err(|error| Error::InvalidExport(error.to_string()))?;

    Ok(import
        .rules
        .into_iter()
        .map(|rule| Rule {
            id: String::new(),
            status: RuleStatus::Inactive,
            created_at: None,
            last_modified: None,
            ..rule
        })
        .collect())
}

/// Read the rules out of an export, see [import_rules].
///
/// Returns `None` and logs the reason if the export is not valid.
pub fn parse_rule_export(text: &str) -> Option<Vec<Rule>> {
    match import_rules(text) {
        Ok(rules) => Some(rules),
        Err(error) => {
            tracing::error!("Could not import rules: {error}");
            None
        }
    }
}

#[cfg(test)]
mod import_export_tests {
    use serde_json::{Value, json};
    use time::macros::datetime;

    use crate::{
        Error,
        rule::{
            models::{Action, Criterion, RelationOperator, Rule, RuleStatus},
            predicate::{Field, Operator},
        },
        test_utils::payee_contains,
    };

    use super::{
        EXPORT_VERSION, export_rules, import_rules, parse_rule_export, validate_rule_export,
    };

    fn valid_export() -> Value {
        json!({
            "version": "1.0",
            "exportDate": "2025-01-15T09:30:00Z",
            "rules": [{
                "name": "Groceries",
                "criteria": [
                    {"id": "c1", "type": "payee", "operator": "contains", "value": "Kroger"}
                ],
                "actions": [{"id": "a1", "type": "category", "value": "Groceries"}]
            }]
        })
    }

    #[test]
    fn export_strips_ids_and_timestamps() {
        let rule = Rule::build("Groceries")
            .id("rule-1")
            .created_at(datetime!(2025-01-01 0:00 UTC))
            .last_modified(datetime!(2025-01-02 0:00 UTC))
            .priority(3)
            .criterion(payee_contains("kroger"))
            .action(Action::category("Groceries"))
            .finalise();

        let text = export_rules(&[rule]).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["version"], json!(EXPORT_VERSION));
        assert!(value["exportDate"].is_string());
        let exported = &value["rules"][0];
        assert_eq!(exported["name"], json!("Groceries"));
        assert_eq!(exported["priority"], json!(3));
        assert_eq!(exported["status"], json!("active"));
        assert!(exported.get("id").is_none());
        assert!(exported.get("lastModified").is_none());
        assert!(exported.get("createdAt").is_none());
    }

    #[test]
    fn valid_export_passes_validation() {
        assert!(validate_rule_export(&valid_export()));
    }

    #[test]
    fn empty_criterion_value_is_allowed() {
        let mut export = valid_export();
        export["rules"][0]["criteria"][0]["value"] = json!("");

        assert!(validate_rule_export(&export));
    }

    #[test]
    fn rejects_missing_top_level_fields() {
        let mut missing_version = valid_export();
        missing_version.as_object_mut().unwrap().remove("version");
        let mut rules_not_array = valid_export();
        rules_not_array["rules"] = json!({"name": "Groceries"});

        assert!(!validate_rule_export(&missing_version));
        assert!(!validate_rule_export(&rules_not_array));
        assert!(!validate_rule_export(&json!(null)));
        assert!(!validate_rule_export(&json!([])));
    }

    #[test]
    fn rejects_incomplete_rules() {
        for field in ["name", "criteria", "actions"] {
            let mut export = valid_export();
            export["rules"][0].as_object_mut().unwrap().remove(field);

            assert!(!validate_rule_export(&export), "missing {field} should fail");
        }
    }

    #[test]
    fn rejects_incomplete_criteria_and_actions() {
        let mut no_operator = valid_export();
        no_operator["rules"][0]["criteria"][0]
            .as_object_mut()
            .unwrap()
            .remove("operator");
        let mut no_criterion_value = valid_export();
        no_criterion_value["rules"][0]["criteria"][0]
            .as_object_mut()
            .unwrap()
            .remove("value");
        let mut no_action_type = valid_export();
        no_action_type["rules"][0]["actions"][0]["type"] = json!("");
        let mut no_action_value = valid_export();
        no_action_value["rules"][0]["actions"][0]
            .as_object_mut()
            .unwrap()
            .remove("value");

        assert!(!validate_rule_export(&no_operator));
        assert!(!validate_rule_export(&no_criterion_value));
        assert!(!validate_rule_export(&no_action_type));
        assert!(!validate_rule_export(&no_action_value));
    }

    #[test]
    fn import_defaults_to_inactive() {
        let rules = parse_rule_export(&valid_export().to_string()).unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].status, RuleStatus::Inactive);
        assert_eq!(rules[0].relation_operator, RelationOperator::And);
        assert_eq!(rules[0].criteria[0].field(), Field::Payee);
    }

    #[test]
    fn import_forces_active_rules_inactive() {
        let mut export = valid_export();
        export["rules"][0]["status"] = json!("active");
        export["rules"][0]["id"] = json!("should-go");

        let rules = parse_rule_export(&export.to_string()).unwrap();

        assert_eq!(rules[0].status, RuleStatus::Inactive);
        assert_eq!(rules[0].id, "");
    }

    #[test]
    fn malformed_json_returns_none() {
        assert_eq!(parse_rule_export("{\"version\": \"1.0\", \"rules\": ["), None);
        assert_eq!(parse_rule_export(""), None);
    }

    #[test]
    fn invalid_operator_for_field_returns_none() {
        let mut export = valid_export();
        export["rules"][0]["criteria"][0]["operator"] = json!("greater_than");

        assert_eq!(parse_rule_export(&export.to_string()), None);
        assert!(matches!(
            import_rules(&export.to_string()),
            Err(Error::InvalidExport(_))
        ));
    }

    #[test]
    fn round_trip_keeps_rule_content() {
        let rules = vec![
            Rule::build("Groceries")
                .id("1")
                .description("Supermarkets")
                .criterion(payee_contains("kroger").with_id("c1"))
                .criterion(payee_contains("walmart").with_id("c2"))
                .relation_operator(RelationOperator::Or)
                .action(Action::category("Groceries"))
                .finalise(),
            Rule::build("Large purchases")
                .id("2")
                .status(RuleStatus::Pending)
                .criterion(Criterion::new(Field::Amount, Operator::Between, "500,10000").unwrap())
                .criterion(Criterion::new(Field::Date, Operator::After, "2025-01-01").unwrap())
                .action(Action::flag("review"))
                .action(Action::memo("check receipt"))
                .finalise(),
        ];

        let imported = parse_rule_export(&export_rules(&rules).unwrap()).unwrap();

        assert_eq!(imported.len(), rules.len());
        for (original, imported) in rules.iter().zip(&imported) {
            assert_eq!(imported.name, original.name);
            assert_eq!(imported.description, original.description);
            assert_eq!(imported.criteria, original.criteria);
            assert_eq!(imported.actions, original.actions);
            assert_eq!(imported.relation_operator, original.relation_operator);
            assert_eq!(imported.status, RuleStatus::Inactive);
        }
    }
}
