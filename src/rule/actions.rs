//! Applies rule actions to transactions.

use crate::{
    Error,
    config::EngineConfig,
    rule::models::{Action, ActionKind},
    transaction::Transaction,
};

/// Apply `actions` in order to a copy of `transaction`.
///
/// - `category` and `flag` actions overwrite the current value, so the last
///   one applied wins.
/// - `memo` actions append their value to the memo, separated by a space, or
///   set the memo if it is empty. Applying the same memo action twice appends
///   the text twice.
/// - Unrecognized actions are skipped with a warning.
pub fn apply_actions(actions: &[Action], transaction: &Transaction) -> Transaction {
    let mut transaction = transaction.clone();

    for action in actions {
        apply_action(action, &mut transaction);
    }

    transaction
}

/// Apply `actions` like [apply_actions], after checking them against `config`.
///
/// # Errors
/// Returns [Error::UnknownCategory] or [Error::UnknownFlag] if an action sets
/// a value that `config` does not allow. No action is applied in that case.
pub fn try_apply_actions(
    actions: &[Action],
    transaction: &Transaction,
    config: &EngineConfig,
) -> Result<Transaction, Error> {
    for action in actions {
        check_action(action, config)?;
    }

    Ok(apply_actions(actions, transaction))
}

fn check_action(action: &Action, config: &EngineConfig) -> Result<(), Error> {
    match &action.kind {
        ActionKind::Category if !config.allows_category(&action.value) => {
            Err(Error::UnknownCategory(action.value.clone()))
        }
        ActionKind::Flag if !config.allows_flag(&action.value) => {
            Err(Error::UnknownFlag(action.value.clone()))
        }
        _ => Ok(()),
    }
}

fn apply_action(action: &Action, transaction: &mut Transaction) {
    match &action.kind {
        ActionKind::Category => transaction.category = Some(action.value.clone()),
        ActionKind::Flag => transaction.flag = Some(action.value.clone()),
        ActionKind::Memo => {
            if transaction.memo.is_empty() {
                transaction.memo = action.value.clone();
            } else {
                transaction.memo.push(' ');
                transaction.memo.push_str(&action.value);
            }
        }
        ActionKind::Unrecognized(kind) => {
            tracing::warn!("skipping unknown action type \"{kind}\"");
        }
    }
}

#[cfg(test)]
mod actions_tests {
    use crate::{
        Error,
        config::EngineConfig,
        rule::models::{Action, ActionKind},
        test_utils::transaction,
    };

    use super::{apply_actions, try_apply_actions};

    #[test]
    fn sets_category_and_flag() {
        let input = transaction("Kroger", 12.0);

        let output = apply_actions(&[Action::category("Groceries"), Action::flag("blue")], &input);

        assert_eq!(output.category.as_deref(), Some("Groceries"));
        assert_eq!(output.flag.as_deref(), Some("blue"));
    }

    #[test]
    fn does_not_change_input() {
        let input = transaction("Kroger", 12.0);

        let _ = apply_actions(&[Action::category("Groceries"), Action::memo("note")], &input);

        assert_eq!(input, transaction("Kroger", 12.0));
    }

    #[test]
    fn last_category_wins() {
        let output = apply_actions(
            &[Action::category("First"), Action::category("Second")],
            &transaction("Kroger", 12.0),
        );

        assert_eq!(output.category.as_deref(), Some("Second"));
    }

    #[test]
    fn memo_appends_with_space() {
        let mut input = transaction("Kroger", 12.0);
        input.memo = "x".to_owned();

        let once = apply_actions(&[Action::memo("reviewed")], &input);
        let twice = apply_actions(&[Action::memo("reviewed")], &once);

        assert_eq!(once.memo, "x reviewed");
        assert_eq!(twice.memo, "x reviewed reviewed");
    }

    #[test]
    fn memo_is_set_when_empty() {
        let output = apply_actions(&[Action::memo("reviewed")], &transaction("Kroger", 12.0));

        assert_eq!(output.memo, "reviewed");
    }

    #[test]
    fn unknown_action_is_skipped() {
        let output = apply_actions(
            &[
                Action::new(ActionKind::Unrecognized("tag".to_owned()), "x"),
                Action::category("Groceries"),
            ],
            &transaction("Kroger", 12.0),
        );

        assert_eq!(output.category.as_deref(), Some("Groceries"));
    }

    #[test]
    fn config_rejects_unknown_category() {
        let config = EngineConfig::new(["Groceries"], ["blue"]);
        let input = transaction("Kroger", 12.0);

        let result = try_apply_actions(
            &[Action::flag("blue"), Action::category("Takeaways")],
            &input,
            &config,
        );

        assert_eq!(result, Err(Error::UnknownCategory("Takeaways".to_owned())));
    }

    #[test]
    fn config_rejects_unknown_flag() {
        let config = EngineConfig::new(["Groceries"], ["blue"]);

        let result = try_apply_actions(
            &[Action::flag("red")],
            &transaction("Kroger", 12.0),
            &config,
        );

        assert_eq!(result, Err(Error::UnknownFlag("red".to_owned())));
    }

    #[test]
    fn config_allows_listed_values() {
        let config = EngineConfig::new(["Groceries"], ["blue"]);

        let result = try_apply_actions(
            &[Action::flag("blue"), Action::category("Groceries")],
            &transaction("Kroger", 12.0),
            &config,
        )
        .unwrap();

        assert_eq!(result.category.as_deref(), Some("Groceries"));
        assert_eq!(result.flag.as_deref(), Some("blue"));
    }
}
