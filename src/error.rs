//! Defines the crate level error type.

/// The errors that may occur while building rules or running the rule engine.
///
/// Evaluating a criterion never produces an error: values that cannot be
/// parsed make the criterion evaluate to `false` instead.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The criterion field is not one of payee, memo, amount, date or account.
    #[error("unknown criterion field \"{0}\"")]
    UnknownField(String),

    /// The operator is not one the rule engine knows about.
    #[error("unknown operator \"{0}\"")]
    UnknownOperator(String),

    /// The operator exists but cannot be used with the field, e.g. `between`
    /// on `payee`.
    #[error("the operator \"{operator}\" cannot be used with the field \"{field}\"")]
    InvalidOperator {
        /// The criterion field.
        field: String,
        /// The rejected operator.
        operator: String,
    },

    /// An action was given an empty type.
    #[error("action type cannot be empty")]
    EmptyActionType,

    /// A category action named a category that is not in the engine config.
    #[error("the category \"{0}\" is not one of the available categories")]
    UnknownCategory(String),

    /// A flag action named a flag that is not in the engine config.
    #[error("the flag \"{0}\" is not one of the available flags")]
    UnknownFlag(String),

    /// Processing was requested without any rules.
    #[error("no rules were supplied")]
    NoRules,

    /// Batch processing was requested without any transactions.
    #[error("no transactions were supplied")]
    NoTransactions,

    /// A rule export could not be parsed or failed validation.
    #[error("invalid rule export: {0}")]
    InvalidExport(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// The CSV had issues that prevented it from being read or written.
    #[error("could not process the CSV file: {0}")]
    InvalidCSV(String),

    /// The engine config could not be parsed.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    /// A file could not be read or written.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::InvalidCSV(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value.to_string())
    }
}
