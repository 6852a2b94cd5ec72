//! Configuration for the rule engine.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The categories and flags that rule actions are allowed to assign.
///
/// An empty list accepts any value, so [EngineConfig::default] places no
/// restrictions on actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Category names that `category` actions may assign.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Flag names that `flag` actions may assign.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl EngineConfig {
    /// Create a config that only accepts the given categories and flags.
    pub fn new<C, F>(categories: C, flags: F) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a config from JSON text, e.g. `{"categories": ["Groceries"], "flags": ["red"]}`.
    ///
    /// # Errors
    /// Returns [Error::InvalidConfig] if `text` is not a valid config.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|error| Error::InvalidConfig(error.to_string()))
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    /// Returns [Error::Io] if the file cannot be read, or [Error::InvalidConfig]
    /// if its contents are not a valid config.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Whether a `category` action may assign `category`.
    pub fn allows_category(&self, category: &str) -> bool {
        self.categories.is_empty() || self.categories.iter().any(|known| known == category)
    }

    /// Whether a `flag` action may assign `flag`.
    pub fn allows_flag(&self, flag: &str) -> bool {
        self.flags.is_empty() || self.flags.iter().any(|known| known == flag)
    }
}
