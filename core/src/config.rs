use nestql::ast::DEFAULT_SEPARATOR;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("path separator must not be empty")]
    EmptySeparator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Token splitting a client field string into path segments.
    pub separator: String,
    /// Integer filters against a falsy value also match documents where the key is absent.
    pub zero_matches_missing: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self { Self { separator: DEFAULT_SEPARATOR.to_owned(), zero_matches_missing: true } }
}

impl CompilerConfig {
    pub fn new() -> Self { Self::default() }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CompilerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        Ok(())
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_zero_matches_missing(mut self, enabled: bool) -> Self {
        self.zero_matches_missing = enabled;
        self
    }
}
