use nestql::ast::{Direction, Operator};
use std::fmt;
use thiserror::Error;

use crate::coerce::CoercionError;
use crate::overrides::OverrideError;

/// Which kind of clause an error was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Filter,
    Sort,
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseKind::Filter => f.write_str("filter"),
            ClauseKind::Sort => f.write_str("sort"),
        }
    }
}

/// Every variant is a client-input error: the request is rejected, nothing is retried.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Invalid nested {kind}: {path}: {reason}")]
    InvalidPath { kind: ClauseKind, path: String, reason: String },

    #[error("Bad filter value {value} for {path}: {source}")]
    InvalidValue {
        path: String,
        value: String,
        #[source]
        source: CoercionError,
    },

    #[error("Invalid nested filter: {path}: operator {op} is not defined for {target}")]
    UnsupportedOperator { path: String, op: Operator, target: String },

    #[error("Invalid nested sort: {path}: {target} cannot be ordered {direction}")]
    UnsupportedSort { path: String, direction: Direction, target: String },

    #[error("Invalid nested {kind}: {path}: {source}")]
    Override {
        kind: ClauseKind,
        path: String,
        #[source]
        source: OverrideError,
    },
}

impl CompileError {
    pub(crate) fn invalid_path(kind: ClauseKind, path: impl fmt::Display, reason: impl Into<String>) -> Self {
        CompileError::InvalidPath { kind, path: path.to_string(), reason: reason.into() }
    }

    pub fn is_client_error(&self) -> bool { true }

    /// The HTTP status a host should answer with.
    pub fn status_code(&self) -> u16 { 400 }

    pub fn path(&self) -> &str {
        match self {
            CompileError::InvalidPath { path, .. }
            | CompileError::InvalidValue { path, .. }
            | CompileError::UnsupportedOperator { path, .. }
            | CompileError::UnsupportedSort { path, .. }
            | CompileError::Override { path, .. } => path,
        }
    }
}
