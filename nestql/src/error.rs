use crate::grammar;
use thiserror::Error;

/// Errors raised while turning client input into clauses
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    SyntaxError(String),
    #[error("Expected {expected}, got {got:?}")]
    UnexpectedRule { expected: &'static str, got: grammar::Rule },
    #[error("Invalid filter JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Filter object is missing the \"{0}\" key")]
    MissingKey(&'static str),
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),
    #[error("Unknown sort direction: {0}")]
    UnknownDirection(String),
    #[error("Field-to-field comparisons are not supported: {0}")]
    FieldComparison(String),
}

impl From<pest::error::Error<grammar::Rule>> for ParseError {
    fn from(err: pest::error::Error<grammar::Rule>) -> Self { ParseError::SyntaxError(err.to_string()) }
}
