//! PostgreSQL rendering of [`nestql::expr`] trees.
//!
//! Document keys are extracted with `->>` (text) and `->` (jsonb), list membership uses `?` for
//! text elements and `@>` otherwise, and every value travels as a `$n` argument.

mod sql_builder;

pub use sql_builder::{cast_type_name, SqlBuilder, SqlExpr, SqlGenerationError};
pub use tokio_postgres::types::ToSql;
