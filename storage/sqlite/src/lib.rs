//! SQLite rendering of [`nestql::expr`] trees.
//!
//! Document keys are read with `json_extract()`, list membership goes through `json_each()`,
//! and every value is bound as a positional `?` parameter.

mod sql_builder;

pub use sql_builder::{cast_type_name, SqlBuilder, SqlGenerationError};
