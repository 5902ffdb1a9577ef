//! nestql: the clause language consumed by nested filter/sort resolution.
//!
//! - [`ast`]: client-side clauses (paths, filter trees, sort clauses, operators)
//! - [`expr`]: the backend expression IR that resolvers produce and SQL renderers consume
//! - [`value`]: typed filter values
//! - [`parser`]: JSON filter parsing and the `sort` query-string grammar

pub mod ast;
pub mod error;
pub mod expr;
pub mod grammar;
pub mod parser;
pub mod value;

pub use error::ParseError;
pub use value::Value;
