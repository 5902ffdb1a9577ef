//! Backend expression IR.
//!
//! Resolvers build these trees without knowing which SQL dialect will execute them; each storage
//! crate renders them with its own extraction and cast syntax.

use serde::{Deserialize, Serialize};

use crate::{ast::Direction, value::Value};

/// A physical column, optionally qualified by its table or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self { Self { table: None, name: name.into() } }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self { Self { table: Some(table.into()), name: name.into() } }
}

/// Backend types a text-extracted document value can be cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastType {
    Decimal,
    String,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Column(ColumnRef),
    /// The value stored under `key` in a document column, extracted as text (Postgres `->>`)
    JsonText { column: ColumnRef, key: String },
    /// The value stored under `key` in a document column, kept as a document (Postgres `->`)
    JsonValue { column: ColumnRef, key: String },
    Cast { expr: Box<Expr>, to: CastType },
    Literal(Value),
}

impl Expr {
    pub fn json_text(column: ColumnRef, key: impl Into<String>) -> Self { Expr::JsonText { column, key: key.into() } }

    pub fn json_value(column: ColumnRef, key: impl Into<String>) -> Self { Expr::JsonValue { column, key: key.into() } }

    pub fn cast(self, to: CastType) -> Self { Expr::Cast { expr: Box::new(self), to } }

    /// Re-targets a text extraction to a document extraction of the same key.
    pub fn as_json_value(&self) -> Option<Expr> {
        match self {
            Expr::JsonText { column, key } | Expr::JsonValue { column, key } => Some(Expr::json_value(column.clone(), key.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    Like,
    ILike,
    NotLike,
    NotILike,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Compare { left: Expr, op: CompareOp, right: Expr },
    InList { expr: Expr, list: Vec<Value>, negated: bool },
    Between { expr: Expr, low: Value, high: Value },
    IsNull { expr: Expr, negated: bool },
    /// `element` is a member of the document list (or object) produced by `container`
    Contains { container: Expr, element: Value },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    True,
    False,
}

impl Predicate {
    pub fn compare(left: Expr, op: CompareOp, right: Value) -> Self { Predicate::Compare { left, op, right: Expr::Literal(right) } }

    pub fn is_null(expr: Expr) -> Self { Predicate::IsNull { expr, negated: false } }

    pub fn is_not_null(expr: Expr) -> Self { Predicate::IsNull { expr, negated: true } }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut items) => {
                items.push(other);
                Predicate::Or(items)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut items) => {
                items.push(other);
                Predicate::And(items)
            }
            first => Predicate::And(vec![first, other]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(expr: Expr, direction: Direction) -> Self { Self { expr, direction } }
}

/// An additional join a resolution needs. Embedded-document resolutions never need one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub alias: Option<String>,
    pub on: Predicate,
}
