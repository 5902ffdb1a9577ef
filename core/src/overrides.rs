//! Per-field-kind override builders.
//!
//! A field kind may take over compilation of individual operators or sort directions by
//! registering a [`FieldKindOps`] implementation. Lookup is keyed by `(kind, operator)` and
//! `(kind, direction)`, so a registered builder always wins over the default compilation.

use nestql::ast::{Direction, Operator};
use nestql::expr::{Expr, OrderBy, Predicate};
use nestql::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::schema::{Field, FieldKind};

/// Whatever an override builder fails with. Reported to the client as an invalid clause.
pub type OverrideError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Capability interface implemented per field kind.
///
/// `column` is always the raw text extraction of the document key (`col ->> key`); a builder
/// that needs the document value itself can use [`Expr::as_json_value`].
pub trait FieldKindOps: Send + Sync {
    fn supports_filter_operator(&self, _op: Operator) -> bool { false }

    fn build_filter_predicate(&self, _field: &Field, _column: Expr, _value: &Value, op: Operator) -> Result<Predicate, OverrideError> {
        Err(format!("operator {} is not overridden", op).into())
    }

    fn supports_sort_direction(&self, _direction: Direction) -> bool { false }

    fn build_sort_expression(&self, _field: &Field, _column: Expr, direction: Direction) -> Result<OrderBy, OverrideError> {
        Err(format!("direction {} is not overridden", direction).into())
    }
}

#[derive(Default, Clone)]
pub struct OverrideRegistry {
    filters: HashMap<(FieldKind, Operator), Arc<dyn FieldKindOps>>,
    sorts: HashMap<(FieldKind, Direction), Arc<dyn FieldKindOps>>,
}

impl fmt::Debug for OverrideRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<_> = self.filters.keys().map(|(kind, op)| format!("{}:{}", kind, op)).collect();
        let mut sorts: Vec<_> = self.sorts.keys().map(|(kind, direction)| format!("{}:{}", kind, direction)).collect();
        filters.sort();
        sorts.sort();
        f.debug_struct("OverrideRegistry").field("filters", &filters).field("sorts", &sorts).finish()
    }
}

impl OverrideRegistry {
    pub fn new() -> Self { Self::default() }

    /// Register `ops` for every operator and direction it reports support for. Later
    /// registrations replace earlier ones for the same key.
    pub fn register(&mut self, kind: FieldKind, ops: impl FieldKindOps + 'static) {
        let ops: Arc<dyn FieldKindOps> = Arc::new(ops);
        for op in Operator::ALL {
            if ops.supports_filter_operator(op) {
                self.filters.insert((kind.clone(), op), ops.clone());
            }
        }
        for direction in [Direction::Asc, Direction::Desc] {
            if ops.supports_sort_direction(direction) {
                self.sorts.insert((kind.clone(), direction), ops.clone());
            }
        }
        tracing::debug!(%kind, "registered field kind override");
    }

    pub fn with(mut self, kind: FieldKind, ops: impl FieldKindOps + 'static) -> Self {
        self.register(kind, ops);
        self
    }

    pub fn filter(&self, kind: &FieldKind, op: Operator) -> Option<&dyn FieldKindOps> {
        self.filters.get(&(kind.clone(), op)).map(|ops| ops.as_ref())
    }

    pub fn sort(&self, kind: &FieldKind, direction: Direction) -> Option<&dyn FieldKindOps> {
        self.sorts.get(&(kind.clone(), direction)).map(|ops| ops.as_ref())
    }

    pub fn is_empty(&self) -> bool { self.filters.is_empty() && self.sorts.is_empty() }
}

/// Opt-in containment semantics for mapping kinds: `eq` matches documents whose value at the
/// key contains the given object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContainment;

impl FieldKindOps for JsonContainment {
    fn supports_filter_operator(&self, op: Operator) -> bool { op == Operator::Eq }

    fn build_filter_predicate(&self, field: &Field, column: Expr, value: &Value, _op: Operator) -> Result<Predicate, OverrideError> {
        let container = column.as_json_value().ok_or_else(|| format!("{} is not a document extraction", field.name))?;
        match value {
            Value::Object(_) => Ok(Predicate::Contains { container, element: value.clone() }),
            other => Err(format!("expected an object, got {}", other.type_name()).into()),
        }
    }
}
