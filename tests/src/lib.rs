//! A miniature host for end-to-end tests.
//!
//! It does what a JSON:API data layer does around the resolver: walks relationship segments,
//! joins the target tables (`<table>.<field>_id = <target>.id`), strips the walked segment from
//! the clause and offers the clause to the [`NestedResolver`] at every step. Plain columns get a
//! baseline comparison.

use nestfilter_core::{CompileError, FilterContext, NestedResolver, Schema, SchemaCatalog, SortContext};
use nestql::ast::{FilterClause, FilterNode, Operator, SortClause};
use nestql::expr::{ColumnRef, CompareOp, Expr, Join, OrderBy, Predicate};
use nestql::{ParseError, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("unknown schema: {0}")]
    UnknownSchema(String),
    #[error("operator {0} is not supported on plain columns")]
    UnsupportedOperator(Operator),
    #[error(transparent)]
    Postgres(#[from] nestfilter_postgres::SqlGenerationError),
    #[error(transparent)]
    Sqlite(#[from] nestfilter_sqlite::SqlGenerationError),
}

/// A resolved request, ready to render for either backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub joins: Vec<Join>,
    pub predicate: Predicate,
    pub order: Vec<OrderBy>,
}

impl Query {
    pub fn to_postgres(&self, fields: Vec<&str>) -> Result<(String, Vec<Box<dyn nestfilter_postgres::ToSql + Send + Sync>>), HostError> {
        let mut sql = nestfilter_postgres::SqlBuilder::with_fields(fields);
        sql.table_name(self.table.as_str());
        for join in &self.joins {
            sql.join(join)?;
        }
        sql.predicate(&self.predicate)?;
        sql.order_by(&self.order)?;
        Ok(sql.build()?)
    }

    pub fn to_sqlite(&self, fields: Vec<&str>) -> Result<(String, Vec<rusqlite::types::Value>), HostError> {
        let mut sql = nestfilter_sqlite::SqlBuilder::with_fields(fields);
        sql.table_name(self.table.as_str());
        for join in &self.joins {
            sql.join(join)?;
        }
        sql.predicate(&self.predicate)?;
        sql.order_by(&self.order)?;
        Ok(sql.build())
    }
}

pub struct Host<'a> {
    catalog: &'a dyn SchemaCatalog,
    resolver: &'a dyn NestedResolver,
    separator: String,
    tables: HashMap<String, String>,
}

impl<'a> Host<'a> {
    pub fn new(catalog: &'a dyn SchemaCatalog, resolver: &'a dyn NestedResolver) -> Self {
        Self { catalog, resolver, separator: nestql::ast::DEFAULT_SEPARATOR.to_owned(), tables: HashMap::new() }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Tables default to the schema name with an `s` appended.
    pub fn with_table(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.tables.insert(schema.into(), table.into());
        self
    }

    fn table(&self, schema: &Schema) -> String { self.tables.get(schema.name()).cloned().unwrap_or_else(|| format!("{}s", schema.name())) }

    fn schema(&self, name: &str) -> Result<&'a Schema, HostError> { self.catalog.schema(name).ok_or_else(|| HostError::UnknownSchema(name.to_owned())) }

    /// Resolve the JSON:API `filter` and `sort` parameters against `root`.
    pub fn request(&self, root: &str, filter: Option<&str>, sort: Option<&str>) -> Result<Query, HostError> {
        let filters = match filter {
            Some(raw) => nestql::parser::parse_filter_str(raw)?,
            None => Vec::new(),
        };
        let sorts = match sort {
            Some(raw) => nestql::parser::parse_sort(raw)?,
            None => Vec::new(),
        };
        self.query(root, &filters, &sorts)
    }

    pub fn query(&self, root: &str, filters: &[FilterNode], sorts: &[SortClause]) -> Result<Query, HostError> {
        let schema = self.schema(root)?;
        let mut joins = Vec::new();

        let mut predicates = filters.iter().map(|node| self.filter_node(schema, node, &mut joins)).collect::<Result<Vec<_>, _>>()?;
        let predicate = match predicates.len() {
            0 => Predicate::True,
            1 => predicates.remove(0),
            _ => Predicate::And(predicates),
        };
        let order = sorts.iter().map(|clause| self.sort_clause(schema, clause, &mut joins)).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(root, joins = joins.len(), "resolved request");
        Ok(Query { table: self.table(schema), joins, predicate, order })
    }

    fn filter_node(&self, schema: &'a Schema, node: &FilterNode, joins: &mut Vec<Join>) -> Result<Predicate, HostError> {
        Ok(match node {
            FilterNode::Leaf(clause) => self.filter_leaf(schema, clause, joins)?,
            FilterNode::And(items) => Predicate::And(items.iter().map(|item| self.filter_node(schema, item, joins)).collect::<Result<_, _>>()?),
            FilterNode::Or(items) => Predicate::Or(items.iter().map(|item| self.filter_node(schema, item, joins)).collect::<Result<_, _>>()?),
            FilterNode::Not(inner) => Predicate::Not(Box::new(self.filter_node(schema, inner, joins)?)),
        })
    }

    fn filter_leaf(&self, schema: &'a Schema, clause: &FilterClause, joins: &mut Vec<Join>) -> Result<Predicate, HostError> {
        let path = clause.path(&self.separator);
        let name = path.first();
        let column = ColumnRef::qualified(self.table(schema), name);
        let node = FilterNode::Leaf(clause.clone());

        let ctx = FilterContext { catalog: self.catalog, schema, name, column: &column, filter: &node };
        if let Some(resolved) = self.resolver.resolve_filter(&ctx)? {
            joins.extend(resolved.joins);
            return Ok(resolved.expr);
        }

        let field = schema.field(name).ok_or_else(|| HostError::UnknownField(clause.name.clone()))?;
        match (field.relationship_target(), path.tail()) {
            (Some(target), Some(rest)) => {
                let target = self.schema(target)?;
                self.join(schema, &field.name, target, joins);
                self.filter_leaf(target, &clause.with_path(&rest), joins)
            }
            (None, None) => baseline(Expr::Column(column), clause.op, Value::from_json(&clause.value)),
            _ => Err(HostError::UnknownField(clause.name.clone())),
        }
    }

    fn sort_clause(&self, schema: &'a Schema, clause: &SortClause, joins: &mut Vec<Join>) -> Result<OrderBy, HostError> {
        let path = clause.path(&self.separator);
        let name = path.first();
        let column = ColumnRef::qualified(self.table(schema), name);

        let ctx = SortContext { catalog: self.catalog, schema, name, column: &column, sort: clause };
        if let Some(resolved) = self.resolver.resolve_sort(&ctx)? {
            joins.extend(resolved.joins);
            return Ok(resolved.expr);
        }

        let field = schema.field(name).ok_or_else(|| HostError::UnknownField(clause.field.clone()))?;
        match (field.relationship_target(), path.tail()) {
            (Some(target), Some(rest)) => {
                let target = self.schema(target)?;
                self.join(schema, &field.name, target, joins);
                self.sort_clause(target, &clause.with_path(&rest), joins)
            }
            (None, None) => Ok(OrderBy::new(Expr::Column(column), clause.direction)),
            _ => Err(HostError::UnknownField(clause.field.clone())),
        }
    }

    fn join(&self, from: &Schema, field: &str, to: &Schema, joins: &mut Vec<Join>) {
        let (from_table, to_table) = (self.table(from), self.table(to));
        if joins.iter().any(|join| join.table == to_table) {
            return;
        }
        tracing::trace!(from = %from_table, to = %to_table, field, "joining relationship");
        joins.push(Join {
            table: to_table.clone(),
            alias: None,
            on: Predicate::Compare {
                left: Expr::Column(ColumnRef::qualified(from_table, format!("{}_id", field))),
                op: CompareOp::Eq,
                right: Expr::Column(ColumnRef::qualified(to_table, "id")),
            },
        });
    }
}

fn baseline(column: Expr, op: Operator, value: Value) -> Result<Predicate, HostError> {
    let compare = |op: CompareOp| -> Result<Predicate, HostError> { Ok(Predicate::compare(column.clone(), op, value.clone())) };
    match op {
        Operator::Eq => compare(CompareOp::Eq),
        Operator::Ne => compare(CompareOp::NotEq),
        Operator::Gt => compare(CompareOp::Gt),
        Operator::Ge => compare(CompareOp::GtEq),
        Operator::Lt => compare(CompareOp::Lt),
        Operator::Le => compare(CompareOp::LtEq),
        Operator::In | Operator::NotIn => {
            let list = match value {
                Value::List(items) => items,
                other => vec![other],
            };
            Ok(Predicate::InList { expr: column, list, negated: op == Operator::NotIn })
        }
        other => Err(HostError::UnsupportedOperator(other)),
    }
}
