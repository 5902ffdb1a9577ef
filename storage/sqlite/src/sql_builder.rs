//! SQL builder for SQLite queries
//!
//! SQLite has no `->>`/`?`/`@>` document operators, so extraction becomes `json_extract()` and
//! containment an `EXISTS` over `json_each()`. `LIKE` is already case-insensitive for ASCII,
//! which is what `ILIKE` renders to.

use nestql::ast::Direction;
use nestql::expr::{CastType, ColumnRef, CompareOp, Expr, Join, OrderBy, Predicate};
use nestql::Value;
use rusqlite::types::Value as SqlValue;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SqlGenerationError {
    #[error("Unsupported expression type: {0}")]
    UnsupportedExpression(&'static str),
}

pub fn cast_type_name(cast: CastType) -> &'static str {
    match cast {
        CastType::Decimal => "NUMERIC",
        CastType::String => "TEXT",
        // json_extract yields 1/0 for true/false
        CastType::Integer | CastType::Boolean => "INTEGER",
    }
}

fn quote_ident(name: &str) -> String { format!(r#""{}""#, name.replace('"', "\"\"")) }

fn json_path(key: &str) -> String { format!("'$.{}'", key.replace('\'', "''")) }

/// SQL builder for SQLite queries
pub struct SqlBuilder {
    sql: String,
    params: Vec<SqlValue>,
    joins: String,
    join_params: Vec<SqlValue>,
    fields: Vec<String>,
    table_name: Option<String>,
}

impl Default for SqlBuilder {
    fn default() -> Self { Self::new() }
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self { sql: String::new(), params: Vec::new(), joins: String::new(), join_params: Vec::new(), fields: Vec::new(), table_name: None }
    }

    pub fn with_fields<T: Into<String>>(fields: Vec<T>) -> Self { Self { fields: fields.into_iter().map(|f| f.into()).collect(), ..Self::new() } }

    pub fn table_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn push_sql(&mut self, s: &str) { self.sql.push_str(s); }

    pub fn push_param(&mut self, value: SqlValue) {
        self.sql.push('?');
        self.params.push(value);
    }

    /// A complete `SELECT` when fields and table are set, otherwise just the `WHERE` clause.
    pub fn build(self) -> (String, Vec<SqlValue>) {
        let table = match &self.table_name {
            Some(table) if !self.fields.is_empty() => table,
            _ => return (self.sql, self.params),
        };

        let fields_clause = self.fields.iter().map(|field| quote_ident(field)).collect::<Vec<_>>().join(", ");
        let where_clause = if self.sql.is_empty() || self.sql.starts_with(" ORDER BY") { format!("1=1{}", self.sql) } else { self.sql };
        let sql = format!("SELECT {} FROM {}{} WHERE {}", fields_clause, quote_ident(table), self.joins, where_clause);

        let mut params = self.join_params;
        params.extend(self.params);
        tracing::trace!(%sql, params = params.len(), "built sqlite query");
        (sql, params)
    }

    pub fn build_where_clause(self) -> (String, Vec<SqlValue>) { (self.sql, self.params) }

    pub fn column(&mut self, column: &ColumnRef) {
        match &column.table {
            Some(table) => self.push_sql(&format!("{}.{}", quote_ident(table), quote_ident(&column.name))),
            None => self.push_sql(&quote_ident(&column.name)),
        }
    }

    pub fn expr(&mut self, expr: &Expr) -> Result<(), SqlGenerationError> {
        match expr {
            Expr::Column(column) => self.column(column),
            // json_extract returns SQL scalars for scalars and JSON text for arrays and objects,
            // so both extraction flavors render the same
            Expr::JsonText { column, key } | Expr::JsonValue { column, key } => {
                self.push_sql("json_extract(");
                self.column(column);
                self.push_sql(&format!(", {})", json_path(key)));
            }
            Expr::Cast { expr, to } => {
                self.push_sql("CAST(");
                self.expr(expr)?;
                self.push_sql(&format!(" AS {})", cast_type_name(*to)));
            }
            Expr::Literal(Value::Null) => self.push_sql("NULL"),
            Expr::Literal(value) => self.value(value),
        }
        Ok(())
    }

    pub fn value(&mut self, value: &Value) {
        let param = match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
            Value::Integer(i) => SqlValue::Integer(*i),
            Value::Float(f) => SqlValue::Real(*f),
            Value::Decimal(d) => match d.to_f64() {
                Some(f) => SqlValue::Real(f),
                None => SqlValue::Text(d.to_string()),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Bytes(b) => SqlValue::Text(String::from_utf8_lossy(b).into_owned()),
            // temporal values and uuids are stored as their JSON strings
            other => match other.to_json() {
                serde_json::Value::String(s) => SqlValue::Text(s),
                json => SqlValue::Text(json.to_string()),
            },
        };
        self.push_param(param);
    }

    pub fn predicate(&mut self, predicate: &Predicate) -> Result<(), SqlGenerationError> {
        match predicate {
            Predicate::Compare { left, op, right } => {
                self.expr(left)?;
                self.push_sql(&format!(" {} ", compare_op_to_sql(*op)));
                self.expr(right)?;
                if matches!(op, CompareOp::Like | CompareOp::ILike | CompareOp::NotLike | CompareOp::NotILike) {
                    self.push_sql(r" ESCAPE '\'");
                }
            }
            Predicate::InList { expr, list, negated } => {
                if list.is_empty() {
                    self.push_sql(if *negated { "1=1" } else { "1=0" });
                    return Ok(());
                }
                self.expr(expr)?;
                self.push_sql(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in list.iter().enumerate() {
                    if i > 0 {
                        self.push_sql(", ");
                    }
                    self.value(value);
                }
                self.push_sql(")");
            }
            Predicate::Between { expr, low, high } => {
                self.expr(expr)?;
                self.push_sql(" BETWEEN ");
                self.value(low);
                self.push_sql(" AND ");
                self.value(high);
            }
            Predicate::IsNull { expr, negated } => {
                self.expr(expr)?;
                self.push_sql(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::Contains { container, element } => {
                if matches!(element, Value::Object(_) | Value::List(_)) {
                    return Err(SqlGenerationError::UnsupportedExpression("Only scalar elements can be tested for list membership"));
                }
                self.push_sql("EXISTS (SELECT 1 FROM json_each(");
                match container {
                    Expr::Column(column) => self.column(column),
                    Expr::JsonText { column, key } | Expr::JsonValue { column, key } => {
                        self.column(column);
                        self.push_sql(&format!(", {}", json_path(key)));
                    }
                    _ => return Err(SqlGenerationError::UnsupportedExpression("Containment requires a document expression")),
                }
                self.push_sql(") WHERE value = ");
                self.value(element);
                self.push_sql(")");
            }
            Predicate::And(items) => self.junction(items, " AND ", "1=1", false)?,
            Predicate::Or(items) => self.junction(items, " OR ", "1=0", true)?,
            Predicate::Not(pred) => {
                self.push_sql("NOT (");
                self.predicate(pred)?;
                self.push_sql(")");
            }
            Predicate::True => self.push_sql("1=1"),
            Predicate::False => self.push_sql("1=0"),
        }
        Ok(())
    }

    fn junction(&mut self, items: &[Predicate], separator: &str, empty: &str, parenthesize: bool) -> Result<(), SqlGenerationError> {
        if items.is_empty() {
            self.push_sql(empty);
            return Ok(());
        }
        if parenthesize {
            self.push_sql("(");
        }
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push_sql(separator);
            }
            self.predicate(item)?;
        }
        if parenthesize {
            self.push_sql(")");
        }
        Ok(())
    }

    pub fn order_by(&mut self, items: &[OrderBy]) -> Result<(), SqlGenerationError> {
        if items.is_empty() {
            return Ok(());
        }
        self.push_sql(" ORDER BY ");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push_sql(", ");
            }
            self.order_by_item(item)?;
        }
        Ok(())
    }

    pub fn order_by_item(&mut self, order_by: &OrderBy) -> Result<(), SqlGenerationError> {
        self.expr(&order_by.expr)?;
        match order_by.direction {
            Direction::Asc => self.push_sql(" ASC"),
            Direction::Desc => self.push_sql(" DESC"),
        }
        Ok(())
    }

    pub fn join(&mut self, join: &Join) -> Result<(), SqlGenerationError> {
        let mut on = SqlBuilder::new();
        on.predicate(&join.on)?;
        self.joins.push_str(&format!(" JOIN {}", quote_ident(&join.table)));
        if let Some(alias) = &join.alias {
            self.joins.push_str(&format!(" AS {}", quote_ident(alias)));
        }
        self.joins.push_str(" ON ");
        self.joins.push_str(&on.sql);
        self.join_params.extend(on.params);
        Ok(())
    }
}

fn compare_op_to_sql(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::NotEq => "<>",
        CompareOp::Gt => ">",
        CompareOp::GtEq => ">=",
        CompareOp::Lt => "<",
        CompareOp::LtEq => "<=",
        CompareOp::Like | CompareOp::ILike => "LIKE",
        CompareOp::NotLike | CompareOp::NotILike => "NOT LIKE",
    }
}
