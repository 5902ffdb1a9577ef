use nestql::ast::Direction;
use nestql::expr::{CastType, ColumnRef, CompareOp, Expr, Join, OrderBy, Predicate};
use nestql::Value;
use std::str::FromStr;
use thiserror::Error;
use tokio_postgres::types::ToSql;

#[derive(Debug, Error, Clone)]
pub enum SqlGenerationError {
    #[error("Unsupported expression type: {0}")]
    UnsupportedExpression(&'static str),
    #[error("SqlBuilder requires both fields and table_name to be set for complete SELECT generation, or neither for WHERE-only mode")]
    IncompleteConfiguration,
}

pub enum SqlExpr {
    Sql(String),
    Argument(Box<dyn ToSql + Send + Sync>),
}

/// Accumulates SQL fragments and arguments; arguments are numbered `$1..` on build.
pub struct SqlBuilder {
    expressions: Vec<SqlExpr>,
    joins: Vec<SqlExpr>,
    fields: Vec<String>,
    table_name: Option<String>,
}

impl Default for SqlBuilder {
    fn default() -> Self { Self::new() }
}

pub fn cast_type_name(cast: CastType) -> &'static str {
    match cast {
        CastType::Decimal => "NUMERIC",
        CastType::String => "TEXT",
        // tokio-postgres binds i64 as INT8
        CastType::Integer => "BIGINT",
        CastType::Boolean => "BOOLEAN",
    }
}

fn quote_ident(name: &str) -> String { format!(r#""{}""#, name.replace('"', "\"\"")) }

fn quote_literal(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

impl SqlBuilder {
    pub fn new() -> Self { Self { expressions: Vec::new(), joins: Vec::new(), fields: Vec::new(), table_name: None } }

    pub fn with_fields<T: Into<String>>(fields: Vec<T>) -> Self {
        Self { fields: fields.into_iter().map(|f| f.into()).collect(), ..Self::new() }
    }

    pub fn table_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn push(&mut self, expr: SqlExpr) { self.expressions.push(expr); }

    pub fn arg(&mut self, arg: impl ToSql + Send + Sync + 'static) {
        self.push(SqlExpr::Argument(Box::new(arg) as Box<dyn ToSql + Send + Sync>));
    }

    pub fn sql(&mut self, s: impl AsRef<str>) { self.push(SqlExpr::Sql(s.as_ref().to_owned())); }

    /// Complete `SELECT` with joins, the accumulated `WHERE` clause and any `ORDER BY`.
    pub fn build(self) -> Result<(String, Vec<Box<dyn ToSql + Send + Sync>>), SqlGenerationError> {
        if self.fields.is_empty() {
            return Err(SqlGenerationError::IncompleteConfiguration);
        }
        let Some(table) = self.table_name else {
            return Err(SqlGenerationError::IncompleteConfiguration);
        };

        let fields_clause = self.fields.iter().map(|field| quote_ident(field)).collect::<Vec<_>>().join(", ");
        let mut counter = 1;
        let mut args = Vec::new();
        let joins = collapse(self.joins, &mut counter, &mut args);
        let mut where_clause = collapse(self.expressions, &mut counter, &mut args);
        if where_clause.is_empty() || where_clause.starts_with(" ORDER BY") {
            where_clause.insert_str(0, "TRUE");
        }

        let sql = format!("SELECT {} FROM {}{} WHERE {}", fields_clause, quote_ident(&table), joins, where_clause);
        tracing::trace!(%sql, args = args.len(), "built postgres query");
        Ok((sql, args))
    }

    pub fn build_where_clause(self) -> (String, Vec<Box<dyn ToSql + Send + Sync>>) {
        let mut counter = 1;
        let mut args = Vec::new();
        let where_clause = collapse(self.expressions, &mut counter, &mut args);
        (where_clause, args)
    }

    // --- IR flattening ---
    pub fn column(&mut self, column: &ColumnRef) {
        match &column.table {
            Some(table) => self.sql(format!("{}.{}", quote_ident(table), quote_ident(&column.name))),
            None => self.sql(quote_ident(&column.name)),
        }
    }

    pub fn expr(&mut self, expr: &Expr) -> Result<(), SqlGenerationError> {
        match expr {
            Expr::Column(column) => self.column(column),
            Expr::JsonText { column, key } => {
                self.column(column);
                self.sql(format!(" ->> {}", quote_literal(key)));
            }
            Expr::JsonValue { column, key } => {
                self.column(column);
                self.sql(format!(" -> {}", quote_literal(key)));
            }
            Expr::Cast { expr, to } => {
                self.sql("CAST(");
                self.expr(expr)?;
                self.sql(format!(" AS {})", cast_type_name(*to)));
            }
            Expr::Literal(value) => self.value(value),
        }
        Ok(())
    }

    pub fn value(&mut self, value: &Value) {
        match value {
            Value::Null => self.sql("NULL"),
            Value::Bool(b) => self.arg(*b),
            Value::Integer(i) => self.arg(*i),
            Value::Float(f) => self.arg(*f),
            Value::Decimal(d) => self.arg(*d),
            Value::String(s) => self.arg(s.to_owned()),
            Value::Bytes(b) => self.arg(String::from_utf8_lossy(b).into_owned()),
            Value::DateTime(dt) => self.arg(*dt),
            Value::LocalDateTime(dt) => self.arg(*dt),
            Value::Date(d) => self.arg(*d),
            Value::Time(t) => self.arg(*t),
            Value::Uuid(u) => self.arg(*u),
            Value::List(_) | Value::Object(_) => self.arg(value.to_json()),
        }
    }

    pub fn predicate(&mut self, predicate: &Predicate) -> Result<(), SqlGenerationError> {
        match predicate {
            Predicate::Compare { left, op, right } => {
                self.expr(left)?;
                self.sql(format!(" {} ", compare_op_to_sql(*op)));
                self.expr(right)?;
            }
            Predicate::InList { expr, list, negated } => {
                if list.is_empty() {
                    self.sql(if *negated { "TRUE" } else { "FALSE" });
                    return Ok(());
                }
                self.expr(expr)?;
                self.sql(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in list.iter().enumerate() {
                    if i > 0 {
                        self.sql(", ");
                    }
                    self.value(value);
                }
                self.sql(")");
            }
            Predicate::Between { expr, low, high } => {
                self.expr(expr)?;
                self.sql(" BETWEEN ");
                self.value(low);
                self.sql(" AND ");
                self.value(high);
            }
            Predicate::IsNull { expr, negated } => {
                self.expr(expr)?;
                self.sql(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::Contains { container, element } => {
                if matches!(container, Expr::Literal(_) | Expr::Cast { .. }) {
                    return Err(SqlGenerationError::UnsupportedExpression("Containment requires a document expression"));
                }
                self.sql("(");
                self.expr(container)?;
                match element {
                    // `?` tests for a top-level string element or key
                    Value::String(s) => {
                        self.sql(") ? ");
                        self.arg(s.to_owned());
                    }
                    Value::Object(_) => {
                        self.sql(") @> ");
                        self.arg(element.to_json());
                    }
                    other => {
                        self.sql(") @> ");
                        self.arg(serde_json::Value::Array(vec![json_element(other)]));
                    }
                }
            }
            Predicate::And(items) => self.junction(items, " AND ", "TRUE", false)?,
            Predicate::Or(items) => self.junction(items, " OR ", "FALSE", true)?,
            Predicate::Not(pred) => {
                self.sql("NOT (");
                self.predicate(pred)?;
                self.sql(")");
            }
            Predicate::True => self.sql("TRUE"),
            Predicate::False => self.sql("FALSE"),
        }
        Ok(())
    }

    fn junction(&mut self, items: &[Predicate], separator: &str, empty: &str, parenthesize: bool) -> Result<(), SqlGenerationError> {
        if items.is_empty() {
            self.sql(empty);
            return Ok(());
        }
        if parenthesize {
            self.sql("(");
        }
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.sql(separator);
            }
            self.predicate(item)?;
        }
        if parenthesize {
            self.sql(")");
        }
        Ok(())
    }

    pub fn order_by(&mut self, items: &[OrderBy]) -> Result<(), SqlGenerationError> {
        if items.is_empty() {
            return Ok(());
        }
        self.sql(" ORDER BY ");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.sql(", ");
            }
            self.order_by_item(item)?;
        }
        Ok(())
    }

    pub fn order_by_item(&mut self, order_by: &OrderBy) -> Result<(), SqlGenerationError> {
        self.expr(&order_by.expr)?;
        match order_by.direction {
            Direction::Asc => self.sql(" ASC"),
            Direction::Desc => self.sql(" DESC"),
        }
        Ok(())
    }

    /// Render `JOIN <table> [alias] ON <predicate>` ahead of the `WHERE` clause.
    pub fn join(&mut self, join: &Join) -> Result<(), SqlGenerationError> {
        let mut on = SqlBuilder::new();
        on.predicate(&join.on)?;
        self.joins.push(SqlExpr::Sql(format!(" JOIN {}", quote_ident(&join.table))));
        if let Some(alias) = &join.alias {
            self.joins.push(SqlExpr::Sql(format!(" AS {}", quote_ident(alias))));
        }
        self.joins.push(SqlExpr::Sql(" ON ".to_owned()));
        self.joins.extend(on.expressions);
        Ok(())
    }
}

fn collapse(expressions: Vec<SqlExpr>, counter: &mut usize, args: &mut Vec<Box<dyn ToSql + Send + Sync>>) -> String {
    let mut sql = String::new();
    for expr in expressions {
        match expr {
            SqlExpr::Argument(arg) => {
                sql += &format!("${}", counter);
                args.push(arg);
                *counter += 1;
            }
            SqlExpr::Sql(s) => {
                sql += &s;
            }
        }
    }
    sql
}

/// jsonb containment compares by JSON type, so decimals have to go over as numbers.
fn json_element(value: &Value) -> serde_json::Value {
    match value {
        Value::Decimal(d) => match serde_json::Number::from_str(&d.normalize().to_string()) {
            Ok(number) => serde_json::Value::Number(number),
            Err(_) => value.to_json(),
        },
        other => other.to_json(),
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
        CompareOp::Like => "LIKE",
        CompareOp::ILike => "ILIKE",
        CompareOp::NotLike => "NOT LIKE",
        CompareOp::NotILike => "NOT ILIKE",
    }
}
