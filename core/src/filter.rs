//! Compiles one filter clause against an embedded document key.

use nestql::ast::Operator;
use nestql::expr::{CastType, ColumnRef, CompareOp, Expr, Predicate};
use nestql::Value;
use serde_json::Value as Json;

use crate::coerce::{coerce, CoercionError};
use crate::config::CompilerConfig;
use crate::error::{ClauseKind, CompileError};
use crate::overrides::OverrideRegistry;
use crate::path::EmbeddedTarget;
use crate::registry::{NativeType, TypeRegistry};

/// Everything compilation reads besides the clause itself.
#[derive(Debug, Clone, Copy)]
pub struct CompileEnv<'a> {
    pub types: &'a TypeRegistry,
    pub overrides: &'a OverrideRegistry,
    pub config: &'a CompilerConfig,
}

/// The clause being compiled, for error reporting.
struct Site<'a> {
    path: String,
    raw: &'a Json,
    target: String,
}

impl Site<'_> {
    fn invalid_value(&self, source: CoercionError) -> CompileError {
        tracing::warn!(path = %self.path, value = %self.raw, %source, "rejected filter value");
        CompileError::InvalidValue { path: self.path.clone(), value: self.raw.to_string(), source }
    }

    fn unsupported(&self, op: Operator) -> CompileError {
        tracing::warn!(path = %self.path, %op, target = %self.target, "rejected filter operator");
        CompileError::UnsupportedOperator { path: self.path.clone(), op, target: self.target.clone() }
    }
}

pub fn compile_filter(env: &CompileEnv<'_>, target: &EmbeddedTarget<'_>, column: &ColumnRef, op: Operator, raw: &Json) -> Result<Predicate, CompileError> {
    let field = target.field;
    let site = Site { path: target.path.to_string(), raw, target: field.kind.to_string() };
    let native = env.types.native_type(&field.kind);
    let extraction = Expr::json_text(column.clone(), target.key.as_str());

    let value = match native {
        // null tests are always meaningful, whatever the field's nullability
        _ if raw.is_null() && matches!(op, Operator::Eq | Operator::Ne | Operator::Is | Operator::IsNot) => Value::Null,
        Some(_) => coerce(env.types, field, raw).map_err(|e| site.invalid_value(e))?,
        None => Value::from_json(raw),
    };

    if let Some(ops) = env.overrides.filter(&field.kind, op) {
        tracing::debug!(path = %site.path, %op, kind = %field.kind, "delegating to field kind override");
        return ops
            .build_filter_predicate(field, extraction, &value, op)
            .map_err(|source| CompileError::Override { kind: ClauseKind::Filter, path: site.path.clone(), source });
    }

    let Some(native) = native else {
        return Err(CompileError::invalid_path(ClauseKind::Filter, &site.path, format!("no type mapping for {}", field.kind)));
    };

    let predicate = match (native, native.cast_type()) {
        (NativeType::List, _) => {
            let element = match value {
                Value::List(items) => items.into_iter().next().ok_or_else(|| site.invalid_value(CoercionError::EmptyList))?,
                other => other,
            };
            let container = Expr::json_value(column.clone(), target.key.as_str());
            Predicate::Contains { container, element }
        }
        (NativeType::Boolean, Some(cast)) => {
            let value = match value {
                Value::List(items) => items.into_iter().next().ok_or_else(|| site.invalid_value(CoercionError::EmptyList))?,
                other => other,
            };
            apply(&site, extraction.cast(cast), cast, Operator::Eq, value)?
        }
        (NativeType::Integer, Some(cast)) => {
            let zero = env.config.zero_matches_missing && value.is_falsy() && !value.is_null();
            let cast_expr = extraction.cast(cast);
            let predicate = apply(&site, cast_expr.clone(), cast, op, value)?;
            if zero {
                predicate.or(Predicate::is_null(cast_expr))
            } else {
                predicate
            }
        }
        (_, Some(cast)) => apply(&site, extraction.cast(cast), cast, op, value)?,
        (_, None) => {
            tracing::warn!(path = %site.path, kind = %field.kind, ?native, "no cast for native type");
            return Err(CompileError::invalid_path(ClauseKind::Filter, &site.path, format!("{} values cannot be filtered", field.kind)));
        }
    };

    tracing::debug!(path = %site.path, %op, "compiled embedded filter");
    Ok(predicate)
}

fn apply(site: &Site<'_>, expr: Expr, cast: CastType, op: Operator, value: Value) -> Result<Predicate, CompileError> {
    if op.is_pattern() && cast != CastType::String {
        return Err(site.unsupported(op));
    }

    // equality against null was handled above, nothing else compares meaningfully with it
    if value.is_null() && !matches!(op, Operator::Eq | Operator::Is | Operator::Ne | Operator::IsNot) {
        return Err(site.invalid_value(CoercionError::NullOperand));
    }

    let scalar = |value: Value| match value {
        Value::List(_) => Err(site.invalid_value(CoercionError::ExpectedScalar)),
        other => Ok(other),
    };

    Ok(match op {
        Operator::Eq | Operator::Is if value.is_null() => Predicate::is_null(expr),
        Operator::Ne | Operator::IsNot if value.is_null() => Predicate::is_not_null(expr),
        Operator::Eq | Operator::Is => Predicate::compare(expr, CompareOp::Eq, scalar(value)?),
        Operator::Ne | Operator::IsNot => Predicate::compare(expr, CompareOp::NotEq, scalar(value)?),
        Operator::Gt => Predicate::compare(expr, CompareOp::Gt, scalar(value)?),
        Operator::Ge => Predicate::compare(expr, CompareOp::GtEq, scalar(value)?),
        Operator::Lt => Predicate::compare(expr, CompareOp::Lt, scalar(value)?),
        Operator::Le => Predicate::compare(expr, CompareOp::LtEq, scalar(value)?),
        Operator::Like => Predicate::compare(expr, CompareOp::Like, scalar(value)?),
        Operator::ILike => Predicate::compare(expr, CompareOp::ILike, scalar(value)?),
        Operator::NotLike => Predicate::compare(expr, CompareOp::NotLike, scalar(value)?),
        Operator::NotILike => Predicate::compare(expr, CompareOp::NotILike, scalar(value)?),
        Operator::StartsWith => Predicate::compare(expr, CompareOp::Like, Value::String(format!("{}%", pattern_text(site, scalar(value)?)?))),
        Operator::EndsWith => Predicate::compare(expr, CompareOp::Like, Value::String(format!("%{}", pattern_text(site, scalar(value)?)?))),
        Operator::In | Operator::NotIn => {
            let list = match value {
                Value::List(items) => items,
                other => vec![other],
            };
            Predicate::InList { expr, list, negated: op == Operator::NotIn }
        }
        Operator::Between => match value {
            Value::List(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(low), Some(high)) => Predicate::Between { expr, low, high },
                    _ => return Err(site.invalid_value(CoercionError::Arity { expected: 2, found: 0 })),
                }
            }
            Value::List(items) => return Err(site.invalid_value(CoercionError::Arity { expected: 2, found: items.len() })),
            _ => return Err(site.invalid_value(CoercionError::Arity { expected: 2, found: 1 })),
        },
    })
}

/// `startswith`/`endswith` operands with `%` and `_` escaped so they match literally.
fn pattern_text(site: &Site<'_>, value: Value) -> Result<String, CompileError> {
    let text = match value {
        Value::String(s) => s,
        Value::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
        other => return Err(site.invalid_value(CoercionError::ExpectedType { expected: "string", found: other.type_name().to_owned() })),
    };
    Ok(text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"))
}
