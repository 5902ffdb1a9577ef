//! Filter value coercion.
//!
//! A raw client value is deserialized with the rules its terminal field would apply to ordinary
//! input, so that the backend compares like with like (an enumerated value arrives as
//! `"ACTIVE(1)"` but is stored as `1`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use nestql::Value;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

use crate::registry::{NativeType, TypeRegistry};
use crate::schema::{Field, FieldKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoercionError {
    #[error("expected {expected}, got {found}")]
    ExpectedType { expected: &'static str, found: String },
    #[error("not a valid {expected}: {value:?}")]
    InvalidFormat { expected: &'static str, value: String },
    #[error("not an integer: {0}")]
    NotIntegral(String),
    #[error("field may not be null")]
    NotNullable,
    #[error("no such member: {0:?}")]
    UnknownVariant(String),
    #[error("field kind {0} has no registered native type")]
    Unmapped(String),
    #[error("expected {expected} values, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("expected a single value, got a list")]
    ExpectedScalar,
    #[error("expected at least one value")]
    EmptyList,
    #[error("null can only be tested for equality")]
    NullOperand,
}

const TRUTHY: &[&str] = &["true", "t", "yes", "y", "on", "1"];
const FALSY: &[&str] = &["false", "f", "no", "n", "off", "0"];

const LOCAL_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
}

/// Coerce `raw` to the native type of `field`.
///
/// A JSON array against a scalar field coerces element-wise into [`Value::List`] (the shape of
/// `in_`, `notin_` and `between` operands). A scalar against a list field is wrapped into a
/// one-element list.
pub fn coerce(registry: &TypeRegistry, field: &Field, raw: &Json) -> Result<Value, CoercionError> {
    let native = registry.native_type(&field.kind).ok_or_else(|| CoercionError::Unmapped(field.kind.to_string()))?;

    match (native, raw) {
        (_, Json::Null) => null(field),
        (NativeType::List, _) => coerce_list(registry, field, raw),
        (NativeType::Mapping, Json::Object(map)) => Ok(Value::Object(map.clone())),
        (NativeType::Mapping, other) => Err(expected("object", other)),
        (_, Json::Array(items)) => items.iter().map(|item| coerce_scalar(field, native, item)).collect::<Result<Vec<_>, _>>().map(Value::List),
        _ => coerce_scalar(field, native, raw),
    }
}

fn null(field: &Field) -> Result<Value, CoercionError> {
    if field.nullable {
        Ok(Value::Null)
    } else {
        Err(CoercionError::NotNullable)
    }
}

fn expected(expected: &'static str, found: &Json) -> CoercionError { CoercionError::ExpectedType { expected, found: found.to_string() } }

fn coerce_list(registry: &TypeRegistry, field: &Field, raw: &Json) -> Result<Value, CoercionError> {
    let items: Vec<&Json> = match raw {
        Json::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let values = items
        .into_iter()
        .map(|item| match &field.item {
            Some(element) if registry.native_type(&element.kind).is_some() => coerce(registry, element, item),
            _ => Ok(Value::from_json(item)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::List(values))
}

fn coerce_scalar(field: &Field, native: NativeType, raw: &Json) -> Result<Value, CoercionError> {
    if raw.is_null() {
        return null(field);
    }

    match native {
        NativeType::Text => {
            let s = expect_str(raw)?;
            match field.kind {
                FieldKind::Email if !email_pattern().is_match(s) => Err(CoercionError::InvalidFormat { expected: "email address", value: s.to_owned() }),
                FieldKind::Url if url::Url::parse(s).is_err() => Err(CoercionError::InvalidFormat { expected: "url", value: s.to_owned() }),
                _ => Ok(Value::String(s.to_owned())),
            }
        }
        NativeType::Bytes => Ok(Value::Bytes(expect_str(raw)?.as_bytes().to_vec())),
        NativeType::Integer if field.kind == FieldKind::Enum => coerce_enum(field, raw),
        NativeType::Integer => coerce_integer(raw).map(Value::Integer),
        NativeType::Float => match raw {
            Json::Number(n) => n.as_f64().map(Value::Float).ok_or_else(|| expected("float", raw)),
            Json::String(s) => {
                s.trim().parse::<f64>().map(Value::Float).map_err(|_| CoercionError::InvalidFormat { expected: "float", value: s.clone() })
            }
            other => Err(expected("float", other)),
        },
        NativeType::Decimal => {
            let text = match raw {
                Json::Number(n) => n.to_string(),
                Json::String(s) => s.trim().to_owned(),
                other => return Err(expected("decimal", other)),
            };
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map(Value::Decimal)
                .map_err(|_| CoercionError::InvalidFormat { expected: "decimal", value: text })
        }
        NativeType::Boolean => coerce_bool(raw).map(Value::Bool),
        NativeType::DateTime => {
            let s = expect_str(raw)?;
            if field.kind == FieldKind::LocalDateTime {
                LOCAL_DATETIME_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                    .map(Value::LocalDateTime)
                    .ok_or_else(|| CoercionError::InvalidFormat { expected: "local datetime", value: s.to_owned() })
            } else {
                DateTime::parse_from_rfc3339(s)
                    .map(Value::DateTime)
                    .map_err(|_| CoercionError::InvalidFormat { expected: "RFC 3339 datetime", value: s.to_owned() })
            }
        }
        NativeType::Date => {
            let s = expect_str(raw)?;
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Value::Date).map_err(|_| CoercionError::InvalidFormat { expected: "date", value: s.to_owned() })
        }
        NativeType::Time => {
            let s = expect_str(raw)?;
            TIME_FORMATS
                .iter()
                .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
                .map(Value::Time)
                .ok_or_else(|| CoercionError::InvalidFormat { expected: "time", value: s.to_owned() })
        }
        NativeType::Uuid => {
            let s = expect_str(raw)?;
            Uuid::parse_str(s).map(Value::Uuid).map_err(|_| CoercionError::InvalidFormat { expected: "uuid", value: s.to_owned() })
        }
        NativeType::List => Err(expected("list", raw)),
        NativeType::Mapping => Err(expected("object", raw)),
    }
}

fn expect_str(raw: &Json) -> Result<&str, CoercionError> { raw.as_str().ok_or_else(|| expected("string", raw)) }

fn coerce_integer(raw: &Json) -> Result<i64, CoercionError> {
    match raw {
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(i),
            (None, Some(f)) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
            _ => Err(CoercionError::NotIntegral(n.to_string())),
        },
        Json::String(s) => s.trim().parse::<i64>().map_err(|_| CoercionError::NotIntegral(s.clone())),
        other => Err(expected("integer", other)),
    }
}

fn coerce_bool(raw: &Json) -> Result<bool, CoercionError> {
    match raw {
        Json::Bool(b) => Ok(*b),
        Json::Number(n) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(CoercionError::InvalidFormat { expected: "boolean", value: n.to_string() }),
        },
        Json::String(s) => {
            let lowered = s.trim().to_ascii_lowercase();
            if TRUTHY.contains(&lowered.as_str()) {
                Ok(true)
            } else if FALSY.contains(&lowered.as_str()) {
                Ok(false)
            } else {
                Err(CoercionError::InvalidFormat { expected: "boolean", value: s.clone() })
            }
        }
        other => Err(expected("boolean", other)),
    }
}

/// Accepts `NAME(value)`, a bare member name, or a bare stored value; yields the stored value.
fn coerce_enum(field: &Field, raw: &Json) -> Result<Value, CoercionError> {
    let by_value = |value: i64| -> Result<Value, CoercionError> {
        if field.variants.is_empty() || field.variants.iter().any(|v| v.value == value) {
            Ok(Value::Integer(value))
        } else {
            Err(CoercionError::UnknownVariant(value.to_string()))
        }
    };

    let text = match raw {
        Json::String(s) => s.trim(),
        _ => return by_value(coerce_integer(raw)?),
    };

    if let Some((name, rest)) = text.split_once('(') {
        let inner = rest.strip_suffix(')').ok_or_else(|| CoercionError::InvalidFormat { expected: "NAME(value)", value: text.to_owned() })?;
        let value = inner.trim().parse::<i64>().map_err(|_| CoercionError::NotIntegral(inner.to_owned()))?;
        return match field.variants.iter().find(|v| v.name == name.trim()) {
            Some(variant) if variant.value == value => Ok(Value::Integer(value)),
            Some(_) => Err(CoercionError::InvalidFormat { expected: "NAME(value)", value: text.to_owned() }),
            None if field.variants.is_empty() => Ok(Value::Integer(value)),
            None => Err(CoercionError::UnknownVariant(name.trim().to_owned())),
        };
    }

    if let Some(variant) = field.variants.iter().find(|v| v.name == text) {
        return Ok(Value::Integer(variant.value));
    }

    match text.parse::<i64>() {
        Ok(value) => by_value(value),
        Err(_) => Err(CoercionError::UnknownVariant(text.to_owned())),
    }
}
