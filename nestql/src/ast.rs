use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Default segment separator for field paths (`author__profile__city`).
pub const DEFAULT_SEPARATOR: &str = "__";

/// A field path split into segments on a reserved separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    segments: Vec<String>,
    separator: String,
}

impl Path {
    pub fn parse(raw: &str, separator: &str) -> Self {
        let segments = if separator.is_empty() { vec![raw.to_owned()] } else { raw.split(separator).map(str::to_owned).collect() };
        Self { segments, separator: separator.to_owned() }
    }

    pub fn from_segments<S: Into<String>>(segments: impl IntoIterator<Item = S>, separator: &str) -> Self {
        Self { segments: segments.into_iter().map(Into::into).collect(), separator: separator.to_owned() }
    }

    pub fn segments(&self) -> &[String] { &self.segments }

    pub fn separator(&self) -> &str { &self.separator }

    pub fn len(&self) -> usize { self.segments.len() }

    pub fn is_empty(&self) -> bool { self.segments.is_empty() }

    /// A single-segment path names a field directly and never crosses a boundary.
    pub fn is_simple(&self) -> bool { self.segments.len() == 1 }

    pub fn first(&self) -> &str { self.segments.first().map(String::as_str).unwrap_or("") }

    pub fn last(&self) -> &str { self.segments.last().map(String::as_str).unwrap_or("") }

    /// The path without its terminal segment, or `None` for a single-segment path.
    pub fn parent(&self) -> Option<Path> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self { segments: self.segments[..self.segments.len() - 1].to_vec(), separator: self.separator.clone() })
    }

    /// The path without its first segment, or `None` for a single-segment path.
    pub fn tail(&self) -> Option<Path> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self { segments: self.segments[1..].to_vec(), separator: self.separator.clone() })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.segments.join(&self.separator)) }
}

/// Filter operators understood by the host's filter syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    ILike,
    NotLike,
    NotILike,
    In,
    NotIn,
    Between,
    Is,
    IsNot,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub const ALL: [Operator; 17] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Ge,
        Operator::Lt,
        Operator::Le,
        Operator::Like,
        Operator::ILike,
        Operator::NotLike,
        Operator::NotILike,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::Is,
        Operator::IsNot,
        Operator::StartsWith,
        Operator::EndsWith,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::NotLike => "notlike",
            Operator::NotILike => "notilike",
            Operator::In => "in_",
            Operator::NotIn => "notin_",
            Operator::Between => "between",
            Operator::Is => "is_",
            Operator::IsNot => "isnot",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
        }
    }

    /// Operators matching on a text pattern rather than an ordered value.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Operator::Like | Operator::ILike | Operator::NotLike | Operator::NotILike | Operator::StartsWith | Operator::EndsWith)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Operator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" | "==" => Operator::Eq,
            "ne" | "!=" => Operator::Ne,
            "gt" => Operator::Gt,
            "ge" | "gte" => Operator::Ge,
            "lt" => Operator::Lt,
            "le" | "lte" => Operator::Le,
            "like" => Operator::Like,
            "ilike" => Operator::ILike,
            "notlike" | "not_like" => Operator::NotLike,
            "notilike" | "not_ilike" => Operator::NotILike,
            "in" | "in_" => Operator::In,
            "notin" | "notin_" | "not_in" => Operator::NotIn,
            "between" => Operator::Between,
            "is" | "is_" => Operator::Is,
            "isnot" | "is_not" => Operator::IsNot,
            "startswith" => Operator::StartsWith,
            "endswith" => Operator::EndsWith,
            other => return Err(ParseError::UnknownOperator(other.to_owned())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(ParseError::UnknownDirection(other.to_owned())),
        }
    }
}

/// A single leaf predicate as supplied by the client: `{"name": ..., "op": ..., "val": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub name: String,
    pub op: Operator,
    pub value: serde_json::Value,
}

impl FilterClause {
    pub fn new(name: impl Into<String>, op: Operator, value: serde_json::Value) -> Self { Self { name: name.into(), op, value } }

    pub fn path(&self, separator: &str) -> Path { Path::parse(&self.name, separator) }

    /// A copy of this clause addressing `path` instead. The original clause is left untouched.
    pub fn with_path(&self, path: &Path) -> Self { Self { name: path.to_string(), op: self.op, value: self.value.clone() } }
}

/// A filter tree: leaves are predicates, inner nodes are boolean combinators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    Leaf(FilterClause),
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
}

impl FilterNode {
    pub fn leaf(name: impl Into<String>, op: Operator, value: serde_json::Value) -> Self { FilterNode::Leaf(FilterClause::new(name, op, value)) }

    pub fn is_combinator(&self) -> bool { !matches!(self, FilterNode::Leaf(_)) }

    pub fn as_leaf(&self) -> Option<&FilterClause> {
        match self {
            FilterNode::Leaf(clause) => Some(clause),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub direction: Direction,
}

impl SortClause {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self { Self { field: field.into(), direction } }

    pub fn path(&self, separator: &str) -> Path { Path::parse(&self.field, separator) }

    pub fn with_path(&self, path: &Path) -> Self { Self { field: path.to_string(), direction: self.direction } }
}
