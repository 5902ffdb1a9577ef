use pest::iterators::Pair;
use pest::Parser;
use std::str::FromStr;

use crate::ast::{Direction, FilterClause, FilterNode, Operator, SortClause};
use crate::error::ParseError;
use crate::grammar::{NestqlParser, Rule};

/// Parse the JSON:API `filter` parameter from its raw JSON text.
pub fn parse_filter_str(input: &str) -> Result<Vec<FilterNode>, ParseError> {
    let json: serde_json::Value = serde_json::from_str(input)?;
    parse_filters(&json)
}

/// Parse a decoded `filter` parameter. Accepts a list of nodes or a single node.
///
/// Leaves look like `{"name": "author__profile__city", "op": "eq", "val": "Berlin"}`;
/// combinators are `{"and": [...]}`, `{"or": [...]}` and `{"not": {...}}`.
pub fn parse_filters(json: &serde_json::Value) -> Result<Vec<FilterNode>, ParseError> {
    match json {
        serde_json::Value::Array(items) => items.iter().map(parse_node).collect(),
        serde_json::Value::Object(_) => Ok(vec![parse_node(json)?]),
        other => Err(ParseError::InvalidFilter(format!("expected a list or an object, got {}", other))),
    }
}

fn parse_node(json: &serde_json::Value) -> Result<FilterNode, ParseError> {
    let object = json.as_object().ok_or_else(|| ParseError::InvalidFilter(format!("expected an object, got {}", json)))?;

    if let Some(items) = object.get("and") {
        return Ok(FilterNode::And(parse_node_list("and", items)?));
    }
    if let Some(items) = object.get("or") {
        return Ok(FilterNode::Or(parse_node_list("or", items)?));
    }
    if let Some(inner) = object.get("not") {
        return Ok(FilterNode::Not(Box::new(parse_node(inner)?)));
    }

    let name = object.get("name").and_then(|n| n.as_str()).ok_or(ParseError::MissingKey("name"))?;
    let op = object.get("op").and_then(|o| o.as_str()).ok_or(ParseError::MissingKey("op"))?;
    if object.contains_key("field") {
        return Err(ParseError::FieldComparison(name.to_owned()));
    }
    let value = object.get("val").ok_or(ParseError::MissingKey("val"))?;

    Ok(FilterNode::Leaf(FilterClause { name: name.to_owned(), op: Operator::from_str(op)?, value: value.clone() }))
}

fn parse_node_list(combinator: &str, json: &serde_json::Value) -> Result<Vec<FilterNode>, ParseError> {
    match json {
        serde_json::Value::Array(items) => items.iter().map(parse_node).collect(),
        other => Err(ParseError::InvalidFilter(format!("\"{}\" expects a list, got {}", combinator, other))),
    }
}

/// Parse the JSON:API `sort` parameter, e.g. `-author__profile__age,name`. A blank parameter means no ordering.
pub fn parse_sort(input: &str) -> Result<Vec<SortClause>, ParseError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let pairs = NestqlParser::parse(Rule::Sort, input)?;
    let mut clauses = Vec::new();
    for pair in pairs {
        match pair.as_rule() {
            Rule::SortItem => clauses.push(parse_sort_item(pair)?),
            Rule::EOI => {}
            other => return Err(ParseError::UnexpectedRule { expected: "SortItem", got: other }),
        }
    }
    tracing::trace!(input, clauses = clauses.len(), "parsed sort parameter");
    Ok(clauses)
}

fn parse_sort_item(pair: Pair<Rule>) -> Result<SortClause, ParseError> {
    let mut direction = Direction::Asc;
    let mut field = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::Descending => direction = Direction::Desc,
            Rule::FieldName => field = Some(inner.as_str().to_owned()),
            other => return Err(ParseError::UnexpectedRule { expected: "Descending or FieldName", got: other }),
        }
    }
    let field = field.ok_or_else(|| ParseError::SyntaxError("sort item without a field".to_owned()))?;
    Ok(SortClause { field, direction })
}
