//! JSON parser for SEL
//!
//! Converts a JSON document into the [`Node`]/[`Query`] AST by recursive
//! descent over a `serde_json::Value` tree. Every error carries the
//! `$`-rooted JSON path of the offending node (e.g. `$.where.and[1]`)
//! so a query-builder UI can point at the exact spot.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::ast::{
    EntityKind, Node, Operation, OrderClause, OrderDirection, Query, QUERY_OPERATOR,
};

/// Maximum nesting depth accepted by the parser.
///
/// Compilation recurses over the AST, so unbounded nesting in untrusted
/// input could exhaust the stack.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The input was not well-formed JSON.
    #[error("invalid JSON: {message} (at {path})")]
    Json { message: String, path: String },

    /// An operation object had zero or more than one key.
    #[error("operation objects must have exactly one key (the operator), found {found} (at {path})")]
    SingleKey { found: usize, path: String },

    /// A required query field was missing.
    #[error("query must have a '{field}' field (at {path})")]
    MissingField { field: &'static str, path: String },

    /// The query target did not name a known entity kind.
    #[error("invalid target '{target}'; must be one of: {valid} (at {path})")]
    UnknownTarget {
        target: String,
        valid: String,
        path: String,
    },

    /// Nesting exceeded [`MAX_DEPTH`].
    #[error("expression nesting exceeds the maximum depth of {max} (at {path})")]
    TooDeep { max: usize, path: String },

    /// Any other structural violation.
    #[error("{message} (at {path})")]
    Invalid { message: String, path: String },
}

impl ParseError {
    /// The JSON path where the error occurred.
    pub fn path(&self) -> &str {
        match self {
            ParseError::Json { path, .. }
            | ParseError::SingleKey { path, .. }
            | ParseError::MissingField { path, .. }
            | ParseError::UnknownTarget { path, .. }
            | ParseError::TooDeep { path, .. }
            | ParseError::Invalid { path, .. } => path,
        }
    }

    fn invalid(message: impl Into<String>, path: impl Into<String>) -> Self {
        ParseError::Invalid {
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Parse a JSON string into a SEL expression node.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    let root = parse_json(input)?;
    parse_value(&root, "$", 0)
}

/// Parse a JSON string into a complete [`Query`].
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    let root = parse_json(input)?;
    let obj = root
        .as_object()
        .ok_or_else(|| ParseError::invalid("query must be a JSON object", "$"))?;
    parse_query_object(obj, "$", 0)
}

fn parse_json(input: &str) -> Result<Value, ParseError> {
    serde_json::from_str(input).map_err(|e| ParseError::Json {
        message: e.to_string(),
        path: "$".into(),
    })
}

fn parse_value(value: &Value, path: &str, depth: usize) -> Result<Node, ParseError> {
    if depth > MAX_DEPTH {
        return Err(ParseError::TooDeep {
            max: MAX_DEPTH,
            path: path.into(),
        });
    }
    match value {
        Value::Null => Ok(Node::Null),
        Value::Bool(b) => Ok(Node::Bool(*b)),
        Value::String(s) => Ok(Node::String(s.clone())),
        Value::Number(n) => parse_number(n, path),
        Value::Array(items) => {
            let nodes = items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_value(item, &format!("{path}[{i}]"), depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Array(nodes))
        }
        Value::Object(obj) => parse_object(obj, path, depth),
    }
}

/// Prefer an integer representation when the value has no fractional
/// part and fits an `i64` exactly, else fall back to floating point.
fn parse_number(number: &serde_json::Number, path: &str) -> Result<Node, ParseError> {
    if let Some(i) = number.as_i64() {
        return Ok(Node::Int(i));
    }
    let f = number
        .as_f64()
        .ok_or_else(|| ParseError::invalid(format!("unsupported number: {number}"), path))?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 && (f as i64) as f64 == f {
        Ok(Node::Int(f as i64))
    } else {
        Ok(Node::Float(f))
    }
}

fn parse_object(obj: &Map<String, Value>, path: &str, depth: usize) -> Result<Node, ParseError> {
    if obj.len() != 1 {
        return Err(ParseError::SingleKey {
            found: obj.len(),
            path: path.into(),
        });
    }
    let (operator, value) = obj.iter().next().expect("single-key object");

    // The reserved "query" operator embeds a subquery: its value is a
    // query object, not an argument list.
    if operator == QUERY_OPERATOR {
        let query_path = format!("{path}.{QUERY_OPERATOR}");
        let query_obj = value.as_object().ok_or_else(|| {
            ParseError::invalid("query operator expects a query object", &query_path)
        })?;
        let query = parse_query_object(query_obj, &query_path, depth + 1)?;
        return Ok(Node::Operation(Operation::new(
            operator.clone(),
            vec![Node::Query(Box::new(query))],
        )));
    }

    // An array value is the argument list; a single value becomes a
    // one-element argument list.
    let args = match parse_value(value, &format!("{path}.{operator}"), depth + 1)? {
        Node::Array(items) => items,
        node => vec![node],
    };
    Ok(Node::Operation(Operation::new(operator.clone(), args)))
}

/// Parse a JSON object that represents a query.
///
/// Used for both top-level queries and nested subqueries.
fn parse_query_object(
    obj: &Map<String, Value>,
    path: &str,
    depth: usize,
) -> Result<Query, ParseError> {
    if depth > MAX_DEPTH {
        return Err(ParseError::TooDeep {
            max: MAX_DEPTH,
            path: path.into(),
        });
    }

    let target_value = obj.get("target").ok_or(ParseError::MissingField {
        field: "target",
        path: path.into(),
    })?;
    let target_str = target_value
        .as_str()
        .ok_or_else(|| ParseError::invalid("'target' must be a string", format!("{path}.target")))?;
    let target = target_str
        .parse::<EntityKind>()
        .map_err(|_| ParseError::UnknownTarget {
            target: target_str.into(),
            valid: EntityKind::ALL.map(|k| k.as_str()).join(", "),
            path: format!("{path}.target"),
        })?;

    let where_value = obj.get("where").ok_or(ParseError::MissingField {
        field: "where",
        path: path.into(),
    })?;
    let where_ = parse_value(where_value, &format!("{path}.where"), depth + 1)?;

    let alias = obj
        .get("alias")
        .map(|value| {
            value
                .as_str()
                .map(str::to_owned)
                .ok_or_else(|| ParseError::invalid("'alias' must be a string", format!("{path}.alias")))
        })
        .transpose()?;

    let result = obj
        .get("result")
        .map(|value| parse_value(value, &format!("{path}.result"), depth + 1))
        .transpose()?;

    let order_by = obj
        .get("orderBy")
        .map(|value| {
            // A single clause is accepted as shorthand for a one-element list.
            let clauses: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            clauses
                .iter()
                .enumerate()
                .map(|(i, clause)| parse_order_clause(clause, &format!("{path}.orderBy[{i}]")))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let limit = obj
        .get("limit")
        .map(|value| {
            value
                .as_i64()
                .ok_or_else(|| ParseError::invalid("'limit' must be an integer", format!("{path}.limit")))
        })
        .transpose()?;

    Ok(Query {
        target,
        where_,
        alias,
        result,
        order_by,
        limit,
    })
}

fn parse_order_clause(value: &Value, path: &str) -> Result<OrderClause, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::invalid("order clause must be an object", path))?;

    // Builder UIs emit either "field" or "prop" for the property name.
    let field = obj
        .get("field")
        .and_then(Value::as_str)
        .or_else(|| obj.get("prop").and_then(Value::as_str))
        .ok_or_else(|| {
            ParseError::invalid("order clause must have a 'field' or 'prop' string", path)
        })?;

    // "desc": true is shorthand for "direction": "Desc".
    let direction = if obj.get("desc").and_then(Value::as_bool) == Some(true) {
        OrderDirection::Desc
    } else if let Some(dir_value) = obj.get("direction") {
        let dir_str = dir_value.as_str().ok_or_else(|| {
            ParseError::invalid("'direction' must be a string", format!("{path}.direction"))
        })?;
        match dir_str {
            "Asc" => OrderDirection::Asc,
            "Desc" => OrderDirection::Desc,
            other => {
                return Err(ParseError::invalid(
                    format!("invalid direction '{other}'; must be 'Asc' or 'Desc'"),
                    format!("{path}.direction"),
                ))
            }
        }
    } else {
        OrderDirection::Asc
    };

    Ok(OrderClause {
        field: field.to_owned(),
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Primitive parsing ====================

    #[test]
    fn test_parse_string_primitive() {
        assert_eq!(parse("\"hello\"").unwrap(), Node::String("hello".into()));
    }

    #[test]
    fn test_parse_integer_number() {
        assert_eq!(parse("42").unwrap(), Node::Int(42));
    }

    #[test]
    fn test_parse_floating_point_number() {
        match parse("3.14").unwrap() {
            Node::Float(f) => assert!((f - 3.14).abs() < 0.001),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_whole_float_as_integer() {
        assert_eq!(parse("42.0").unwrap(), Node::Int(42));
    }

    #[test]
    fn test_parse_negative_number() {
        assert_eq!(parse("-10").unwrap(), Node::Int(-10));
    }

    #[test]
    fn test_parse_booleans_and_null() {
        assert_eq!(parse("true").unwrap(), Node::Bool(true));
        assert_eq!(parse("false").unwrap(), Node::Bool(false));
        assert_eq!(parse("null").unwrap(), Node::Null);
    }

    // ==================== Array parsing ====================

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(parse("[]").unwrap(), Node::Array(vec![]));
    }

    #[test]
    fn test_parse_array_with_primitives() {
        let node = parse(r#"[1, "two", true, null]"#).unwrap();
        assert_eq!(
            node,
            Node::Array(vec![
                Node::Int(1),
                Node::String("two".into()),
                Node::Bool(true),
                Node::Null,
            ])
        );
    }

    #[test]
    fn test_parse_nested_arrays() {
        let node = parse("[[1, 2], [3, 4]]").unwrap();
        match node {
            Node::Array(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], Node::Array(_)));
                assert!(matches!(items[1], Node::Array(_)));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    // ==================== Operation parsing ====================

    #[test]
    fn test_parse_operation_with_single_argument() {
        let node = parse(r#"{ "field": "example" }"#).unwrap();
        assert_eq!(
            node,
            Node::Operation(Operation::new(
                "field",
                vec![Node::String("example".into())]
            ))
        );
    }

    #[test]
    fn test_parse_operation_with_array_arguments() {
        let node = parse(r#"{ "==": [1, 2] }"#).unwrap();
        assert_eq!(
            node,
            Node::Operation(Operation::new("==", vec![Node::Int(1), Node::Int(2)]))
        );
    }

    #[test]
    fn test_parse_nested_operations() {
        let node = parse(r#"{ "and": [{ "==": [1, 1] }, { "!=": [2, 3] }] }"#).unwrap();
        let Node::Operation(op) = node else {
            panic!("expected operation");
        };
        assert_eq!(op.operator, "and");
        assert_eq!(op.args.len(), 2);
        assert!(matches!(&op.args[0], Node::Operation(inner) if inner.operator == "=="));
        assert!(matches!(&op.args[1], Node::Operation(inner) if inner.operator == "!="));
    }

    #[test]
    fn test_parse_field_access_with_context() {
        // The array value becomes the argument list directly, so
        // { "field": ["example", "changes"] } is field("example", "changes").
        let node = parse(r#"{ "field": ["example", "changes"] }"#).unwrap();
        assert_eq!(
            node,
            Node::Operation(Operation::new(
                "field",
                vec![Node::String("example".into()), Node::String("changes".into())]
            ))
        );
    }

    #[test]
    fn test_parse_complex_expression() {
        let json = r#"
        {
            "and": [
                { "contains": [
                    { "field": ["example", "changes"] },
                    { "field": ["kanji", "original"] }
                ]},
                { ">=": [
                    { "len": { "field": ["example", "changes"] } },
                    { "+": [
                        { "len": { "field": ["kanji", "original"] } },
                        4
                    ]}
                ]}
            ]
        }
        "#;
        let Node::Operation(op) = parse(json).unwrap() else {
            panic!("expected operation");
        };
        assert_eq!(op.operator, "and");
        assert_eq!(op.args.len(), 2);
    }

    // ==================== Error cases ====================

    #[test]
    fn test_fail_on_invalid_json() {
        let err = parse("{ invalid json }").unwrap_err();
        assert!(matches!(err, ParseError::Json { .. }));
        assert_eq!(err.path(), "$");
    }

    #[test]
    fn test_fail_on_object_with_multiple_keys() {
        let err = parse(r#"{ "a": 1, "b": 2 }"#).unwrap_err();
        assert!(err.to_string().contains("exactly one key"));
    }

    #[test]
    fn test_fail_on_empty_object() {
        let err = parse("{}").unwrap_err();
        assert!(err.to_string().contains("exactly one key"));
    }

    #[test]
    fn test_fail_on_excessive_nesting() {
        let mut json = String::new();
        for _ in 0..(MAX_DEPTH + 2) {
            json.push_str(r#"{"not":"#);
        }
        json.push_str("true");
        for _ in 0..(MAX_DEPTH + 2) {
            json.push('}');
        }
        let err = parse(&json).unwrap_err();
        assert!(matches!(err, ParseError::TooDeep { .. }));
    }

    #[test]
    fn test_error_path_points_at_offending_node() {
        let err = parse(r#"{ "and": [{ "==": [1, 1] }, { "a": 1, "b": 2 }] }"#).unwrap_err();
        assert_eq!(err.path(), "$.and[1]");
    }

    // ==================== Query parsing ====================

    #[test]
    fn test_parse_minimal_query() {
        let query = parse_query(r#"{ "target": "Note", "where": { "==": [1, 1] } }"#).unwrap();
        assert_eq!(query.target, EntityKind::Note);
        assert!(matches!(query.where_, Node::Operation(_)));
        assert_eq!(query.alias, None);
        assert_eq!(query.result, None);
        assert_eq!(query.order_by, None);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_parse_query_with_alias() {
        let query =
            parse_query(r#"{ "target": "Note", "alias": "n", "where": { "==": [1, 1] } }"#)
                .unwrap();
        assert_eq!(query.alias.as_deref(), Some("n"));
    }

    #[test]
    fn test_parse_query_with_result() {
        let query = parse_query(
            r#"{ "target": "Suggestion", "where": { "==": [1, 1] }, "result": { "prop": "status" } }"#,
        )
        .unwrap();
        assert_eq!(query.target, EntityKind::Suggestion);
        let Some(Node::Operation(result)) = query.result else {
            panic!("expected result operation");
        };
        assert_eq!(result.operator, "prop");
    }

    #[test]
    fn test_parse_full_query() {
        let query = parse_query(
            r#"{
                "target": "Suggestion",
                "alias": "s",
                "where": { "isEmpty": { "field": "example" } },
                "result": { "prop": "status" },
                "orderBy": [
                    { "field": "createdAt", "direction": "Desc" },
                    { "field": "id" }
                ],
                "limit": 50
            }"#,
        )
        .unwrap();
        assert_eq!(query.target, EntityKind::Suggestion);
        assert_eq!(query.alias.as_deref(), Some("s"));
        let order_by = query.order_by.unwrap();
        assert_eq!(order_by.len(), 2);
        assert_eq!(order_by[0].field, "createdAt");
        assert_eq!(order_by[0].direction, OrderDirection::Desc);
        assert_eq!(order_by[1].field, "id");
        assert_eq!(order_by[1].direction, OrderDirection::Asc);
        assert_eq!(query.limit, Some(50));
    }

    #[test]
    fn test_parse_query_other_targets() {
        let history = parse_query(
            r#"{ "target": "HistoryEntry", "where": { "==": [{ "prop": "action" }, "accepted"] } }"#,
        )
        .unwrap();
        assert_eq!(history.target, EntityKind::HistoryEntry);

        let session = parse_query(
            r#"{ "target": "Session", "where": { "==": [{ "prop": "status" }, "completed"] } }"#,
        )
        .unwrap();
        assert_eq!(session.target, EntityKind::Session);
    }

    #[test]
    fn test_parse_order_by_desc_shorthand() {
        let query = parse_query(
            r#"{ "target": "Note", "where": { "==": [1, 1] }, "orderBy": [{ "prop": "createdAt", "desc": true }] }"#,
        )
        .unwrap();
        assert_eq!(query.order_by.unwrap()[0].direction, OrderDirection::Desc);
    }

    #[test]
    fn test_parse_order_by_single_clause_shorthand() {
        let query = parse_query(
            r#"{ "target": "Note", "where": { "==": [1, 1] }, "orderBy": { "field": "mod" } }"#,
        )
        .unwrap();
        let order_by = query.order_by.unwrap();
        assert_eq!(order_by.len(), 1);
        assert_eq!(order_by[0].field, "mod");
    }

    #[test]
    fn test_fail_on_missing_target() {
        let err = parse_query(r#"{ "where": { "==": [1, 1] } }"#).unwrap_err();
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_fail_on_missing_where() {
        let err = parse_query(r#"{ "target": "Note" }"#).unwrap_err();
        assert!(err.to_string().contains("where"));
    }

    #[test]
    fn test_fail_on_invalid_target() {
        let err = parse_query(r#"{ "target": "InvalidType", "where": {} }"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("invalid target"));
        assert!(message.contains("Note, Suggestion, HistoryEntry, Session"));
    }

    #[test]
    fn test_fail_on_invalid_order_direction() {
        let err = parse_query(
            r#"{ "target": "Note", "where": { "==": [1, 1] }, "orderBy": [{ "field": "id", "direction": "Invalid" }] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid direction"));
    }

    #[test]
    fn test_fail_on_non_integer_limit() {
        let err = parse_query(
            r#"{ "target": "Note", "where": { "==": [1, 1] }, "limit": 1.5 }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    // ==================== Nested query parsing ====================

    #[test]
    fn test_parse_query_with_nested_subquery() {
        let query = parse_query(
            r#"{
                "target": "Note",
                "alias": "n",
                "where": { "exists": { "query": {
                    "target": "Suggestion",
                    "where": { "==": [{ "prop": "noteId" }, { "ref": ["n", "id"] }] }
                }}}
            }"#,
        )
        .unwrap();
        assert_eq!(query.target, EntityKind::Note);
        assert_eq!(query.alias.as_deref(), Some("n"));

        let Node::Operation(exists) = &query.where_ else {
            panic!("expected operation");
        };
        assert_eq!(exists.operator, "exists");
        let Node::Operation(query_op) = &exists.args[0] else {
            panic!("expected query operation");
        };
        assert_eq!(query_op.operator, QUERY_OPERATOR);
        let Node::Query(inner) = &query_op.args[0] else {
            panic!("expected nested query");
        };
        assert_eq!(inner.target, EntityKind::Suggestion);
    }

    #[test]
    fn test_fail_on_query_operator_without_object() {
        let err = parse(r#"{ "query": [1, 2] }"#).unwrap_err();
        assert!(err.to_string().contains("query object"));
        assert_eq!(err.path(), "$.query");
    }

    #[test]
    fn test_parse_scalar_subquery() {
        let query = parse_query(
            r#"{
                "target": "Note",
                "alias": "n",
                "where": { "==": [
                    { "query": {
                        "target": "Suggestion",
                        "where": { "==": [{ "prop": "noteId" }, { "ref": ["n", "id"] }] },
                        "result": { "prop": "status" },
                        "orderBy": [{ "prop": "createdAt", "desc": true }],
                        "limit": 1
                    }},
                    "accepted"
                ]}
            }"#,
        )
        .unwrap();
        let Node::Operation(eq) = &query.where_ else {
            panic!("expected operation");
        };
        let Node::Operation(query_op) = &eq.args[0] else {
            panic!("expected query operation");
        };
        let Node::Query(inner) = &query_op.args[0] else {
            panic!("expected nested query");
        };
        assert!(inner.result.is_some());
        assert_eq!(inner.limit, Some(1));
    }
}
