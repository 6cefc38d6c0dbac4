//! AST types for SEL
//!
//! SEL expressions are JSON documents where every operation is an object
//! with exactly one key (the operator) and its arguments as the value.
//! The types here form a closed tagged union over everything a parsed
//! expression can contain: primitives, arrays, operations and queries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// The reserved operator key that embeds a subquery inside an expression.
pub const QUERY_OPERATOR: &str = "query";

/// The kind of entity a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Note,
    Suggestion,
    HistoryEntry,
    Session,
}

impl EntityKind {
    /// All entity kinds, in declaration order. Used for error messages
    /// listing the valid targets.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Note,
        EntityKind::Suggestion,
        EntityKind::HistoryEntry,
        EntityKind::Session,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Note => "Note",
            EntityKind::Suggestion => "Suggestion",
            EntityKind::HistoryEntry => "HistoryEntry",
            EntityKind::Session => "Session",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Note" => Ok(EntityKind::Note),
            "Suggestion" => Ok(EntityKind::Suggestion),
            "HistoryEntry" => Ok(EntityKind::HistoryEntry),
            "Session" => Ok(EntityKind::Session),
            _ => Err(()),
        }
    }
}

/// A parsed SEL expression node.
///
/// Numbers keep the integer/float distinction from the source JSON:
/// a whole number parses as `Int` and serializes without a decimal
/// point, so `parse(to_json(x))` reconstructs `x` field-for-field.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    Operation(Operation),
    Query(Box<Query>),
}

/// An operation: an operator key plus its argument list.
///
/// In JSON this is a single-key object. A lone non-array argument is
/// written unwrapped (`{"isEmpty": {"field": "example"}}`); multiple
/// arguments as an array (`{"==": [1, 2]}`).
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub args: Vec<Node>,
}

/// Root query object for SEL.
///
/// A complete query specifies the entity to search (`target`), the
/// filter condition (`where_`), and optionally a scope alias for
/// descendant subqueries, a `result` expression (what a subquery
/// returns; absent means an existence probe), ordering and a limit.
///
/// `Query` is itself a [`Node`] variant so it can be nested inside the
/// reserved `"query"` operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub target: EntityKind,
    pub where_: Node,
    pub alias: Option<String>,
    pub result: Option<Node>,
    pub order_by: Option<Vec<OrderClause>>,
    pub limit: Option<i64>,
}

/// Defines ordering for query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderClause {
    pub field: String,
    pub direction: OrderDirection,
}

/// Ordering direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl Node {
    /// Serialize to the canonical single-key-object JSON form.
    ///
    /// An operation with exactly one non-array argument is written
    /// unwrapped; a lone array argument stays wrapped in the argument
    /// list so re-parsing does not split it into separate arguments.
    pub fn to_json(&self) -> Value {
        match self {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Int(i) => Value::from(*i),
            Node::Float(f) => Value::from(*f),
            Node::String(s) => Value::String(s.clone()),
            Node::Array(items) => Value::Array(items.iter().map(Node::to_json).collect()),
            Node::Operation(op) => op.to_json(),
            Node::Query(query) => query.to_json(),
        }
    }
}

impl Operation {
    pub fn new(operator: impl Into<String>, args: Vec<Node>) -> Self {
        Self {
            operator: operator.into(),
            args,
        }
    }

    pub fn to_json(&self) -> Value {
        let value = match self.args.as_slice() {
            [single] if !matches!(single, Node::Array(_)) => single.to_json(),
            args => Value::Array(args.iter().map(Node::to_json).collect()),
        };
        let mut obj = Map::new();
        obj.insert(self.operator.clone(), value);
        Value::Object(obj)
    }
}

impl Query {
    /// Serialize to the canonical query-object JSON form.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("target".into(), Value::String(self.target.to_string()));
        obj.insert("where".into(), self.where_.to_json());
        if let Some(alias) = &self.alias {
            obj.insert("alias".into(), Value::String(alias.clone()));
        }
        if let Some(result) = &self.result {
            obj.insert("result".into(), result.to_json());
        }
        if let Some(order_by) = &self.order_by {
            let clauses = order_by
                .iter()
                .map(|clause| serde_json::to_value(clause).expect("order clause serializes"))
                .collect();
            obj.insert("orderBy".into(), Value::Array(clauses));
        }
        if let Some(limit) = self.limit {
            obj.insert("limit".into(), Value::from(limit));
        }
        Value::Object(obj)
    }

    /// SHA-256 fingerprint of the canonical JSON form.
    ///
    /// Used by the preset store to deduplicate saved queries.
    pub fn fingerprint(&self) -> String {
        let json = self.to_json().to_string();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn test_entity_kind_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>(), Ok(kind));
        }
        assert!("Deck".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_operation_to_json_unwraps_single_argument() {
        let op = Node::Operation(Operation::new(
            "isEmpty",
            vec![Node::Operation(Operation::new(
                "field",
                vec![Node::String("example".into())],
            ))],
        ));
        assert_eq!(
            op.to_json().to_string(),
            r#"{"isEmpty":{"field":"example"}}"#
        );
    }

    #[test]
    fn test_operation_to_json_keeps_lone_array_wrapped() {
        // A single array argument must stay inside the argument list,
        // otherwise re-parsing would split its elements into arguments.
        let op = Node::Operation(Operation::new(
            "in",
            vec![Node::Array(vec![Node::Int(1), Node::Int(2)])],
        ));
        assert_eq!(op.to_json().to_string(), r#"{"in":[[1,2]]}"#);
        let reparsed = parser::parse(&op.to_json().to_string()).unwrap();
        assert_eq!(reparsed, op);
    }

    #[test]
    fn test_int_serializes_without_decimal_point() {
        assert_eq!(Node::Int(42).to_json().to_string(), "42");
        assert_eq!(Node::Float(3.14).to_json().to_string(), "3.14");
    }

    #[test]
    fn test_node_round_trip() {
        let node = Node::Operation(Operation::new(
            "and",
            vec![
                Node::Operation(Operation::new(
                    "==",
                    vec![
                        Node::Operation(Operation::new(
                            "prop",
                            vec![Node::String("status".into())],
                        )),
                        Node::String("pending".into()),
                    ],
                )),
                Node::Operation(Operation::new(
                    ">=",
                    vec![Node::Int(3), Node::Float(2.5)],
                )),
                Node::Array(vec![Node::Null, Node::Bool(true)]),
            ],
        ));
        let reparsed = parser::parse(&node.to_json().to_string()).unwrap();
        assert_eq!(reparsed, node);
    }

    #[test]
    fn test_query_round_trip() {
        let json = r#"{
            "target": "Note",
            "alias": "n",
            "where": { "exists": { "query": {
                "target": "Suggestion",
                "where": { "==": [{ "prop": "noteId" }, { "ref": ["n", "id"] }] },
                "result": { "prop": "status" },
                "orderBy": [{ "field": "createdAt", "direction": "Desc" }],
                "limit": 1
            }}},
            "orderBy": [{ "field": "mod", "direction": "Desc" }],
            "limit": 100
        }"#;
        let query = parser::parse_query(json).unwrap();
        let reparsed = parser::parse_query(&query.to_json().to_string()).unwrap();
        assert_eq!(reparsed, query);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let query = parser::parse_query(
            r#"{ "target": "Note", "where": { "isEmpty": { "field": "example" } } }"#,
        )
        .unwrap();
        assert_eq!(query.fingerprint(), query.clone().fingerprint());
        assert_eq!(query.fingerprint().len(), 64);

        let other = parser::parse_query(
            r#"{ "target": "Note", "where": { "isEmpty": { "field": "reading" } } }"#,
        )
        .unwrap();
        assert_ne!(query.fingerprint(), other.fingerprint());
    }
}
