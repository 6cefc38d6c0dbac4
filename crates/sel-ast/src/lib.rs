//! SEL AST - parser and AST types
//!
//! SEL (Structured Expression Language) is a JSON-encoded query DSL.
//! This crate holds the AST node types and the parser that turns an
//! untrusted JSON document into a validated [`Node`]/[`Query`] tree,
//! tagging every error with the JSON path where validation failed.

pub mod ast;
pub mod parser;

pub use ast::{
    EntityKind, Node, Operation, OrderClause, OrderDirection, Query, QUERY_OPERATOR,
};
pub use parser::{parse, parse_query, ParseError, MAX_DEPTH};
