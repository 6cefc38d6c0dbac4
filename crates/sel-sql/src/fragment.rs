//! Parameterized SQL fragments
//!
//! Compilation produces SQL text with positional `?` placeholders plus
//! the ordered values bound to them. Fragments concatenate with `+`,
//! keeping parameters aligned with their placeholders.

use serde::Serialize;
use std::ops::Add;

/// A value bound to a `?` placeholder.
///
/// Booleans are bound as integer 0/1 before reaching this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_owned())
    }
}

/// A piece of generated SQL and the parameters its placeholders bind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A fragment with no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// A single `?` placeholder bound to `value`.
    pub fn bind(value: impl Into<SqlValue>) -> Self {
        Self::new("?", vec![value.into()])
    }
}

impl Add for SqlFragment {
    type Output = SqlFragment;

    fn add(mut self, other: SqlFragment) -> SqlFragment {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
        self
    }
}

/// The compiled top-level query: SQL text plus its ordered parameters.
///
/// `params` appear in exactly the left-to-right order their `?`
/// placeholders occur in `sql`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}
