//! Subquery operators (query, exists)
//!
//! Related entities are reached through correlated subqueries rather
//! than JOINs, so the outer result set never fans out. `query` compiles
//! an embedded query object into a scalar subquery; `exists` wraps one
//! in an `EXISTS (…)` predicate.

use sel_ast::{Node, QUERY_OPERATOR};

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::fragment::SqlFragment;

use super::{Category, Operator, OperatorMetadata, SelType, Signature};

/// Scalar subquery over a related entity.
pub struct QueryOperator {
    metadata: OperatorMetadata,
}

impl QueryOperator {
    pub fn new() -> Self {
        Self {
            metadata: OperatorMetadata {
                display_name: "Subquery",
                category: Category::Internal,
                description: "Evaluate a nested query against a related entity",
                signature: Signature::unary(SelType::Any, SelType::Any),
            },
        }
    }
}

impl Operator for QueryOperator {
    fn key(&self) -> &str {
        QUERY_OPERATOR
    }

    fn metadata(&self) -> &OperatorMetadata {
        &self.metadata
    }

    fn to_sql(
        &self,
        evaluator: &Evaluator,
        args: &[Node],
        context: &SqlContext,
        path: &str,
    ) -> Result<SqlFragment, CompileError> {
        let Node::Query(query) = &args[0] else {
            return Err(CompileError::invalid(
                "'query' expects a query object",
                path,
            ));
        };
        evaluator.subquery(query, context, path)
    }
}

/// `EXISTS (…)` over a subquery.
pub struct ExistsOperator {
    metadata: OperatorMetadata,
}

impl ExistsOperator {
    pub fn new() -> Self {
        Self {
            metadata: OperatorMetadata {
                display_name: "Exists",
                category: Category::Internal,
                description: "True when a nested query matches at least one row",
                signature: Signature::unary(SelType::Any, SelType::Boolean),
            },
        }
    }
}

impl Operator for ExistsOperator {
    fn key(&self) -> &str {
        "exists"
    }

    fn metadata(&self) -> &OperatorMetadata {
        &self.metadata
    }

    fn to_sql(
        &self,
        evaluator: &Evaluator,
        args: &[Node],
        context: &SqlContext,
        path: &str,
    ) -> Result<SqlFragment, CompileError> {
        let inner = match &args[0] {
            Node::Query(query) => evaluator.subquery(query, context, path)?,
            Node::Operation(op) if op.operator == QUERY_OPERATOR => {
                evaluator.eval(&args[0], context, path, 0)?
            }
            _ => {
                return Err(CompileError::invalid(
                    "'exists' expects a query argument",
                    path,
                ));
            }
        };
        Ok(SqlFragment::new(
            format!("EXISTS {}", inner.sql),
            inner.params,
        ))
    }
}
