//! Predicate operators (isNull, isNotNull, isEmpty, isNotEmpty)

use sel_ast::Node;

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::fragment::SqlFragment;

use super::{Category, Operator, OperatorMetadata, SelType, Signature};

/// `IS NULL` / `IS NOT NULL` checks.
pub struct NullCheckOperator {
    key: &'static str,
    expect_null: bool,
    metadata: OperatorMetadata,
}

impl NullCheckOperator {
    fn new(
        key: &'static str,
        expect_null: bool,
        display_name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            expect_null,
            metadata: OperatorMetadata {
                display_name,
                category: Category::Predicate,
                description,
                signature: Signature::unary(SelType::Any, SelType::Boolean),
            },
        }
    }

    pub fn all() -> Vec<NullCheckOperator> {
        vec![
            Self::new("isNull", true, "Is null", "Value is missing"),
            Self::new("isNotNull", false, "Is not null", "Value is present"),
        ]
    }
}

impl Operator for NullCheckOperator {
    fn key(&self) -> &str {
        self.key
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
        let inner = evaluator.eval(&args[0], context, path, 0)?;
        let sql_op = if self.expect_null { "IS NULL" } else { "IS NOT NULL" };
        Ok(SqlFragment::new(
            format!("({} {})", inner.sql, sql_op),
            inner.params,
        ))
    }
}

/// Empty-string checks, treating NULL as empty.
///
/// Rendered through COALESCE so the operand appears (and its parameters
/// bind) exactly once, which matters when the operand is a scalar
/// subquery.
pub struct EmptyCheckOperator {
    key: &'static str,
    expect_empty: bool,
    metadata: OperatorMetadata,
}

impl EmptyCheckOperator {
    fn new(
        key: &'static str,
        expect_empty: bool,
        display_name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            expect_empty,
            metadata: OperatorMetadata {
                display_name,
                category: Category::Predicate,
                description,
                signature: Signature::unary(SelType::String, SelType::Boolean),
            },
        }
    }

    pub fn all() -> Vec<EmptyCheckOperator> {
        vec![
            Self::new("isEmpty", true, "Is empty", "Text is missing or blank"),
            Self::new("isNotEmpty", false, "Is not empty", "Text has content"),
        ]
    }
}

impl Operator for EmptyCheckOperator {
    fn key(&self) -> &str {
        self.key
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
        let inner = evaluator.eval(&args[0], context, path, 0)?;
        let sql_op = if self.expect_empty { "=" } else { "<>" };
        Ok(SqlFragment::new(
            format!("(COALESCE({}, '') {} '')", inner.sql, sql_op),
            inner.params,
        ))
    }
}
