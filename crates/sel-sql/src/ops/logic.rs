//! Logical operators (and, or, not)

use sel_ast::Node;

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::fragment::SqlFragment;

use super::{Category, Operator, OperatorMetadata, SelType, Signature};

/// Variadic logical combinator rendered as `(a AND b AND …)`.
pub struct LogicOperator {
    key: &'static str,
    sql_operator: &'static str,
    metadata: OperatorMetadata,
}

impl LogicOperator {
    fn new(
        key: &'static str,
        sql_operator: &'static str,
        display_name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            sql_operator,
            metadata: OperatorMetadata {
                display_name,
                category: Category::Logic,
                description,
                signature: Signature::variadic(SelType::Boolean, SelType::Boolean, 1),
            },
        }
    }

    pub fn all() -> Vec<LogicOperator> {
        vec![
            Self::new("and", "AND", "All of", "True when every condition holds"),
            Self::new("or", "OR", "Any of", "True when at least one condition holds"),
        ]
    }
}

impl Operator for LogicOperator {
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
        let fragments = evaluator.eval_all(args, context, path)?;
        let combined = fragments
            .iter()
            .map(|f| f.sql.as_str())
            .collect::<Vec<_>>()
            .join(&format!(" {} ", self.sql_operator));
        let params = fragments.into_iter().flat_map(|f| f.params).collect();
        Ok(SqlFragment::new(format!("({combined})"), params))
    }
}

/// Logical negation rendered as `NOT (x)`.
pub struct NotOperator {
    metadata: OperatorMetadata,
}

impl NotOperator {
    pub fn new() -> Self {
        Self {
            metadata: OperatorMetadata {
                display_name: "Not",
                category: Category::Logic,
                description: "Negate a condition",
                signature: Signature::unary(SelType::Boolean, SelType::Boolean),
            },
        }
    }
}

impl Operator for NotOperator {
    fn key(&self) -> &str {
        "not"
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
        Ok(SqlFragment::new(format!("NOT ({})", inner.sql), inner.params))
    }
}
