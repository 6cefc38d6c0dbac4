//! Comparison operators (==, !=, <, <=, >, >=)

use sel_ast::Node;

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::fragment::SqlFragment;

use super::{Category, Operator, OperatorMetadata, SelType, Signature};

/// Binary comparison rendered as `(left OP right)`.
pub struct ComparisonOperator {
    key: &'static str,
    sql_operator: &'static str,
    metadata: OperatorMetadata,
}

impl ComparisonOperator {
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
                category: Category::Comparison,
                description,
                signature: Signature::binary(SelType::Any, SelType::Boolean),
            },
        }
    }

    pub fn all() -> Vec<ComparisonOperator> {
        vec![
            Self::new("==", "=", "Equals", "Check two values for equality"),
            Self::new("!=", "<>", "Not equals", "Check two values for inequality"),
            Self::new("<", "<", "Less than", "Check the first value is smaller"),
            Self::new("<=", "<=", "Less or equal", "Check the first value is not larger"),
            Self::new(">", ">", "Greater than", "Check the first value is larger"),
            Self::new(">=", ">=", "Greater or equal", "Check the first value is not smaller"),
        ]
    }
}

impl Operator for ComparisonOperator {
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
        let left = evaluator.eval(&args[0], context, path, 0)?;
        let right = evaluator.eval(&args[1], context, path, 1)?;
        let mut params = left.params;
        params.extend(right.params);
        Ok(SqlFragment::new(
            format!("({} {} {})", left.sql, self.sql_operator, right.sql),
            params,
        ))
    }
}
