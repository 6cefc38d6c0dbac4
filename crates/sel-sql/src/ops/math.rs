//! Math operators: arithmetic (+, -, *, /, %) and aggregates
//! (count, avg, min, max)
//!
//! Aggregates are meaningful inside a subquery's `result` expression,
//! e.g. counting a note's suggestions.

use sel_ast::Node;

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::fragment::SqlFragment;

use super::{Category, Operator, OperatorMetadata, SelType, Signature};

/// Variadic arithmetic rendered as `((a) OP (b) OP …)`.
///
/// `+`, `-` and `*` accept a single operand, treated as having an
/// implicit leading identity element (0 for addition/subtraction, 1 for
/// multiplication), so `{"-": x}` is unary negation.
pub struct ArithmeticOperator {
    key: &'static str,
    sql_operator: &'static str,
    default_first: Option<i64>,
    metadata: OperatorMetadata,
}

impl ArithmeticOperator {
    fn new(
        key: &'static str,
        sql_operator: &'static str,
        display_name: &'static str,
        description: &'static str,
        default_first: Option<i64>,
        max_args: Option<usize>,
    ) -> Self {
        let min_args = if default_first.is_some() { 1 } else { 2 };
        Self {
            key,
            sql_operator,
            default_first,
            metadata: OperatorMetadata {
                display_name,
                category: Category::Math,
                description,
                signature: Signature {
                    min_args,
                    max_args,
                    arg_types: vec![SelType::Number],
                    return_type: SelType::Number,
                },
            },
        }
    }

    pub fn all() -> Vec<ArithmeticOperator> {
        vec![
            Self::new("+", "+", "Add", "Add numbers together", Some(0), None),
            Self::new("-", "-", "Subtract", "Subtract numbers", Some(0), None),
            Self::new("*", "*", "Multiply", "Multiply numbers together", Some(1), None),
            Self::new("/", "/", "Divide", "Divide the first number by the second", None, Some(2)),
            Self::new("%", "%", "Modulo", "Remainder of a division", None, Some(2)),
        ]
    }
}

impl Operator for ArithmeticOperator {
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
        let mut fragments = evaluator.eval_all(args, context, path)?;
        if fragments.len() == 1 {
            if let Some(default) = self.default_first {
                fragments.insert(0, SqlFragment::bind(default));
            }
        }
        let combined = fragments
            .iter()
            .map(|f| format!("({})", f.sql))
            .collect::<Vec<_>>()
            .join(&format!(" {} ", self.sql_operator));
        let params = fragments.into_iter().flat_map(|f| f.params).collect();
        Ok(SqlFragment::new(format!("({combined})"), params))
    }
}

/// SQL aggregate function call.
pub struct AggregateOperator {
    key: &'static str,
    sql_function: &'static str,
    metadata: OperatorMetadata,
}

impl AggregateOperator {
    fn new(
        key: &'static str,
        sql_function: &'static str,
        display_name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            sql_function,
            metadata: OperatorMetadata {
                display_name,
                category: Category::Aggregate,
                description,
                signature: Signature::unary(SelType::Any, SelType::Number),
            },
        }
    }

    pub fn all() -> Vec<AggregateOperator> {
        vec![
            Self::new("count", "COUNT", "Count", "Count the number of values"),
            Self::new("avg", "AVG", "Average", "Average of the values"),
            Self::new("min", "MIN", "Minimum", "Smallest of the values"),
            Self::new("max", "MAX", "Maximum", "Largest of the values"),
        ]
    }
}

impl Operator for AggregateOperator {
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
        Ok(SqlFragment::new(
            format!("{}({})", self.sql_function, inner.sql),
            inner.params,
        ))
    }
}
