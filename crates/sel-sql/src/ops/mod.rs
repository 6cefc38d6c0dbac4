//! Operator registry and built-in operators
//!
//! Every SEL operator exposes a key, a metadata block (display
//! information for the query-builder UI plus the argument signature)
//! and a SQL-generation function. Operators receive their raw argument
//! nodes and decide how to evaluate them, which is how `query` and
//! `ref` get at unevaluated structure.

use std::collections::HashMap;

use sel_ast::Node;
use serde::Serialize;

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::fragment::SqlFragment;

mod access;
mod comparison;
mod logic;
mod math;
mod predicate;
mod strings;
mod subquery;

/// Value types in SEL expressions, used in operator signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelType {
    String,
    Number,
    Boolean,
    /// Accepts/returns any value.
    Any,
}

/// Categories of operators for UI grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Comparison,
    String,
    Logic,
    Predicate,
    Math,
    Aggregate,
    /// Not shown in the builder UI (field, prop, ref, query, exists).
    Internal,
}

/// An operator's argument signature.
#[derive(Debug, Clone, Serialize)]
pub struct Signature {
    pub min_args: usize,
    /// `None` means variadic with no upper bound.
    pub max_args: Option<usize>,
    /// Expected type per position; the last entry repeats for variadic
    /// operators.
    pub arg_types: Vec<SelType>,
    pub return_type: SelType,
}

impl Signature {
    pub fn unary(arg: SelType, ret: SelType) -> Self {
        Self {
            min_args: 1,
            max_args: Some(1),
            arg_types: vec![arg],
            return_type: ret,
        }
    }

    pub fn binary(arg: SelType, ret: SelType) -> Self {
        Self {
            min_args: 2,
            max_args: Some(2),
            arg_types: vec![arg, arg],
            return_type: ret,
        }
    }

    pub fn variadic(arg: SelType, ret: SelType, min_args: usize) -> Self {
        Self {
            min_args,
            max_args: None,
            arg_types: vec![arg],
            return_type: ret,
        }
    }

    /// Expected type at an argument position, repeating the last entry
    /// for variadic operators.
    pub fn arg_type_at(&self, index: usize) -> SelType {
        self.arg_types
            .get(index)
            .or_else(|| self.arg_types.last())
            .copied()
            .unwrap_or(SelType::Any)
    }

    fn expected_text(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => format!("exactly {max}"),
            Some(max) => format!("between {} and {max}", self.min_args),
            None => format!("at least {}", self.min_args),
        }
    }

    /// Validate an argument count against this signature.
    pub fn check_arity(
        &self,
        operator: &str,
        actual: usize,
        path: &str,
    ) -> Result<(), CompileError> {
        let too_few = actual < self.min_args;
        let too_many = self.max_args.is_some_and(|max| actual > max);
        if too_few || too_many {
            return Err(CompileError::Arity {
                operator: operator.to_owned(),
                expected: self.expected_text(),
                actual,
                path: path.to_owned(),
            });
        }
        Ok(())
    }
}

/// Display and signature metadata for an operator.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorMetadata {
    pub display_name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub signature: Signature,
}

/// A SEL operator: key, metadata and SQL generation.
pub trait Operator: Send + Sync {
    /// The operator key used in JSON (e.g. "==", "and", "field").
    fn key(&self) -> &str;

    fn metadata(&self) -> &OperatorMetadata;

    /// Generate SQL for this operator.
    ///
    /// Arity has already been validated against [`OperatorMetadata::signature`]
    /// by the evaluator; `path` points at the operation node for error
    /// reporting.
    fn to_sql(
        &self,
        evaluator: &Evaluator,
        args: &[Node],
        context: &SqlContext,
        path: &str,
    ) -> Result<SqlFragment, CompileError>;
}

/// Registry of operators, keyed by operator key.
///
/// Built once at startup with the built-in set registered; immutable
/// afterwards, so it can be shared across concurrent compiles.
pub struct OperatorRegistry {
    operators: HashMap<String, Box<dyn Operator>>,
}

impl OperatorRegistry {
    /// Build the registry with all built-in operators registered.
    pub fn new() -> Self {
        let mut registry = Self {
            operators: HashMap::new(),
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        // Field access
        self.register(Box::new(access::FieldOperator::new()));
        self.register(Box::new(access::PropOperator::new()));

        // Scope reference
        self.register(Box::new(access::RefOperator::new()));

        // Subqueries
        self.register(Box::new(subquery::QueryOperator::new()));
        self.register(Box::new(subquery::ExistsOperator::new()));

        // Comparisons
        for op in comparison::ComparisonOperator::all() {
            self.register(Box::new(op));
        }

        // Logic
        for op in logic::LogicOperator::all() {
            self.register(Box::new(op));
        }
        self.register(Box::new(logic::NotOperator::new()));

        // Strings
        for op in strings::StringMatchOperator::all() {
            self.register(Box::new(op));
        }
        self.register(Box::new(strings::LenOperator::new()));

        // Predicates
        for op in predicate::NullCheckOperator::all() {
            self.register(Box::new(op));
        }
        for op in predicate::EmptyCheckOperator::all() {
            self.register(Box::new(op));
        }

        // Math
        for op in math::ArithmeticOperator::all() {
            self.register(Box::new(op));
        }
        for op in math::AggregateOperator::all() {
            self.register(Box::new(op));
        }
    }

    /// Register an operator, replacing any existing one with the same key.
    pub fn register(&mut self, operator: Box<dyn Operator>) {
        self.operators.insert(operator.key().to_owned(), operator);
    }

    pub fn get(&self, key: &str) -> Option<&dyn Operator> {
        self.operators.get(key).map(Box::as_ref)
    }

    pub fn metadata(&self, key: &str) -> Option<&OperatorMetadata> {
        self.get(key).map(Operator::metadata)
    }

    /// All operators shown in the builder UI (everything except
    /// [`Category::Internal`]).
    pub fn user_operators(&self) -> Vec<&dyn Operator> {
        let mut ops: Vec<&dyn Operator> = self
            .operators
            .values()
            .map(Box::as_ref)
            .filter(|op| op.metadata().category != Category::Internal)
            .collect();
        ops.sort_by_key(|op| op.key().to_owned());
        ops
    }

    pub fn by_category(&self, category: Category) -> Vec<&dyn Operator> {
        let mut ops: Vec<&dyn Operator> = self
            .operators
            .values()
            .map(Box::as_ref)
            .filter(|op| op.metadata().category == category)
            .collect();
        ops.sort_by_key(|op| op.key().to_owned());
        ops
    }

    /// User operators returning `kind` (or `Any`).
    pub fn returning(&self, kind: SelType) -> Vec<&dyn Operator> {
        self.user_operators()
            .into_iter()
            .filter(|op| {
                kind == SelType::Any || {
                    let ret = op.metadata().signature.return_type;
                    ret == kind || ret == SelType::Any
                }
            })
            .collect()
    }

    /// User operators accepting `kind` (or `Any`) in some position.
    pub fn accepting(&self, kind: SelType) -> Vec<&dyn Operator> {
        self.user_operators()
            .into_iter()
            .filter(|op| {
                op.metadata()
                    .signature
                    .arg_types
                    .iter()
                    .any(|arg| *arg == kind || *arg == SelType::Any)
            })
            .collect()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
