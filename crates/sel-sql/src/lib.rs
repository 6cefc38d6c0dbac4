//! SQL generation for SEL queries
//!
//! Compiles parsed SEL queries into parameterized SQL. The pipeline is
//! registry-driven: an [`EntityRegistry`](sel_schema::EntityRegistry)
//! maps entities to tables and columns, an [`OperatorRegistry`] maps
//! operator keys to SQL generators, and the [`Evaluator`] walks the AST
//! threading a scope [`SqlContext`] so nested subqueries can correlate
//! back to ancestor rows.
//!
//! ```
//! use sel_schema::EntityRegistry;
//! use sel_sql::{Evaluator, OperatorRegistry};
//!
//! let entities = EntityRegistry::new();
//! let operators = OperatorRegistry::new();
//! let evaluator = Evaluator::new(&entities, &operators);
//!
//! let query = sel_ast::parse_query(r#"{
//!     "target": "Note",
//!     "where": {"isEmpty": {"field": "Example"}}
//! }"#).unwrap();
//! let compiled = evaluator.compile(&query).unwrap();
//! assert_eq!(compiled.params.len(), 1);
//! ```

mod context;
mod error;
mod eval;
mod fragment;
mod ops;

pub use context::{ScopeInfo, SqlContext};
pub use error::CompileError;
pub use eval::Evaluator;
pub use fragment::{SqlFragment, SqlQuery, SqlValue};
pub use ops::{
    Category, Operator, OperatorMetadata, OperatorRegistry, SelType, Signature,
};
