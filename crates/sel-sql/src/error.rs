//! Compile-phase errors
//!
//! Raised while turning a parsed AST into SQL. Like parse errors, every
//! variant carries the JSON path of the offending node so a builder UI
//! can surface it verbatim. Compile errors are terminal: a failing
//! query is never partially compiled.

use sel_ast::EntityKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The operator key is not registered.
    #[error("unknown operator '{key}' (at {path})")]
    UnknownOperator { key: String, path: String },

    /// The argument count does not match the operator's signature.
    #[error("'{operator}' expects {expected} arguments, got {actual} (at {path})")]
    Arity {
        operator: String,
        expected: String,
        actual: usize,
        path: String,
    },

    /// A property name is not defined for the entity.
    #[error("unknown property '{property}' for entity {entity} (at {path})")]
    UnknownProperty {
        property: String,
        entity: EntityKind,
        path: String,
    },

    /// A `field` context is not valid for the entity.
    #[error("field context '{context}' is not valid for entity {entity}; valid contexts: {valid} (at {path})")]
    UnknownFieldContext {
        context: String,
        entity: EntityKind,
        valid: String,
        path: String,
    },

    /// The entity has no field_value storage.
    #[error("entity {entity} does not support field access (at {path})")]
    FieldAccessUnsupported { entity: EntityKind, path: String },

    /// An alias is already bound somewhere in the ancestor chain.
    #[error("duplicate alias '{alias}'; already used by an ancestor query (at {path})")]
    DuplicateAlias { alias: String, path: String },

    /// A `ref` named an alias no ancestor registered.
    #[error("unknown scope '{scope}'; available scopes: [{available}] (at {path})")]
    UnknownScope {
        scope: String,
        available: String,
        path: String,
    },

    #[error(transparent)]
    Schema(#[from] sel_schema::SchemaError),

    /// Any other structural violation.
    #[error("{message} (at {path})")]
    Invalid { message: String, path: String },
}

impl CompileError {
    /// The JSON path where the error occurred (`$` when the error is
    /// not tied to a specific node).
    pub fn path(&self) -> &str {
        match self {
            CompileError::UnknownOperator { path, .. }
            | CompileError::Arity { path, .. }
            | CompileError::UnknownProperty { path, .. }
            | CompileError::UnknownFieldContext { path, .. }
            | CompileError::FieldAccessUnsupported { path, .. }
            | CompileError::DuplicateAlias { path, .. }
            | CompileError::UnknownScope { path, .. }
            | CompileError::Invalid { path, .. } => path,
            CompileError::Schema(_) => "$",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>, path: impl Into<String>) -> Self {
        CompileError::Invalid {
            message: message.into(),
            path: path.into(),
        }
    }
}
