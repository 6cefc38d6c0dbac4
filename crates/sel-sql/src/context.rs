//! Scope context for SQL generation
//!
//! Compilation threads an immutable context through the AST walk. It
//! tracks the entity and table alias of the query being compiled plus
//! the named scopes introduced along the ancestor chain, which is what
//! lets a nested subquery reference an outer query's row via `ref`.

use sel_ast::{EntityKind, Query};
use sel_schema::{EntityRegistry, EntitySchema};
use std::collections::HashMap;

use crate::error::CompileError;

/// A named scope from an ancestor query.
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub entity: EntityKind,
    pub table_alias: String,
}

/// Context for compiling one query level.
#[derive(Debug, Clone)]
pub struct SqlContext {
    /// The entity being queried at this level.
    pub entity: EntityKind,
    /// The SQL alias of this level's table.
    pub table_alias: String,
    scopes: HashMap<String, ScopeInfo>,
}

impl SqlContext {
    /// Root context for a top-level query.
    ///
    /// If the query declares an alias it is registered mapped to the
    /// query itself, so the root row can be referenced by name from its
    /// own subqueries.
    pub fn root(query: &Query, schema: &EntitySchema) -> Self {
        let mut scopes = HashMap::new();
        if let Some(alias) = &query.alias {
            scopes.insert(
                alias.clone(),
                ScopeInfo {
                    entity: query.target,
                    table_alias: schema.sql_alias.to_owned(),
                },
            );
        }
        Self {
            entity: query.target,
            table_alias: schema.sql_alias.to_owned(),
            scopes,
        }
    }

    /// Context for compiling a nested subquery.
    ///
    /// If the subquery declares an alias, the current entity and table
    /// alias are registered under that name in the child's scope map;
    /// this is what lets the subquery refer back to its parent row.
    /// Re-binding a name already present anywhere in the ancestor chain
    /// is a compile error.
    pub fn child(
        &self,
        subquery: &Query,
        registry: &EntityRegistry,
        path: &str,
    ) -> Result<SqlContext, CompileError> {
        let child_schema = registry.schema(subquery.target)?;
        let mut scopes = self.scopes.clone();
        if let Some(alias) = &subquery.alias {
            if scopes.contains_key(alias) {
                return Err(CompileError::DuplicateAlias {
                    alias: alias.clone(),
                    path: format!("{path}.alias"),
                });
            }
            scopes.insert(
                alias.clone(),
                ScopeInfo {
                    entity: self.entity,
                    table_alias: self.table_alias.clone(),
                },
            );
        }
        Ok(SqlContext {
            entity: subquery.target,
            table_alias: child_schema.sql_alias.to_owned(),
            scopes,
        })
    }

    /// Resolve a named scope.
    pub fn scope(&self, name: &str) -> Option<&ScopeInfo> {
        self.scopes.get(name)
    }

    /// Registered scope names, sorted for deterministic error messages.
    pub fn scope_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scopes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
