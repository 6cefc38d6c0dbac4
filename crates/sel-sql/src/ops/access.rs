//! Data access operators (field, prop, ref)
//!
//! `prop` reads a mapped column of the current entity; `field` reads a
//! note-field value out of the field_value table through a scalar
//! subquery (a JOIN would multiply rows for one-to-many field sets);
//! `ref` resolves an ancestor alias into that row's column, producing
//! the correlation inside subqueries.

use sel_ast::Node;
use sel_schema::FieldContext;

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::fragment::SqlFragment;

use super::{Category, Operator, OperatorMetadata, SelType, Signature};

/// Column access for the current entity: `{"prop": "noteId"}`.
pub struct PropOperator {
    metadata: OperatorMetadata,
}

impl PropOperator {
    pub fn new() -> Self {
        Self {
            metadata: OperatorMetadata {
                display_name: "Property",
                category: Category::Internal,
                description: "Read a property of the current entity",
                signature: Signature::unary(SelType::String, SelType::Any),
            },
        }
    }
}

impl Operator for PropOperator {
    fn key(&self) -> &str {
        "prop"
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
        let Node::String(prop_name) = &args[0] else {
            return Err(CompileError::invalid(
                "property name must be a string literal",
                path,
            ));
        };
        let schema = evaluator.entities().schema(context.entity)?;
        let prop = schema
            .property(prop_name)
            .ok_or_else(|| CompileError::UnknownProperty {
                property: prop_name.clone(),
                entity: context.entity,
                path: path.to_owned(),
            })?;
        Ok(SqlFragment::raw(format!(
            "{}.{}",
            context.table_alias, prop.sql_column
        )))
    }
}

/// Field-value access through a scalar subquery.
///
/// - `{"field": "example"}`: the entity's default context.
/// - `{"field": ["example", "changes"]}`: an explicit context.
/// - `{"field": ["example", ["edited", "changes", "original"]]}`:
///   ordered priority fallback, the first context holding the field
///   wins.
///
/// Context markers come from the schema registry, never from user
/// input, so they are rendered as quoted literals; the field name is
/// always a bound parameter.
pub struct FieldOperator {
    metadata: OperatorMetadata,
}

impl FieldOperator {
    pub fn new() -> Self {
        Self {
            metadata: OperatorMetadata {
                display_name: "Field",
                category: Category::Internal,
                description: "Read a named field value of the current entity",
                signature: Signature {
                    min_args: 1,
                    max_args: Some(2),
                    arg_types: vec![SelType::String, SelType::Any],
                    return_type: SelType::Any,
                },
            },
        }
    }

    fn resolve_context<'a>(
        schema: &'a sel_schema::EntitySchema,
        sel_key: &str,
        entity: sel_ast::EntityKind,
        path: &str,
    ) -> Result<&'a FieldContext, CompileError> {
        schema
            .field_context(sel_key)
            .ok_or_else(|| CompileError::UnknownFieldContext {
                context: sel_key.to_owned(),
                entity,
                valid: schema.field_context_keys().join(", "),
                path: path.to_owned(),
            })
    }

    fn single_context(
        field_name: &str,
        context_value: &str,
        fk_column: &str,
        table_alias: &str,
    ) -> SqlFragment {
        SqlFragment::new(
            format!(
                "(SELECT fv.field_value FROM field_value fv \
                 WHERE fv.{fk_column} = {table_alias}.id \
                 AND fv.context = '{context_value}' AND fv.field_name = ?)"
            ),
            vec![field_name.into()],
        )
    }

    /// Priority fallback across contexts: the IN clause restricts to the
    /// candidates and the CASE ranking picks the first match.
    fn priority_contexts(
        field_name: &str,
        context_values: &[&str],
        fk_column: &str,
        table_alias: &str,
    ) -> SqlFragment {
        let in_list = context_values
            .iter()
            .map(|v| format!("'{v}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let ranking = context_values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("WHEN '{v}' THEN {}", i + 1))
            .collect::<Vec<_>>()
            .join(" ");
        SqlFragment::new(
            format!(
                "(SELECT fv.field_value FROM field_value fv \
                 WHERE fv.{fk_column} = {table_alias}.id \
                 AND fv.field_name = ? AND fv.context IN ({in_list}) \
                 ORDER BY CASE fv.context {ranking} END LIMIT 1)"
            ),
            vec![field_name.into()],
        )
    }
}

impl Operator for FieldOperator {
    fn key(&self) -> &str {
        "field"
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
        let Node::String(field_name) = &args[0] else {
            return Err(CompileError::invalid(
                "field name must be a string literal",
                path,
            ));
        };
        let schema = evaluator.entities().schema(context.entity)?;
        let fk_column = schema
            .field_value_fk
            .ok_or_else(|| CompileError::FieldAccessUnsupported {
                entity: context.entity,
                path: path.to_owned(),
            })?;

        match args.get(1) {
            None => {
                let field_context = schema.default_field_context().ok_or_else(|| {
                    CompileError::FieldAccessUnsupported {
                        entity: context.entity,
                        path: path.to_owned(),
                    }
                })?;
                Ok(Self::single_context(
                    field_name,
                    field_context.sql_value,
                    fk_column,
                    &context.table_alias,
                ))
            }
            Some(Node::String(sel_key)) => {
                let field_context =
                    Self::resolve_context(schema, sel_key, context.entity, path)?;
                Ok(Self::single_context(
                    field_name,
                    field_context.sql_value,
                    fk_column,
                    &context.table_alias,
                ))
            }
            Some(Node::Array(items)) => {
                if items.is_empty() {
                    return Err(CompileError::invalid(
                        "field context array must not be empty",
                        path,
                    ));
                }
                let mut context_values = Vec::with_capacity(items.len());
                for item in items {
                    let Node::String(sel_key) = item else {
                        return Err(CompileError::invalid(
                            "field context array must contain only strings",
                            path,
                        ));
                    };
                    let field_context =
                        Self::resolve_context(schema, sel_key, context.entity, path)?;
                    context_values.push(field_context.sql_value);
                }
                Ok(Self::priority_contexts(
                    field_name,
                    &context_values,
                    fk_column,
                    &context.table_alias,
                ))
            }
            Some(_) => Err(CompileError::invalid(
                "field context must be a string or an array of strings",
                path,
            )),
        }
    }
}

/// Ancestor scope reference: `{"ref": ["n", "id"]}` → `note.id`.
pub struct RefOperator {
    metadata: OperatorMetadata,
}

impl RefOperator {
    pub fn new() -> Self {
        Self {
            metadata: OperatorMetadata {
                display_name: "Reference",
                category: Category::Internal,
                description: "Reference a property of a named ancestor query",
                signature: Signature::binary(SelType::String, SelType::Any),
            },
        }
    }
}

impl Operator for RefOperator {
    fn key(&self) -> &str {
        "ref"
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
        let Node::String(scope_name) = &args[0] else {
            return Err(CompileError::invalid(
                "ref scope must be a string literal",
                path,
            ));
        };
        let Node::String(prop_name) = &args[1] else {
            return Err(CompileError::invalid(
                "ref property must be a string literal",
                path,
            ));
        };
        let scope = context
            .scope(scope_name)
            .ok_or_else(|| CompileError::UnknownScope {
                scope: scope_name.clone(),
                available: context.scope_names().join(", "),
                path: path.to_owned(),
            })?;
        let scope_schema = evaluator.entities().schema(scope.entity)?;
        let prop = scope_schema
            .property(prop_name)
            .ok_or_else(|| CompileError::UnknownProperty {
                property: prop_name.clone(),
                entity: scope.entity,
                path: path.to_owned(),
            })?;
        Ok(SqlFragment::raw(format!(
            "{}.{}",
            scope.table_alias, prop.sql_column
        )))
    }
}
