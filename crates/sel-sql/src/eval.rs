//! SEL-to-SQL evaluator
//!
//! Walks a parsed [`Query`] and produces a parameterized SQL statement.
//! Literals become bound parameters, operations dispatch through the
//! operator registry, and nested queries compile to correlated
//! subqueries with a child scope context.

use sel_ast::{Node, OrderDirection, Query};
use sel_schema::{EntityRegistry, EntitySchema};
use tracing::debug;

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::fragment::{SqlFragment, SqlQuery};
use crate::ops::OperatorRegistry;

/// Compiles queries against a fixed pair of registries.
///
/// Holds no per-query state; one evaluator can serve concurrent
/// compiles.
pub struct Evaluator<'a> {
    entities: &'a EntityRegistry,
    operators: &'a OperatorRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(entities: &'a EntityRegistry, operators: &'a OperatorRegistry) -> Self {
        Self {
            entities,
            operators,
        }
    }

    pub fn entities(&self) -> &EntityRegistry {
        self.entities
    }

    /// Compile a top-level query to SQL.
    ///
    /// The produced parameter list is ordered exactly as the `?`
    /// placeholders occur left to right in the SQL text.
    pub fn compile(&self, query: &Query) -> Result<SqlQuery, CompileError> {
        let schema = self.entities.schema(query.target)?;
        let context = SqlContext::root(query, schema);

        let where_clause = self.to_sql(&query.where_, &context, "$.where")?;
        let order_by = self.render_order_by(query, schema, "$.orderBy")?;

        let mut sql = format!(
            "SELECT {alias}.* FROM {table} {alias} WHERE {where_sql}",
            alias = schema.sql_alias,
            table = schema.sql_table,
            where_sql = where_clause.sql,
        );
        let mut params = where_clause.params;

        if let Some(order_sql) = order_by {
            sql.push_str(&order_sql);
        }
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(limit.into());
        }

        debug!(entity = %query.target, params = params.len(), "compiled query");
        Ok(SqlQuery { sql, params })
    }

    /// Compile a nested query into a parenthesized correlated subquery.
    ///
    /// With a `result` expression the subquery is scalar; without one it
    /// selects the constant 1, which is the shape `exists` wraps.
    pub fn subquery(
        &self,
        query: &Query,
        parent: &SqlContext,
        path: &str,
    ) -> Result<SqlFragment, CompileError> {
        let context = parent.child(query, self.entities, path)?;
        let schema = self.entities.schema(query.target)?;

        let result = match &query.result {
            Some(node) => self.to_sql(node, &context, &format!("{path}.result"))?,
            None => SqlFragment::raw("1"),
        };
        let where_clause = self.to_sql(&query.where_, &context, &format!("{path}.where"))?;
        let order_by = self.render_order_by(query, schema, &format!("{path}.orderBy"))?;

        let mut sql = format!(
            "(SELECT {result_sql} FROM {table} {alias} WHERE {where_sql}",
            result_sql = result.sql,
            table = schema.sql_table,
            alias = schema.sql_alias,
            where_sql = where_clause.sql,
        );
        let mut params = result.params;
        params.extend(where_clause.params);

        if let Some(order_sql) = order_by {
            sql.push_str(&order_sql);
        }
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(limit.into());
        }
        sql.push(')');

        Ok(SqlFragment::new(sql, params))
    }

    /// Translate one node into a SQL fragment.
    pub fn to_sql(
        &self,
        node: &Node,
        context: &SqlContext,
        path: &str,
    ) -> Result<SqlFragment, CompileError> {
        match node {
            Node::Null => Ok(SqlFragment::raw("NULL")),
            // SQLite-style integer booleans.
            Node::Bool(value) => Ok(SqlFragment::bind(i64::from(*value))),
            Node::Int(value) => Ok(SqlFragment::bind(*value)),
            Node::Float(value) => Ok(SqlFragment::bind(*value)),
            Node::String(value) => Ok(SqlFragment::bind(value.as_str())),
            Node::Array(_) => Err(CompileError::invalid(
                "an array is not valid in SQL position; arrays only appear as operator arguments",
                path,
            )),
            Node::Query(query) => self.subquery(query, context, path),
            Node::Operation(operation) => {
                let operator = self.operators.get(&operation.operator).ok_or_else(|| {
                    CompileError::UnknownOperator {
                        key: operation.operator.clone(),
                        path: path.to_owned(),
                    }
                })?;
                let op_path = format!("{path}.{}", operation.operator);
                operator.metadata().signature.check_arity(
                    &operation.operator,
                    operation.args.len(),
                    &op_path,
                )?;
                operator.to_sql(self, &operation.args, context, &op_path)
            }
        }
    }

    /// Evaluate the argument at `index`, extending the JSON path.
    pub fn eval(
        &self,
        node: &Node,
        context: &SqlContext,
        path: &str,
        index: usize,
    ) -> Result<SqlFragment, CompileError> {
        self.to_sql(node, context, &format!("{path}[{index}]"))
    }

    /// Evaluate every argument in order.
    pub fn eval_all(
        &self,
        args: &[Node],
        context: &SqlContext,
        path: &str,
    ) -> Result<Vec<SqlFragment>, CompileError> {
        args.iter()
            .enumerate()
            .map(|(index, node)| self.eval(node, context, path, index))
            .collect()
    }

    /// Render the ORDER BY clause, if any. Sort keys are entity
    /// properties and render as plain column references, so no
    /// parameters are produced.
    fn render_order_by(
        &self,
        query: &Query,
        schema: &EntitySchema,
        path: &str,
    ) -> Result<Option<String>, CompileError> {
        let Some(clauses) = &query.order_by else {
            return Ok(None);
        };
        let mut rendered = Vec::with_capacity(clauses.len());
        for (index, clause) in clauses.iter().enumerate() {
            let prop = schema.property(&clause.field).ok_or_else(|| {
                CompileError::UnknownProperty {
                    property: clause.field.clone(),
                    entity: query.target,
                    path: format!("{path}[{index}]"),
                }
            })?;
            let direction = match clause.direction {
                OrderDirection::Asc => "ASC",
                OrderDirection::Desc => "DESC",
            };
            rendered.push(format!(
                "{}.{} {direction}",
                schema.sql_alias, prop.sql_column
            ));
        }
        Ok(Some(format!(" ORDER BY {}", rendered.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sel_ast::{EntityKind, Operation};

    fn compile(query: &Query) -> Result<SqlQuery, CompileError> {
        let entities = EntityRegistry::new();
        let operators = OperatorRegistry::new();
        Evaluator::new(&entities, &operators).compile(query)
    }

    fn note_query(where_: Node) -> Query {
        Query {
            target: EntityKind::Note,
            where_,
            alias: None,
            result: None,
            order_by: None,
            limit: None,
        }
    }

    #[test]
    fn test_literal_where_binds_parameter() {
        let query = note_query(Node::Bool(true));
        let compiled = compile(&query).unwrap();
        assert_eq!(compiled.sql, "SELECT note.* FROM cached_note note WHERE ?");
        assert_eq!(compiled.params, vec![1i64.into()]);
    }

    #[test]
    fn test_null_renders_inline() {
        let query = note_query(Node::Operation(Operation::new(
            "isNull",
            vec![Node::Null],
        )));
        let compiled = compile(&query).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT note.* FROM cached_note note WHERE (NULL IS NULL)"
        );
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_unknown_operator_path() {
        let query = note_query(Node::Operation(Operation::new(
            "frobnicate",
            vec![Node::Int(1)],
        )));
        let err = compile(&query).unwrap_err();
        assert!(matches!(err, CompileError::UnknownOperator { .. }));
        assert_eq!(err.path(), "$.where");
    }

    #[test]
    fn test_arity_error_path_includes_operator() {
        let query = note_query(Node::Operation(Operation::new(
            "not",
            vec![Node::Bool(true), Node::Bool(false)],
        )));
        let err = compile(&query).unwrap_err();
        assert!(err.to_string().contains("exactly 1"));
        assert_eq!(err.path(), "$.where.not");
    }

    #[test]
    fn test_standalone_array_rejected() {
        let query = note_query(Node::Operation(Operation::new(
            "not",
            vec![Node::Array(vec![Node::Int(1)])],
        )));
        let err = compile(&query).unwrap_err();
        assert!(matches!(err, CompileError::Invalid { .. }));
        assert_eq!(err.path(), "$.where.not[0]");
    }

    #[test]
    fn test_order_by_unknown_property() {
        let mut query = note_query(Node::Bool(true));
        query.order_by = Some(vec![sel_ast::OrderClause {
            field: "nonsense".into(),
            direction: OrderDirection::Asc,
        }]);
        let err = compile(&query).unwrap_err();
        assert!(matches!(err, CompileError::UnknownProperty { .. }));
        assert_eq!(err.path(), "$.orderBy[0]");
    }

    #[test]
    fn test_limit_param_is_last() {
        let mut query = note_query(Node::Operation(Operation::new(
            "==",
            vec![
                Node::Operation(Operation::new("prop", vec![Node::String("deckName".into())])),
                Node::String("General".into()),
            ],
        )));
        query.limit = Some(10);
        let compiled = compile(&query).unwrap();
        assert!(compiled.sql.ends_with("LIMIT ?"));
        assert_eq!(
            compiled.params,
            vec!["General".into(), 10i64.into()]
        );
    }
}
