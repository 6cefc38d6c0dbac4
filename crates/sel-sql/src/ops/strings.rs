//! String operators (contains, startsWith, endsWith, len)

use sel_ast::Node;

use crate::context::SqlContext;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::fragment::SqlFragment;

use super::{Category, Operator, OperatorMetadata, SelType, Signature};

#[derive(Clone, Copy)]
enum MatchKind {
    Contains,
    StartsWith,
    EndsWith,
}

/// Substring matching via `LIKE`, with the needle kept as a bound
/// parameter and the wildcards concatenated in SQL.
///
/// Matching is case-sensitive except where the database collates LIKE
/// case-insensitively for ASCII (SQLite default); SEL does not add its
/// own case folding.
pub struct StringMatchOperator {
    key: &'static str,
    kind: MatchKind,
    metadata: OperatorMetadata,
}

impl StringMatchOperator {
    fn new(
        key: &'static str,
        kind: MatchKind,
        display_name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            kind,
            metadata: OperatorMetadata {
                display_name,
                category: Category::String,
                description,
                signature: Signature::binary(SelType::String, SelType::Boolean),
            },
        }
    }

    pub fn all() -> Vec<StringMatchOperator> {
        vec![
            Self::new("contains", MatchKind::Contains, "Contains", "Text contains a substring"),
            Self::new("startsWith", MatchKind::StartsWith, "Starts with", "Text starts with a prefix"),
            Self::new("endsWith", MatchKind::EndsWith, "Ends with", "Text ends with a suffix"),
        ]
    }

    fn pattern(&self, needle: SqlFragment) -> SqlFragment {
        let sql = match self.kind {
            MatchKind::Contains => format!("'%' || {} || '%'", needle.sql),
            MatchKind::StartsWith => format!("{} || '%'", needle.sql),
            MatchKind::EndsWith => format!("'%' || {}", needle.sql),
        };
        SqlFragment::new(sql, needle.params)
    }
}

impl Operator for StringMatchOperator {
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
        let haystack = evaluator.eval(&args[0], context, path, 0)?;
        let needle = evaluator.eval(&args[1], context, path, 1)?;
        let pattern = self.pattern(needle);
        let mut params = haystack.params;
        params.extend(pattern.params);
        Ok(SqlFragment::new(
            format!("({} LIKE {})", haystack.sql, pattern.sql),
            params,
        ))
    }
}

/// String length, with NULL treated as length 0.
pub struct LenOperator {
    metadata: OperatorMetadata,
}

impl LenOperator {
    pub fn new() -> Self {
        Self {
            metadata: OperatorMetadata {
                display_name: "Length",
                category: Category::String,
                description: "Length of a text value",
                signature: Signature::unary(SelType::String, SelType::Number),
            },
        }
    }
}

impl Operator for LenOperator {
    fn key(&self) -> &str {
        "len"
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
            format!("COALESCE(LENGTH({}), 0)", inner.sql),
            inner.params,
        ))
    }
}
