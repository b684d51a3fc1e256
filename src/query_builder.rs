use crate::types::{EngineKind, RowValues};

/// One piece of a statement under construction.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlFragment {
    /// Literal SQL text, copied verbatim.
    Sql(String),
    /// A bound parameter; rendered as the engine's placeholder marker.
    Bind(RowValues),
}

/// Statement assembled from literal text and bound values.
///
/// Placeholders are emitted only for [`SqlFragment::Bind`] pieces, so a `?` or `$1` inside a
/// literal fragment is never reinterpreted.
///
/// ```rust
/// use sql_session::prelude::*;
///
/// let query = SqlBuilder::new()
///     .sql("SELECT id FROM persons WHERE note = '?' AND name = ")
///     .bind("ana")
///     .sql(" AND active = ")
///     .bind(true)
///     .build(EngineKind::NetworkServer);
/// assert_eq!(
///     query.sql,
///     "SELECT id FROM persons WHERE note = '?' AND name = $1 AND active = $2"
/// );
/// assert_eq!(query.params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlBuilder {
    fragments: Vec<SqlFragment>,
}

/// Engine-native SQL text with its parameters in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    /// Engine the SQL was rendered for.
    pub kind: EngineKind,
    pub sql: String,
    pub params: Vec<RowValues>,
}

impl SqlBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal SQL.
    #[must_use]
    pub fn sql(mut self, text: impl Into<String>) -> Self {
        self.push_sql(text);
        self
    }

    /// Append a bound parameter.
    #[must_use]
    pub fn bind(mut self, value: impl Into<RowValues>) -> Self {
        self.push_bind(value);
        self
    }

    pub fn push_sql(&mut self, text: impl Into<String>) -> &mut Self {
        self.fragments.push(SqlFragment::Sql(text.into()));
        self
    }

    pub fn push_bind(&mut self, value: impl Into<RowValues>) -> &mut Self {
        self.fragments.push(SqlFragment::Bind(value.into()));
        self
    }

    /// Append `values` as binds joined by `separator`, e.g. for `IN (...)` lists.
    pub fn push_bind_list<I, V>(&mut self, values: I, separator: &str) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.push_sql(separator);
            }
            self.push_bind(value);
        }
        self
    }

    #[must_use]
    pub fn fragments(&self) -> &[SqlFragment] {
        &self.fragments
    }

    /// Render the statement for `kind`.
    #[must_use]
    pub fn build(&self, kind: EngineKind) -> BuiltQuery {
        let mut sql = String::new();
        let mut params = Vec::new();
        for fragment in &self.fragments {
            match fragment {
                SqlFragment::Sql(text) => sql.push_str(text),
                SqlFragment::Bind(value) => {
                    params.push(value.clone());
                    sql.push_str(&kind.placeholder(params.len()));
                }
            }
        }
        BuiltQuery { kind, sql, params }
    }
}
