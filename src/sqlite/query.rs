use rusqlite::types::Value;
use rusqlite::{Statement, ToSql};

use crate::error::SessionDbError;
use crate::results::ResultSet;
use crate::types::{KeyCase, RowValues};

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SessionDbError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SessionDbError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run a row-returning statement and materialize its rows.
///
/// # Errors
/// Returns `SessionDbError::SqliteError` if execution or value extraction fails.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
    key_case: KeyCase,
) -> Result<ResultSet, SessionDbError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(16);
    result_set.set_column_names(column_names, key_case);

    let mut rows_iter = stmt.query(&param_refs[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// True when `sql` may insert rows: its first keyword, after whitespace and comments, is
/// INSERT or REPLACE, or WITH leading into one of them.
pub(crate) fn is_insert_statement(sql: &str) -> bool {
    let body = skip_trivia(sql);
    let keyword = leading_word(body);
    if keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace") {
        return true;
    }
    keyword.eq_ignore_ascii_case("with")
        && body
            .split(|c: char| !c.is_ascii_alphabetic())
            .any(|w| w.eq_ignore_ascii_case("insert") || w.eq_ignore_ascii_case("replace"))
}

fn leading_word(sql: &str) -> &str {
    let end = sql
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(sql.len());
    &sql[..end]
}

/// Strip leading whitespace, `--` line comments and `/* */` block comments.
fn skip_trivia(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |nl| &rest[nl + 1..]);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |end| &rest[end + 2..]);
        } else {
            return sql;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_insert_keywords() {
        assert!(is_insert_statement("  INSERT INTO t VALUES (1)"));
        assert!(is_insert_statement("replace into t values (1)"));
        assert!(!is_insert_statement("UPDATE t SET a = 1"));
        assert!(!is_insert_statement("inserted"));
    }

    #[test]
    fn insert_behind_comments_or_cte_is_detected() {
        assert!(is_insert_statement("-- second tenant\nINSERT INTO t VALUES (1)"));
        assert!(is_insert_statement("/* bulk */ /* again */\n  insert into t values (1)"));
        assert!(is_insert_statement(
            "WITH src AS (SELECT 1 AS x) INSERT INTO t SELECT x FROM src"
        ));
        assert!(!is_insert_statement("WITH src AS (SELECT 1 AS x) SELECT x FROM src"));
        assert!(!is_insert_statement("-- INSERT INTO t\nSELECT 1"));
        assert!(!is_insert_statement("/* unterminated INSERT"));
    }
}
