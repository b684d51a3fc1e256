//! Primary keys of freshly inserted rows, without engine branching at call sites.

use crate::cursor::NormalizedCursor;
use crate::error::SessionDbError;
use crate::types::{EngineKind, KeyCase, RowValues};

const CURRVAL_SQL: &str = "SELECT currval($1::text::regclass)";

/// Name Postgres gives the sequence behind a `serial` or identity column.
#[must_use]
pub fn sequence_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_seq").to_lowercase()
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, SessionDbError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            SessionDbError::UsageError(format!(
                "the networked engine needs the {what} to resolve an inserted id"
            ))
        })
}

/// Id generated by the most recent insert through `cursor`.
///
/// `SQLite` answers from the row id captured right after the insert and ignores `table` and
/// `column`. Postgres needs both and asks the session for `currval` of the matching sequence.
///
/// # Errors
/// `SessionDbError::UsageError` when `SQLite` has no insert on this cursor, or when Postgres is
/// missing `table` or `column` (raised before touching the connection). Driver errors (such as
/// an unknown sequence, or `currval` not yet defined in this session) propagate unchanged.
pub fn last_insert_id(
    cursor: &NormalizedCursor,
    table: Option<&str>,
    column: Option<&str>,
) -> Result<i64, SessionDbError> {
    match cursor.kind() {
        EngineKind::EmbeddedFile => cursor.lastrowid().ok_or_else(|| {
            SessionDbError::UsageError("no insert has run on this cursor".to_string())
        }),
        EngineKind::NetworkServer => {
            let table = required(table, "table name")?;
            let column = required(column, "id column")?;
            let params = [RowValues::Text(sequence_name(table, column))];
            let outcome = cursor
                .connection()
                .with(|c| c.run(CURRVAL_SQL, &params, KeyCase::Preserve))??;
            outcome
                .result
                .results
                .first()
                .and_then(|row| row.get_by_index(0))
                .and_then(RowValues::as_int)
                .copied()
                .ok_or_else(|| {
                    SessionDbError::ExecutionError("currval returned no value".to_string())
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_names_are_lower_cased() {
        assert_eq!(sequence_name("Persons", "ID"), "persons_id_seq");
        assert_eq!(sequence_name("lease_units", "unit_id"), "lease_units_unit_id_seq");
    }

    #[test]
    fn missing_arguments_are_usage_errors() {
        assert!(required(None, "table name").unwrap_err().is_usage());
        assert!(required(Some("  "), "id column").unwrap_err().is_usage());
        assert_eq!(required(Some(" persons "), "table name").unwrap(), "persons");
    }
}
