use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use super::params::Params;
use super::query::{build_result_set, is_insert_statement};
use crate::error::SessionDbError;
use crate::results::ResultSet;
use crate::session::StatementOutcome;
use crate::types::{KeyCase, RowValues};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One open `SQLite` file connection.
///
/// Foreign keys are enforced and the file runs in WAL mode so readers on other threads are not
/// blocked by a writer.
pub struct SqliteSession {
    conn: Connection,
    path: PathBuf,
}

impl SqliteSession {
    /// Open (creating if needed) the database file at `path`.
    ///
    /// # Errors
    /// Returns `SessionDbError::SqliteError` if the file cannot be opened or configured, or
    /// `SessionDbError::ConnectionError` if its parent directory cannot be created.
    pub fn open(path: &Path) -> Result<Self, SessionDbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SessionDbError::ConnectionError(format!(
                    "cannot create directory {} for sqlite file: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // journal_mode answers with a row, so it cannot go through execute_batch
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "sqlite session opened");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the raw rusqlite connection.
    pub fn raw(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Run one statement, materializing rows when it produces any.
    ///
    /// # Errors
    /// Returns `SessionDbError::SqliteError` on prepare or execution failure.
    pub fn run(
        &mut self,
        sql: &str,
        params: &[RowValues],
        key_case: KeyCase,
    ) -> Result<StatementOutcome, SessionDbError> {
        let converted = Params::convert(params);
        let mut stmt = self.conn.prepare(sql)?;
        let result = if stmt.column_count() > 0 {
            build_result_set(&mut stmt, converted.as_values(), key_case)?
        } else {
            let refs = converted.as_refs();
            ResultSet::affected(stmt.execute(&refs[..])?)
        };
        drop(stmt);

        let last_insert_id = is_insert_statement(sql).then(|| self.conn.last_insert_rowid());
        Ok(StatementOutcome {
            result,
            last_insert_id,
        })
    }

    /// Run a multi-statement script natively.
    ///
    /// # Errors
    /// Returns `SessionDbError::SqliteError` on the first failing statement.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), SessionDbError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    pub(crate) fn begin(&mut self) -> Result<(), SessionDbError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    pub(crate) fn commit(&mut self) -> Result<(), SessionDbError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub(crate) fn rollback(&mut self) -> Result<(), SessionDbError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Close the file handle, reporting any error `SQLite` raises while finalizing.
    ///
    /// # Errors
    /// Returns `SessionDbError::SqliteError` if `sqlite3_close` fails.
    pub fn close(self) -> Result<(), SessionDbError> {
        self.conn.close().map_err(|(_, err)| SessionDbError::SqliteError(err))
    }
}

impl fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSession")
            .field("path", &self.path)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
