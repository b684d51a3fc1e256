use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::SessionDbError;
use crate::query_builder::BuiltQuery;
use crate::results::NormalizedRow;
use crate::session::{EngineConnection, PooledConnection, StatementOutcome};
use crate::translation::rewrite;
use crate::types::{EngineKind, KeyCase, RowValues};

/// Executes statements on one connection and buffers what they return.
///
/// Column keys are upper-cased for both engines unless the cursor was built with
/// [`KeyCase::Preserve`]. Fetching past the end yields `None` or an empty `Vec`, never an empty
/// row.
#[derive(Debug)]
pub struct NormalizedCursor {
    conn: PooledConnection,
    kind: EngineKind,
    key_case: KeyCase,
    buffer: VecDeque<NormalizedRow>,
    columns: Option<Arc<Vec<String>>>,
    rowcount: i64,
    lastrowid: Option<i64>,
}

impl NormalizedCursor {
    /// Cursor with upper-cased row keys.
    ///
    /// # Errors
    /// Returns `SessionDbError::ConnectionError` if the connection has been closed.
    pub fn new(conn: PooledConnection) -> Result<Self, SessionDbError> {
        Self::with_key_case(conn, KeyCase::Upper)
    }

    /// Cursor with an explicit key casing.
    ///
    /// # Errors
    /// Returns `SessionDbError::ConnectionError` if the connection has been closed.
    pub fn with_key_case(conn: PooledConnection, key_case: KeyCase) -> Result<Self, SessionDbError> {
        let kind = conn.with(|c| c.kind())?;
        Ok(Self {
            conn,
            kind,
            key_case,
            buffer: VecDeque::new(),
            columns: None,
            rowcount: -1,
            lastrowid: None,
        })
    }

    /// Execute `sql` written with canonical `?` placeholders.
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<&mut Self, SessionDbError> {
        let sql = rewrite(sql, self.kind);
        self.execute_raw(&sql, params)
    }

    /// Execute `sql` exactly as written, in the engine's own placeholder syntax.
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub fn execute_raw(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<&mut Self, SessionDbError> {
        let key_case = self.key_case;
        let outcome = self.conn.with(|c| c.run(sql, params, key_case))??;
        self.load(outcome);
        Ok(self)
    }

    /// Execute a statement rendered by [`crate::SqlBuilder`].
    ///
    /// # Errors
    /// Returns `SessionDbError::UsageError` if the query was built for the other engine, or
    /// the driver error.
    pub fn execute_built(&mut self, query: &BuiltQuery) -> Result<&mut Self, SessionDbError> {
        if query.kind != self.kind {
            return Err(SessionDbError::UsageError(format!(
                "query was built for {} but this cursor runs on {}",
                query.kind.label(),
                self.kind.label()
            )));
        }
        self.execute_raw(&query.sql, &query.params)
    }

    /// Execute one statement once per parameter set. `rowcount` becomes the total and
    /// `lastrowid` keeps the value it had before the batch.
    ///
    /// # Errors
    /// Stops at, and returns, the first driver error.
    pub fn executemany(
        &mut self,
        sql: &str,
        param_sets: &[Vec<RowValues>],
    ) -> Result<&mut Self, SessionDbError> {
        let sql = rewrite(sql, self.kind);
        let previous = self.lastrowid;
        let mut total = 0;
        for params in param_sets {
            let outcome = self.execute_raw(&sql, params).map(|_| ());
            if let Err(e) = outcome {
                self.lastrowid = previous;
                return Err(e);
            }
            total += self.rowcount.max(0);
        }
        self.buffer.clear();
        self.rowcount = total;
        self.lastrowid = previous;
        Ok(self)
    }

    fn load(&mut self, outcome: StatementOutcome) {
        let StatementOutcome {
            result,
            last_insert_id,
        } = outcome;
        self.columns = result.column_names().cloned();
        self.rowcount = i64::try_from(result.rows_affected).unwrap_or(i64::MAX);
        self.buffer = result.results.into();
        if last_insert_id.is_some() {
            self.lastrowid = last_insert_id;
        }
    }

    /// Next buffered row, or `None` when the result is exhausted or empty.
    pub fn fetchone(&mut self) -> Option<NormalizedRow> {
        self.buffer.pop_front()
    }

    /// Up to `size` buffered rows.
    pub fn fetchmany(&mut self, size: usize) -> Vec<NormalizedRow> {
        let take = size.min(self.buffer.len());
        self.buffer.drain(..take).collect()
    }

    /// All remaining buffered rows.
    pub fn fetchall(&mut self) -> Vec<NormalizedRow> {
        self.buffer.drain(..).collect()
    }

    /// Rows affected by the last DML, rows returned by the last query, or -1 before any
    /// statement ran.
    #[must_use]
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    /// Row id captured after the most recent insert on this cursor (`SQLite` only).
    #[must_use]
    pub fn lastrowid(&self) -> Option<i64> {
        self.lastrowid
    }

    /// Normalized column names of the last result, if it had any.
    #[must_use]
    pub fn column_names(&self) -> Option<&[String]> {
        self.columns.as_deref().map(Vec::as_slice)
    }

    #[must_use]
    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    #[must_use]
    pub fn key_case(&self) -> KeyCase {
        self.key_case
    }

    #[must_use]
    pub fn connection(&self) -> &PooledConnection {
        &self.conn
    }
}

impl Iterator for NormalizedCursor {
    type Item = NormalizedRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetchone()
    }
}

impl PooledConnection<EngineConnection> {
    /// Upper-casing cursor over this connection.
    ///
    /// # Errors
    /// Returns `SessionDbError::ConnectionError` if the connection has been closed.
    pub fn cursor(&self) -> Result<NormalizedCursor, SessionDbError> {
        NormalizedCursor::new(self.clone())
    }
}
