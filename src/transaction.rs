use tracing::{debug, warn};

use crate::error::SessionDbError;
use crate::session::PooledConnection;

/// An open transaction on one connection.
///
/// Finish it with [`TransactionGuard::commit`] or [`TransactionGuard::rollback`]; a guard
/// dropped without either (an early return or a panic) rolls back.
#[derive(Debug)]
pub struct TransactionGuard<'a> {
    conn: &'a PooledConnection,
    finished: bool,
}

impl<'a> TransactionGuard<'a> {
    /// Issue `BEGIN` on `conn`.
    ///
    /// # Errors
    /// Returns `SessionDbError::UsageError` if `conn` is already inside a transaction, or the
    /// driver error from `BEGIN`.
    pub fn begin(conn: &'a PooledConnection) -> Result<Self, SessionDbError> {
        conn.with(|c| {
            if c.in_transaction() {
                return Err(SessionDbError::UsageError(
                    "a transaction is already open on this connection".to_string(),
                ));
            }
            c.begin()
        })??;
        debug!(session = conn.id(), "transaction started");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Commit. If `COMMIT` fails a rollback is attempted and the commit error is returned.
    ///
    /// # Errors
    /// The driver error from `COMMIT`.
    pub fn commit(mut self) -> Result<(), SessionDbError> {
        self.finished = true;
        match self.conn.with(|c| c.commit()).and_then(|r| r) {
            Ok(()) => {
                debug!(session = self.conn.id(), "transaction committed");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = self.roll_back() {
                    warn!(
                        session = self.conn.id(),
                        error = %rollback_err,
                        "rollback after failed commit also failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Roll back explicitly.
    ///
    /// # Errors
    /// The driver error from `ROLLBACK`.
    pub fn rollback(mut self) -> Result<(), SessionDbError> {
        self.finished = true;
        self.roll_back()
    }

    fn roll_back(&self) -> Result<(), SessionDbError> {
        self.conn.with(|c| c.rollback()).and_then(|r| r)?;
        debug!(session = self.conn.id(), "transaction rolled back");
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.roll_back() {
            warn!(session = self.conn.id(), error = %e, "rollback on drop failed");
        }
    }
}

/// Run `f` inside a transaction on `conn`: commit on `Ok`, roll back on `Err` and return the
/// closure's error unchanged.
///
/// # Errors
/// `f`'s error, or a `SessionDbError` from `BEGIN` or `COMMIT` converted into `E`.
pub fn run_in_transaction<T, E, F>(conn: &PooledConnection, f: F) -> Result<T, E>
where
    F: FnOnce(&PooledConnection) -> Result<T, E>,
    E: From<SessionDbError>,
{
    let guard = TransactionGuard::begin(conn)?;
    match f(conn) {
        Ok(value) => {
            guard.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = guard.rollback() {
                warn!(
                    session = conn.id(),
                    error = %rollback_err,
                    "rollback after failed scope failed"
                );
            }
            Err(e)
        }
    }
}
