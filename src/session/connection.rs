use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;

#[cfg(feature = "postgres")]
use crate::postgres::PgSession;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteSession;
#[cfg(feature = "postgres")]
use crate::translation::split_statements;

use super::StatementOutcome;
use crate::error::SessionDbError;
use crate::types::{EngineKind, KeyCase, RowValues};

/// A live connection to either engine.
#[derive(Debug)]
pub enum EngineConnection {
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteSession),
    #[cfg(feature = "postgres")]
    Postgres(PgSession),
}

impl EngineConnection {
    #[must_use]
    pub fn kind(&self) -> EngineKind {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(_) => EngineKind::EmbeddedFile,
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(_) => EngineKind::NetworkServer,
        }
    }

    /// Run one statement already written in this engine's placeholder syntax.
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub fn run(
        &mut self,
        sql: &str,
        params: &[RowValues],
        key_case: KeyCase,
    ) -> Result<StatementOutcome, SessionDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(session) => session.run(sql, params, key_case),
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => session.run(sql, params, key_case),
        }
    }

    /// Run a multi-statement script.
    ///
    /// `SQLite` executes the script natively; Postgres receives one statement at a time, in
    /// order, so a failure names the statement that broke.
    ///
    /// # Errors
    /// The first failing statement's driver error.
    pub fn execute_script(&mut self, script: &str) -> Result<(), SessionDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(session) => session.execute_batch(script),
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => {
                for statement in split_statements(script) {
                    session.batch_execute(statement)?;
                }
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(session) => session.in_transaction(),
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => session.in_transaction(),
        }
    }

    pub(crate) fn begin(&mut self) -> Result<(), SessionDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(session) => session.begin(),
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => session.begin(),
        }
    }

    pub(crate) fn commit(&mut self) -> Result<(), SessionDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(session) => session.commit(),
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => session.commit(),
        }
    }

    pub(crate) fn rollback(&mut self) -> Result<(), SessionDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(session) => session.rollback(),
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => session.rollback(),
        }
    }

    /// Cheap closed check with no round trip. Embedded connections are never closed while held.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(_) => false,
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => session.is_closed(),
        }
    }

    /// Flag a network connection as dead so the next checkout replaces it. No-op for `SQLite`.
    pub fn mark_closed(&mut self) {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(_) => {}
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => session.mark_closed(),
        }
    }

    /// One trivial round trip.
    ///
    /// # Errors
    /// The driver error if the engine does not answer.
    pub fn ping(&mut self) -> Result<(), SessionDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(session) => {
                session.raw().query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            }
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => session.ping(),
        }
    }

    /// Close the underlying connection.
    ///
    /// # Errors
    /// Errors `SQLite` reports while finalizing the file handle.
    pub fn close(self) -> Result<(), SessionDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineConnection::Sqlite(session) => session.close(),
            #[cfg(feature = "postgres")]
            EngineConnection::Postgres(session) => {
                // dropping the client ends the connection task; the runtime goes with it
                drop(session);
                Ok(())
            }
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn as_sqlite_mut(&mut self) -> Option<&mut SqliteSession> {
        match self {
            EngineConnection::Sqlite(session) => Some(session),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    #[cfg(feature = "postgres")]
    pub fn as_postgres_mut(&mut self) -> Option<&mut PgSession> {
        match self {
            EngineConnection::Postgres(session) => Some(session),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

/// Registry-side storage for one thread's connection.
pub(crate) struct Slot<C> {
    id: u64,
    owner: ThreadId,
    conn: Mutex<Option<C>>,
}

impl<C> Slot<C> {
    pub(crate) fn new(id: u64, owner: ThreadId, conn: C) -> Self {
        Self {
            id,
            owner,
            conn: Mutex::new(Some(conn)),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Option<C>> {
        // a panic inside a statement leaves the connection itself intact
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the connection; `None` once it has been taken.
    pub(crate) fn with_conn<R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        self.lock().as_mut().map(f)
    }

    pub(crate) fn take(&self) -> Option<C> {
        self.lock().take()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.lock().is_some()
    }
}

/// Handle to the calling thread's connection.
///
/// Handles are cheap to clone and all clones refer to the same connection. They are `!Send`, so
/// a connection never leaves the thread it was opened for. Once the registry closes the
/// connection, every operation through a remaining handle fails with
/// `SessionDbError::ConnectionError`.
pub struct PooledConnection<C = EngineConnection> {
    slot: Arc<Slot<C>>,
    _not_send: PhantomData<*const ()>,
}

impl<C> PooledConnection<C> {
    pub(crate) fn new(slot: Arc<Slot<C>>) -> Self {
        Self {
            slot,
            _not_send: PhantomData,
        }
    }

    /// Identity of the underlying connection, unique within one registry.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    /// Thread the connection belongs to.
    #[must_use]
    pub fn owner(&self) -> ThreadId {
        self.slot.owner
    }

    /// False once the registry has closed this connection.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.slot.is_open()
    }

    /// Run `f` with exclusive access to the native connection.
    ///
    /// Do not call back into this handle from inside `f`.
    ///
    /// # Errors
    /// Returns `SessionDbError::ConnectionError` if the connection has been closed.
    pub fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R, SessionDbError> {
        self.slot.with_conn(f).ok_or_else(|| {
            SessionDbError::ConnectionError(format!("connection {} has been closed", self.slot.id))
        })
    }
}

impl<C> Clone for PooledConnection<C> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.slot))
    }
}

impl<C> fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.slot.id)
            .field("owner", &self.slot.owner)
            .field("open", &self.is_open())
            .finish()
    }
}
