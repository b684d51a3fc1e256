use std::borrow::Cow;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ConnectionParameters, DatabaseSettings, resolve};
use crate::cursor::NormalizedCursor;
use crate::error::SessionDbError;
use crate::identity;
use crate::query_builder::SqlBuilder;
use crate::results::NormalizedRow;
use crate::session::{EngineManager, PooledConnection, RegistryStats, SessionRegistry};
use crate::transaction::run_in_transaction;
use crate::translation;
use crate::types::{EngineKind, KeyCase, RowValues};

/// Process-wide database service: the resolved engine plus the per-thread session registry.
///
/// Share one instance (for example in an `Arc`) between worker threads. Every call blocks the
/// calling thread; do not call it from inside an async runtime.
pub struct Database {
    kind: EngineKind,
    key_case: KeyCase,
    registry: SessionRegistry<EngineManager>,
}

/// Serializable description of the configured database. Never includes the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub mode: EngineKind,
    pub engine: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub open_sessions: usize,
    pub reconnects: u64,
}

impl Database {
    /// Build a service for already-resolved parameters.
    ///
    /// # Errors
    /// Returns `SessionDbError::ConfigError` if `kind` does not match `params`.
    pub fn new(kind: EngineKind, params: ConnectionParameters) -> Result<Self, SessionDbError> {
        if params.engine_kind() != kind {
            return Err(SessionDbError::ConfigError(format!(
                "engine {} does not match {} connection parameters",
                kind.label(),
                params.engine_kind().label()
            )));
        }
        info!(engine = kind.label(), "database service configured");
        Ok(Self {
            kind,
            key_case: KeyCase::Upper,
            registry: SessionRegistry::new(EngineManager::new(params)),
        })
    }

    /// # Errors
    /// Resolution failures from [`resolve`].
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self, SessionDbError> {
        let (kind, params) = resolve(settings)?;
        Self::new(kind, params)
    }

    /// Resolve settings from `.env` and the process environment.
    ///
    /// # Errors
    /// Malformed settings or resolution failures.
    pub fn from_env() -> Result<Self, SessionDbError> {
        Self::from_settings(&DatabaseSettings::from_env()?)
    }

    /// Key casing for cursors created by [`Database::get_cursor`].
    #[must_use]
    pub fn with_key_case(mut self, key_case: KeyCase) -> Self {
        self.key_case = key_case;
        self
    }

    #[must_use]
    pub fn engine_kind(&self) -> EngineKind {
        self.kind
    }

    #[must_use]
    pub fn params(&self) -> &ConnectionParameters {
        self.registry.manager().params()
    }

    /// The calling thread's connection.
    ///
    /// # Errors
    /// Errors from opening (or reopening a stale) connection.
    pub fn get_connection(&self) -> Result<PooledConnection, SessionDbError> {
        self.registry.get_connection()
    }

    /// A cursor over `conn` using this service's key casing.
    ///
    /// # Errors
    /// Returns `SessionDbError::ConnectionError` if `conn` has been closed.
    pub fn get_cursor(&self, conn: &PooledConnection) -> Result<NormalizedCursor, SessionDbError> {
        NormalizedCursor::with_key_case(conn.clone(), self.key_case)
    }

    #[must_use]
    pub fn placeholder(&self, position: usize) -> Cow<'static, str> {
        self.kind.placeholder(position)
    }

    #[must_use]
    pub fn rewrite<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        translation::rewrite(sql, self.kind)
    }

    #[must_use]
    pub fn boolean_literal(&self, value: bool) -> &'static str {
        self.kind.boolean_literal(value)
    }

    #[must_use]
    pub fn sql_builder(&self) -> SqlBuilder {
        SqlBuilder::new()
    }

    /// Run `f` in a transaction on the calling thread's connection.
    ///
    /// # Errors
    /// `f`'s error unchanged after a rollback, or a connection, `BEGIN` or `COMMIT` failure.
    /// Nesting scopes on one thread is a `SessionDbError::UsageError`.
    pub fn transactional_scope<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&PooledConnection) -> Result<T, E>,
        E: From<SessionDbError>,
    {
        let conn = self.get_connection()?;
        run_in_transaction(&conn, f)
    }

    /// See [`identity::last_insert_id`].
    ///
    /// # Errors
    /// See [`identity::last_insert_id`].
    pub fn last_insert_id(
        &self,
        cursor: &NormalizedCursor,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Result<i64, SessionDbError> {
        identity::last_insert_id(cursor, table, column)
    }

    /// Run a multi-statement script.
    ///
    /// Postgres runs the whole script in one transaction. `SQLite` hands it to the driver
    /// unwrapped, so a script may carry its own `BEGIN` and `COMMIT`. Statements before a
    /// failure stay applied; a transaction the script opened is rolled back.
    ///
    /// # Errors
    /// Returns `SessionDbError::UsageError` if the calling thread is already inside a
    /// transaction, otherwise the first failing statement's error.
    pub fn execute_script(&self, script: &str) -> Result<(), SessionDbError> {
        if self.kind != EngineKind::EmbeddedFile {
            return self.transactional_scope(|conn| conn.with(|c| c.execute_script(script))?);
        }
        let conn = self.get_connection()?;
        conn.with(|c| {
            if c.in_transaction() {
                return Err(SessionDbError::UsageError(
                    "execute_script cannot run inside an open transaction".into(),
                ));
            }
            let outcome = c.execute_script(script);
            // a script that failed after its own BEGIN must not leave the connection pinned
            if outcome.is_err() && c.in_transaction() {
                if let Err(e) = c.rollback() {
                    warn!(error = %e, "rollback after failed script failed");
                }
            }
            outcome
        })?
    }

    /// Close the calling thread's connection; returns whether it had one.
    pub fn release_connection(&self) -> bool {
        self.registry.release()
    }

    /// Close every thread's connection. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        self.registry.close_all()
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Run one write statement (canonical placeholders) in its own transaction.
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub fn execute_write(&self, sql: &str, params: &[RowValues]) -> Result<usize, SessionDbError> {
        self.transactional_scope(|conn| {
            let mut cursor = self.get_cursor(conn)?;
            cursor.execute(sql, params)?;
            Ok(usize::try_from(cursor.rowcount()).unwrap_or(0))
        })
    }

    /// First row of a query, or `None` if it returns nothing.
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub fn query_one(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<NormalizedRow>, SessionDbError> {
        let conn = self.get_connection()?;
        let mut cursor = self.get_cursor(&conn)?;
        Ok(cursor.execute(sql, params)?.fetchone())
    }

    /// All rows of a query.
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub fn query_all(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<NormalizedRow>, SessionDbError> {
        let conn = self.get_connection()?;
        let mut cursor = self.get_cursor(&conn)?;
        Ok(cursor.execute(sql, params)?.fetchall())
    }

    /// Run the schema file at `path` as a script. Returns `false` without touching the
    /// database when the file does not exist.
    ///
    /// # Errors
    /// Returns `SessionDbError::ConfigError` if the file cannot be read, or the script's error.
    pub fn initialize_schema(&self, path: impl AsRef<Path>) -> Result<bool, SessionDbError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no schema file; skipping initialization");
            return Ok(false);
        }
        let script = std::fs::read_to_string(path).map_err(|e| {
            SessionDbError::ConfigError(format!("cannot read schema {}: {e}", path.display()))
        })?;
        self.execute_script(&script)?;
        info!(path = %path.display(), "schema initialized");
        Ok(true)
    }

    #[must_use]
    pub fn info(&self) -> DatabaseInfo {
        let stats = self.stats();
        let mut info = DatabaseInfo {
            mode: self.kind,
            engine: self.kind.label(),
            path: None,
            host: None,
            port: None,
            database: None,
            user: None,
            open_sessions: stats.open_sessions,
            reconnects: stats.reconnects,
        };
        match self.params() {
            ConnectionParameters::Embedded { path } => {
                info.path = Some(path.display().to_string());
            }
            ConnectionParameters::Network(net) => {
                info.host = Some(net.host.clone());
                info.port = Some(net.port);
                info.database = Some(net.dbname.clone());
                info.user = Some(net.user.clone());
            }
        }
        info
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("kind", &self.kind)
            .field("key_case", &self.key_case)
            .field("params", self.params())
            .finish_non_exhaustive()
    }
}
