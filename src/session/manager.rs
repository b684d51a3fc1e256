#[cfg(feature = "postgres")]
use crate::postgres::PgSession;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteSession;

use super::connection::EngineConnection;
use super::health;
use crate::config::ConnectionParameters;
use crate::error::SessionDbError;
use crate::types::EngineKind;

/// Opens, checks and closes the connections a [`super::SessionRegistry`] hands out.
pub trait ManageSession: Send + Sync + 'static {
    /// The connection type managed by this manager.
    type Connection: Send + 'static;

    /// Attempts to open a new connection.
    ///
    /// # Errors
    /// Whatever the engine reports; the registry propagates it untouched.
    fn connect(&self) -> Result<Self::Connection, SessionDbError>;

    /// Whether a stored connection must pass [`ManageSession::is_valid`] on every checkout.
    fn validates_on_checkout(&self) -> bool;

    /// Determines if the connection is still usable.
    fn is_valid(&self, conn: &mut Self::Connection) -> bool;

    /// Release a connection.
    ///
    /// # Errors
    /// Errors raised while closing; callers treat them as best-effort.
    fn close(&self, conn: Self::Connection) -> Result<(), SessionDbError>;
}

/// Session manager for the configured engine.
#[derive(Debug, Clone)]
pub struct EngineManager {
    params: ConnectionParameters,
}

impl EngineManager {
    #[must_use]
    pub fn new(params: ConnectionParameters) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn kind(&self) -> EngineKind {
        self.params.engine_kind()
    }

    #[must_use]
    pub fn params(&self) -> &ConnectionParameters {
        &self.params
    }
}

impl ManageSession for EngineManager {
    type Connection = EngineConnection;

    fn connect(&self) -> Result<Self::Connection, SessionDbError> {
        match &self.params {
            #[cfg(feature = "sqlite")]
            ConnectionParameters::Embedded { path } => {
                SqliteSession::open(path).map(EngineConnection::Sqlite)
            }
            #[cfg(feature = "postgres")]
            ConnectionParameters::Network(params) => {
                PgSession::connect(params).map(EngineConnection::Postgres)
            }
            #[allow(unreachable_patterns)]
            other => Err(SessionDbError::Unimplemented(format!(
                "the {} engine is not enabled in this build",
                other.engine_kind().label()
            ))),
        }
    }

    fn validates_on_checkout(&self) -> bool {
        self.kind().is_networked()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> bool {
        health::validate(conn)
    }

    fn close(&self, conn: Self::Connection) -> Result<(), SessionDbError> {
        conn.close()
    }
}
