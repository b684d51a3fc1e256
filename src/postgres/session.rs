use std::fmt;
use std::future::Future;

use tokio::runtime::{Builder, Runtime};
use tokio_postgres::{Client, Config, NoTls};
use tracing::debug;

use super::params::Params;
use super::query::build_result_set;
use crate::config::NetworkParameters;
use crate::error::SessionDbError;
use crate::results::ResultSet;
use crate::session::StatementOutcome;
use crate::types::{KeyCase, RowValues};

/// Translate resolved parameters into a `tokio_postgres` configuration.
#[must_use]
pub fn pg_config(params: &NetworkParameters) -> Config {
    let mut config = Config::new();
    config
        .host(params.host.as_str())
        .port(params.port)
        .dbname(params.dbname.as_str())
        .user(params.user.as_str())
        .application_name(params.application_name.as_str())
        .connect_timeout(params.connect_timeout);
    if let Some(password) = &params.password {
        config.password(password.as_str());
    }
    config
}

/// Blocking session over one `tokio_postgres` client.
///
/// The session owns a current-thread runtime; the client's connection task only makes progress
/// while a call on this session is blocked in [`PgSession::block_on`].
pub struct PgSession {
    client: Client,
    runtime: Runtime,
    marked_closed: bool,
    in_transaction: bool,
}

impl PgSession {
    /// Connect with the given parameters, honoring their connect timeout.
    ///
    /// # Errors
    /// Returns `SessionDbError::PostgresError` when the server refuses or the timeout elapses,
    /// or `SessionDbError::ConnectionError` if the session runtime cannot be built.
    pub fn connect(params: &NetworkParameters) -> Result<Self, SessionDbError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                SessionDbError::ConnectionError(format!(
                    "failed to build postgres session runtime: {e}"
                ))
            })?;
        let config = pg_config(params);
        let (client, connection) = runtime.block_on(config.connect(NoTls))?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "postgres connection task ended with error");
            }
        });
        debug!(
            host = %params.host,
            port = params.port,
            dbname = %params.dbname,
            "postgres session opened"
        );
        Ok(Self {
            client,
            runtime,
            marked_closed: false,
            in_transaction: false,
        })
    }

    /// Drive `future` to completion on this session's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Borrow the raw client, e.g. to pass into [`PgSession::block_on`].
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Run one statement, materializing rows when it produces any.
    ///
    /// # Errors
    /// Returns `SessionDbError::PostgresError` on prepare or execution failure.
    pub fn run(
        &mut self,
        sql: &str,
        params: &[RowValues],
        key_case: KeyCase,
    ) -> Result<StatementOutcome, SessionDbError> {
        let converted = Params::convert(params);
        let stmt = self.block_on(self.client.prepare(sql))?;
        let result = if stmt.columns().is_empty() {
            let affected = self.block_on(self.client.execute(&stmt, converted.as_refs()))?;
            ResultSet::affected(usize::try_from(affected).map_err(|e| {
                SessionDbError::ExecutionError(format!("invalid rows affected count: {e}"))
            })?)
        } else {
            let rows = self.block_on(self.client.query(&stmt, converted.as_refs()))?;
            let column_names = stmt
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect();
            build_result_set(column_names, &rows, key_case)?
        };
        Ok(StatementOutcome {
            result,
            last_insert_id: None,
        })
    }

    /// Run statements over the simple query protocol.
    ///
    /// # Errors
    /// Returns `SessionDbError::PostgresError` on the first failing statement.
    pub fn batch_execute(&mut self, sql: &str) -> Result<(), SessionDbError> {
        self.block_on(self.client.batch_execute(sql))?;
        Ok(())
    }

    /// Cheap liveness flag: no round trip.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.marked_closed || self.client.is_closed()
    }

    /// Flag this session as dead so the next checkout replaces it.
    pub fn mark_closed(&mut self) {
        self.marked_closed = true;
    }

    /// One round trip to the server.
    ///
    /// # Errors
    /// Returns `SessionDbError::PostgresError` if the server does not answer.
    pub fn ping(&mut self) -> Result<(), SessionDbError> {
        self.block_on(self.client.simple_query("SELECT 1"))?;
        Ok(())
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub(crate) fn begin(&mut self) -> Result<(), SessionDbError> {
        self.batch_execute("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    pub(crate) fn commit(&mut self) -> Result<(), SessionDbError> {
        let result = self.batch_execute("COMMIT");
        if result.is_ok() {
            self.in_transaction = false;
        }
        result
    }

    pub(crate) fn rollback(&mut self) -> Result<(), SessionDbError> {
        // the server ends the transaction even when ROLLBACK reports an error
        self.in_transaction = false;
        self.batch_execute("ROLLBACK")
    }
}

impl fmt::Debug for PgSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSession")
            .field("closed", &self.is_closed())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}
