//! Engine selection and connection parameters.
//!
//! Settings come from the environment (optionally seeded from a `.env` file) or from any
//! serde source. [`resolve`] turns them into an [`EngineKind`] and the matching
//! [`ConnectionParameters`]; it is a pure function of its input and runs once per
//! [`crate::Database`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionDbError;
use crate::types::EngineKind;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_MODE: &str = "DB_MODE";
pub const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
pub const ENV_HOST: &str = "DB_HOST";
pub const ENV_PORT: &str = "DB_PORT";
pub const ENV_NAME: &str = "DB_NAME";
pub const ENV_USER: &str = "DB_USER";
pub const ENV_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_CONNECT_TIMEOUT: &str = "DB_CONNECT_TIMEOUT";
pub const ENV_APPLICATION_NAME: &str = "DB_APPLICATION_NAME";

pub const DEFAULT_DATABASE_PATH: &str = "data/app.db";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DBNAME: &str = "app";
pub const DEFAULT_USER: &str = "postgres";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_APPLICATION_NAME: &str = "sql-session";

/// Raw, unresolved database settings.
///
/// Every field is optional; [`resolve`] applies the documented defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Full connection URL (`postgres://`, `postgresql://` or `sqlite://`).
    pub database_url: Option<String>,
    /// Explicit engine flag.
    pub mode: Option<EngineKind>,
    pub database_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Connect timeout in seconds.
    pub connect_timeout: Option<u64>,
    pub application_name: Option<String>,
}

impl DatabaseSettings {
    /// Read settings from the process environment after loading `.env` if one exists.
    ///
    /// # Errors
    /// Returns `SessionDbError::ConfigError` if a numeric field or the mode flag is malformed.
    pub fn from_env() -> Result<Self, SessionDbError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// Empty values count as unset, except text fields for the network engine, where an
    /// explicit empty string is kept (an empty host is then rejected by [`resolve`]).
    ///
    /// # Errors
    /// Returns `SessionDbError::ConfigError` if a numeric field or the mode flag is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionDbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let non_empty = |key: &str| raw(key).filter(|v| !v.is_empty());

        let mode = non_empty(ENV_MODE)
            .map(|v| v.parse::<EngineKind>())
            .transpose()?;
        let port = non_empty(ENV_PORT)
            .map(|v| {
                v.parse::<u16>().map_err(|e| {
                    SessionDbError::ConfigError(format!("{ENV_PORT}={v:?} is not a port: {e}"))
                })
            })
            .transpose()?;
        let connect_timeout = non_empty(ENV_CONNECT_TIMEOUT)
            .map(|v| {
                v.parse::<u64>().map_err(|e| {
                    SessionDbError::ConfigError(format!(
                        "{ENV_CONNECT_TIMEOUT}={v:?} is not a number of seconds: {e}"
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            database_url: non_empty(ENV_DATABASE_URL),
            mode,
            database_path: non_empty(ENV_DATABASE_PATH),
            host: raw(ENV_HOST),
            port,
            dbname: raw(ENV_NAME),
            user: raw(ENV_USER),
            // passwords are not trimmed
            password: lookup(ENV_PASSWORD),
            connect_timeout,
            application_name: raw(ENV_APPLICATION_NAME),
        })
    }
}

/// Parameters for the network engine.
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkParameters {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    /// Tag reported to the server so sessions can be identified in `pg_stat_activity`.
    pub application_name: String,
}

impl NetworkParameters {
    fn from_settings(settings: &DatabaseSettings) -> Self {
        Self {
            host: settings
                .host
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: settings.port.unwrap_or(DEFAULT_PORT),
            dbname: settings
                .dbname
                .clone()
                .unwrap_or_else(|| DEFAULT_DBNAME.to_string()),
            user: settings
                .user
                .clone()
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: settings.password.clone().filter(|p| !p.is_empty()),
            connect_timeout: Duration::from_secs(
                settings
                    .connect_timeout
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            application_name: settings
                .application_name
                .clone()
                .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string()),
        }
    }

    #[cfg(feature = "postgres")]
    fn overlay_url(&mut self, url: &str) -> Result<(), SessionDbError> {
        use tokio_postgres::config::Host;

        let parsed: tokio_postgres::Config = url.parse().map_err(|e| {
            SessionDbError::ConfigError(format!("invalid {ENV_DATABASE_URL}: {e}"))
        })?;

        if let Some(host) = parsed.get_hosts().first() {
            #[allow(unreachable_patterns)]
            let host = match host {
                Host::Tcp(name) => name.clone(),
                #[cfg(unix)]
                Host::Unix(path) => path.display().to_string(),
                _ => String::new(),
            };
            if !host.is_empty() {
                self.host = host;
            }
        }
        if let Some(port) = parsed.get_ports().first() {
            self.port = *port;
        }
        if let Some(dbname) = parsed.get_dbname() {
            self.dbname = dbname.to_string();
        }
        if let Some(user) = parsed.get_user() {
            self.user = user.to_string();
        }
        if let Some(password) = parsed.get_password() {
            self.password = Some(String::from_utf8_lossy(password).into_owned());
        }
        if let Some(timeout) = parsed.get_connect_timeout() {
            self.connect_timeout = *timeout;
        }
        if let Some(name) = parsed.get_application_name() {
            self.application_name = name.to_string();
        }
        Ok(())
    }

    #[cfg(not(feature = "postgres"))]
    fn overlay_url(&mut self, _url: &str) -> Result<(), SessionDbError> {
        Err(SessionDbError::Unimplemented(
            "network engine support is not enabled in this build".to_string(),
        ))
    }
}

impl fmt::Debug for NetworkParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("application_name", &self.application_name)
            .finish()
    }
}

/// Resolved, immutable connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionParameters {
    /// Path of the embedded database file.
    Embedded { path: PathBuf },
    Network(NetworkParameters),
}

impl ConnectionParameters {
    #[must_use]
    pub fn engine_kind(&self) -> EngineKind {
        match self {
            ConnectionParameters::Embedded { .. } => EngineKind::EmbeddedFile,
            ConnectionParameters::Network(_) => EngineKind::NetworkServer,
        }
    }
}

fn is_network_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("postgres://") || lower.starts_with("postgresql://")
}

fn sqlite_url_path(url: &str) -> Option<&str> {
    url.strip_prefix("sqlite://").filter(|path| !path.is_empty())
}

/// Decide the engine and derive its connection parameters.
///
/// Priority: a network `database_url` wins over `mode`, which wins over the embedded default.
///
/// # Errors
/// Returns `SessionDbError::ConfigError` when the network engine is selected but no usable
/// host can be derived, or when the URL cannot be parsed.
pub fn resolve(
    settings: &DatabaseSettings,
) -> Result<(EngineKind, ConnectionParameters), SessionDbError> {
    let url = settings
        .database_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let network_url = url.filter(|u| is_network_url(u));

    let kind = if network_url.is_some() {
        EngineKind::NetworkServer
    } else {
        settings.mode.unwrap_or(EngineKind::EmbeddedFile)
    };

    let params = match kind {
        EngineKind::EmbeddedFile => {
            let path = url
                .and_then(sqlite_url_path)
                .or(settings.database_path.as_deref())
                .unwrap_or(DEFAULT_DATABASE_PATH);
            ConnectionParameters::Embedded {
                path: PathBuf::from(path),
            }
        }
        EngineKind::NetworkServer => {
            let mut params = NetworkParameters::from_settings(settings);
            if let Some(url) = network_url {
                params.overlay_url(url)?;
            }
            if params.host.trim().is_empty() {
                return Err(SessionDbError::ConfigError(
                    "networked mode selected but no database host could be derived".to_string(),
                ));
            }
            ConnectionParameters::Network(params)
        }
    };

    Ok((kind, params))
}
