//! One connection per thread for `SQLite` or `PostgreSQL`, behind a single blocking API.
//!
//! ```rust
//! use sql_session::prelude::*;
//!
//! # fn main() -> Result<(), SessionDbError> {
//! # let dir = tempfile::tempdir().map_err(|e| SessionDbError::ConfigError(e.to_string()))?;
//! let db = Database::new(
//!     EngineKind::EmbeddedFile,
//!     ConnectionParameters::Embedded { path: dir.path().join("app.db") },
//! )?;
//! db.execute_script("CREATE TABLE persons (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")?;
//!
//! let conn = db.get_connection()?;
//! let mut cursor = db.get_cursor(&conn)?;
//! cursor.execute("INSERT INTO persons (name) VALUES (?)", &["ana".into()])?;
//! let id = db.last_insert_id(&cursor, Some("persons"), Some("id"))?;
//!
//! let row = db
//!     .query_one("SELECT id, name FROM persons WHERE id = ?", &[id.into()])?
//!     .expect("inserted row");
//! assert_eq!(row.get("NAME").and_then(RowValues::as_text), Some("ana"));
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable at least one of the `sqlite` or `postgres` features");

pub mod config;
pub mod cursor;
pub mod database;
pub mod error;
pub mod identity;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod session;
pub mod transaction;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{ConnectionParameters, DatabaseSettings, NetworkParameters, resolve};
pub use cursor::NormalizedCursor;
pub use database::{Database, DatabaseInfo};
pub use error::SessionDbError;
pub use identity::last_insert_id;
pub use query_builder::{BuiltQuery, SqlBuilder, SqlFragment};
pub use results::{NormalizedRow, ResultSet};
pub use session::{
    EngineConnection, EngineManager, ManageSession, PooledConnection, RegistryStats,
    SessionRegistry,
};
pub use transaction::{TransactionGuard, run_in_transaction};
pub use translation::{CANONICAL_PLACEHOLDER, PlaceholderStyle, rewrite, split_statements};
pub use types::{EngineKind, KeyCase, RowValues};
