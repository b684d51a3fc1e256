//! Per-thread connection ownership.

mod connection;
mod health;
mod manager;
mod registry;

pub use connection::{EngineConnection, PooledConnection};
pub use health::validate;
pub use manager::{EngineManager, ManageSession};
pub use registry::{RegistryStats, SessionRegistry};

use crate::results::ResultSet;

/// What one statement produced.
#[derive(Debug, Clone, Default)]
pub struct StatementOutcome {
    pub result: ResultSet,
    /// Row id of the last insert, captured right after the statement (`SQLite` only).
    pub last_insert_id: Option<i64>,
}
