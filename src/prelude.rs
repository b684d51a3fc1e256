//! Convenient imports for common functionality.

pub use crate::config::{ConnectionParameters, DatabaseSettings, NetworkParameters};
pub use crate::cursor::NormalizedCursor;
pub use crate::database::Database;
pub use crate::error::SessionDbError;
pub use crate::query_builder::{BuiltQuery, SqlBuilder};
pub use crate::results::{NormalizedRow, ResultSet};
pub use crate::session::{EngineConnection, PooledConnection};
pub use crate::transaction::TransactionGuard;
pub use crate::types::{EngineKind, KeyCase, RowValues};
