//! Embedded file engine backed by `rusqlite`.

pub mod params;
pub mod query;
mod session;

pub use params::Params;
pub use query::{build_result_set, sqlite_extract_value};
pub use session::SqliteSession;
