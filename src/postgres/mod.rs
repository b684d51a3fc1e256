//! Network server engine backed by `tokio-postgres`.

pub mod params;
pub mod query;
mod session;

pub use params::Params;
pub use query::{build_result_set, postgres_extract_value};
pub use session::{PgSession, pg_config};
