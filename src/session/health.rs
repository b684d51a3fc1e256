use tracing::debug;

use super::connection::EngineConnection;

/// Check whether a stored connection can still serve statements.
///
/// Embedded connections are never pinged. Network connections fail fast on the client's closed
/// flag. Outside a transaction they then make one `SELECT 1` round trip; an error, or the flag
/// flipping during the ping, marks the connection stale. Inside a transaction the flag alone
/// decides, so a statement error never evicts the connection a scope is using.
pub fn validate(conn: &mut EngineConnection) -> bool {
    match conn {
        #[cfg(feature = "sqlite")]
        EngineConnection::Sqlite(_) => true,
        #[cfg(feature = "postgres")]
        EngineConnection::Postgres(session) => {
            if session.is_closed() {
                return false;
            }
            // an aborted transaction rejects every statement, so only the flag is trusted
            if session.in_transaction() {
                return true;
            }
            match session.ping() {
                Ok(()) => !session.is_closed(),
                Err(e) => {
                    debug!(error = %e, "postgres liveness ping failed");
                    false
                }
            }
        }
    }
}
