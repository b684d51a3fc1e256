use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::connection::{PooledConnection, Slot};
use super::manager::{EngineManager, ManageSession};
use crate::error::SessionDbError;

/// Snapshot of registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Threads currently holding a connection.
    pub open_sessions: usize,
    /// Stale connections silently replaced since construction.
    pub reconnects: u64,
}

/// Hands every thread its own connection, opened lazily and kept until [`close_all`].
///
/// The map lock covers bookkeeping only; connecting, pinging and closing happen outside it.
///
/// [`close_all`]: SessionRegistry::close_all
pub struct SessionRegistry<M: ManageSession = EngineManager> {
    manager: M,
    slots: Mutex<HashMap<ThreadId, Arc<Slot<M::Connection>>>>,
    next_id: AtomicU64,
    reconnects: AtomicU64,
}

impl<M: ManageSession> SessionRegistry<M> {
    #[must_use]
    pub fn new(manager: M) -> Self {
        info!(
            validates_on_checkout = manager.validates_on_checkout(),
            "session registry created"
        );
        Self {
            manager,
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            reconnects: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn manager(&self) -> &M {
        &self.manager
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<ThreadId, Arc<Slot<M::Connection>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The calling thread's connection, opening or repairing it as needed.
    ///
    /// # Errors
    /// Errors from opening a connection propagate unchanged; no entry is stored for the thread.
    pub fn get_connection(&self) -> Result<PooledConnection<M::Connection>, SessionDbError> {
        let thread = thread::current().id();
        let existing = self.lock_slots().get(&thread).cloned();

        let Some(slot) = existing else {
            return self.open_slot(thread);
        };

        let usable = if self.manager.validates_on_checkout() {
            slot.with_conn(|conn| self.manager.is_valid(conn))
                .unwrap_or(false)
        } else {
            slot.is_open()
        };
        if usable {
            return Ok(PooledConnection::new(slot));
        }

        self.evict(thread, &slot);
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        warn!(
            thread = ?thread,
            session = slot.id(),
            "stale connection detected; reconnecting"
        );
        let replacement = self.open_slot(thread)?;
        if let Some(stale) = slot.take() {
            if let Err(e) = self.manager.close(stale) {
                debug!(session = slot.id(), error = %e, "closing stale connection failed");
            }
        }
        Ok(replacement)
    }

    fn open_slot(&self, thread: ThreadId) -> Result<PooledConnection<M::Connection>, SessionDbError> {
        let conn = self.manager.connect()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot::new(id, thread, conn));
        self.lock_slots().insert(thread, Arc::clone(&slot));
        debug!(thread = ?thread, session = id, "session opened");
        Ok(PooledConnection::new(slot))
    }

    fn evict(&self, thread: ThreadId, slot: &Arc<Slot<M::Connection>>) {
        let mut slots = self.lock_slots();
        if slots.get(&thread).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(&thread);
        }
    }

    /// Close the calling thread's connection, if it has one. Worker threads that are about to
    /// exit call this so their entry does not outlive them.
    pub fn release(&self) -> bool {
        let thread = thread::current().id();
        let Some(slot) = self.lock_slots().remove(&thread) else {
            return false;
        };
        if let Some(conn) = slot.take() {
            if let Err(e) = self.manager.close(conn) {
                debug!(session = slot.id(), error = %e, "closing session failed");
            }
        }
        debug!(thread = ?thread, session = slot.id(), "session released");
        true
    }

    /// Close every stored connection and empty the registry. Returns how many were closed.
    ///
    /// Close failures are logged, never returned. Later checkouts open fresh connections.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.lock_slots().drain().map(|(_, slot)| slot).collect();
        let mut closed = 0;
        for slot in drained {
            if let Some(conn) = slot.take() {
                closed += 1;
                match self.manager.close(conn) {
                    Ok(()) => debug!(session = slot.id(), "session closed"),
                    Err(e) => debug!(session = slot.id(), error = %e, "closing session failed"),
                }
            }
        }
        info!(closed, "closed all sessions");
        closed
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            open_sessions: self.lock_slots().len(),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}
