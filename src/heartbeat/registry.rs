//! Listener registry shared by the heartbeat and its listeners.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;
use tracing::{debug, warn};

/// Something notified once per heartbeat tick.
pub trait TickListener: Send + Sync {
    /// Called once per tick. Must not block.
    fn on_tick(&self);
}

/// Caller-chosen identifier of a registered listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(String);

impl ListenerId {
    /// Creates a listener identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<i64> for ListenerId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ListenerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ListenerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur during listener registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tick registry is closed")]
    Closed,
}

/// Summary of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Listeners that were notified.
    pub delivered: usize,

    /// Entries dropped because their listener no longer exists.
    pub pruned: usize,

    /// Listeners that panicked while handling the tick.
    pub failed: usize,
}

#[derive(Default)]
struct Listeners {
    entries: HashMap<ListenerId, Weak<dyn TickListener>>,
    closed: bool,
}

/// Table of listeners notified on every tick.
///
/// Entries hold weak references, so a listener dropped by its owner
/// disappears from the table on the next broadcast at the latest.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Listeners>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener under `id`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] once the registry has been closed.
    pub fn register(
        &self,
        id: ListenerId,
        listener: Weak<dyn TickListener>,
    ) -> Result<(), RegistryError> {
        let mut listeners = self.lock();
        if listeners.closed {
            return Err(RegistryError::Closed);
        }

        if listeners.entries.insert(id.clone(), listener).is_some() {
            debug!("Listener {} re-registered", id);
        } else {
            debug!("Listener {} registered", id);
        }
        Ok(())
    }

    /// Removes the listener registered under `id`.
    ///
    /// Unknown ids are ignored. Returns whether an entry was removed.
    pub fn unregister(&self, id: &ListenerId) -> bool {
        let removed = self.lock().entries.remove(id).is_some();
        if removed {
            debug!("Listener {} unregistered", id);
        }
        removed
    }

    /// Removes the entry under `id` only if its listener no longer exists.
    pub(crate) fn prune(&self, id: &ListenerId) {
        let mut listeners = self.lock();
        if listeners
            .entries
            .get(id)
            .is_some_and(|weak| weak.strong_count() == 0)
        {
            listeners.entries.remove(id);
            debug!("Listener {} pruned", id);
        }
    }

    /// Checks if a listener is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &ListenerId) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Checks if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Checks if the registry has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Drops all listeners and rejects further registrations.
    pub fn close(&self) {
        let mut listeners = self.lock();
        listeners.closed = true;
        listeners.entries.clear();
    }

    /// Notifies every live listener once.
    ///
    /// The table lock is released before any listener runs, and a panicking
    /// listener does not stop delivery to the others.
    pub fn broadcast(&self) -> TickReport {
        let mut report = TickReport::default();

        let live: Vec<(ListenerId, Arc<dyn TickListener>)> = {
            let mut listeners = self.lock();
            let before = listeners.entries.len();
            let mut live = Vec::with_capacity(before);

            listeners.entries.retain(|id, weak| match weak.upgrade() {
                Some(listener) => {
                    live.push((id.clone(), listener));
                    true
                }
                None => false,
            });

            report.pruned = before - listeners.entries.len();
            live
        };

        for (id, listener) in live {
            if catch_unwind(AssertUnwindSafe(|| listener.on_tick())).is_ok() {
                report.delivered += 1;
            } else {
                report.failed += 1;
                warn!("Listener {} panicked during tick", id);
            }
        }

        report
    }

    fn lock(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.lock();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &listeners.entries.len())
            .field("closed", &listeners.closed)
            .finish()
    }
}
