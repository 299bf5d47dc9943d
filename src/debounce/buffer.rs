//! Debounced callback registered with the heartbeat.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;
use tracing::{debug, trace};

use super::state::{DEFAULT_TIMEOUT_TICKS, DebounceState, Payload};
use crate::heartbeat::{ListenerId, ListenerRegistry, RegistryError, TickListener};

/// Callback receiving the payload at the end of a quiet period.
pub type FireCallback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Errors that prevent a debounce buffer from being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Debounce buffer '{0}' has no fire callback")]
    MissingCallback(ListenerId),

    #[error("Debounce buffer '{0}' has no tick registry")]
    MissingRegistry(ListenerId),

    #[error("Debounce buffer '{id}' could not register: {source}")]
    Registration {
        id: ListenerId,
        #[source]
        source: RegistryError,
    },
}

/// Builder for [`DebounceBuffer`].
pub struct DebounceBuilder<T> {
    id: ListenerId,
    timeout: u32,
    on_fire: Option<FireCallback<T>>,
    registry: Option<Arc<ListenerRegistry>>,
}

impl<T: Payload> DebounceBuilder<T> {
    /// Starts a builder for the listener `id`.
    #[must_use]
    pub fn new(id: impl Into<ListenerId>) -> Self {
        Self {
            id: id.into(),
            timeout: DEFAULT_TIMEOUT_TICKS,
            on_fire: None,
            registry: None,
        }
    }

    /// Quiet ticks required before firing. Zero falls back to the default.
    #[must_use]
    pub const fn timeout(mut self, ticks: u32) -> Self {
        self.timeout = ticks;
        self
    }

    /// Callback invoked with the latest payload after a quiet period.
    #[must_use]
    pub fn on_fire(mut self, callback: impl Fn(T) + Send + Sync + 'static) -> Self {
        self.on_fire = Some(Box::new(callback));
        self
    }

    /// Registry of the heartbeat that drives the countdown.
    #[must_use]
    pub fn registry(mut self, registry: &Arc<ListenerRegistry>) -> Self {
        self.registry = Some(Arc::clone(registry));
        self
    }

    /// Builds the buffer and registers it for ticks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the callback or registry is
    /// missing, or the registry no longer accepts listeners.
    pub fn build(self) -> Result<Arc<DebounceBuffer<T>>, ConfigurationError> {
        let Some(on_fire) = self.on_fire else {
            return Err(ConfigurationError::MissingCallback(self.id));
        };
        let Some(registry) = self.registry else {
            return Err(ConfigurationError::MissingRegistry(self.id));
        };

        if self.timeout == 0 {
            debug!(
                "Debounce buffer {} requested zero timeout, using {}",
                self.id, DEFAULT_TIMEOUT_TICKS
            );
        }

        let buffer = Arc::new(DebounceBuffer {
            id: self.id.clone(),
            state: Mutex::new(DebounceState::new(self.timeout)),
            on_fire,
            registry: Arc::downgrade(&registry),
        });

        let listener = Arc::downgrade(&buffer) as Weak<dyn TickListener>;
        registry
            .register(self.id.clone(), listener)
            .map_err(|source| ConfigurationError::Registration {
                id: self.id,
                source,
            })?;

        Ok(buffer)
    }
}

/// Holds the latest payload of one owner and fires it once the owner has
/// been quiet for `timeout` ticks.
///
/// Dropping the buffer removes it from the registry.
pub struct DebounceBuffer<T> {
    id: ListenerId,
    state: Mutex<DebounceState<T>>,
    on_fire: FireCallback<T>,
    registry: Weak<ListenerRegistry>,
}

impl<T: Payload> DebounceBuffer<T> {
    /// Starts a builder for the listener `id`.
    #[must_use]
    pub fn builder(id: impl Into<ListenerId>) -> DebounceBuilder<T> {
        DebounceBuilder::new(id)
    }

    /// Replaces the pending payload and restarts the countdown.
    ///
    /// Returns `false` if the payload was blank and ignored.
    pub fn set_data(&self, payload: T) -> bool {
        let accepted = self.lock().set_data(payload);
        if accepted {
            trace!("Debounce buffer {} armed", self.id);
        }
        accepted
    }

    /// Checks if a payload is waiting to fire.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.lock().is_armed()
    }

    /// Quiet ticks required before firing.
    #[must_use]
    pub fn timeout(&self) -> u32 {
        self.lock().timeout()
    }

    /// The listener identifier.
    #[must_use]
    pub const fn id(&self) -> &ListenerId {
        &self.id
    }

    /// Stops receiving ticks. Safe to call more than once.
    pub fn unregister(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, DebounceState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Payload> TickListener for DebounceBuffer<T> {
    fn on_tick(&self) {
        // The state is back to idle before the callback runs.
        let fired = self.lock().on_tick();

        if let Some(payload) = fired {
            debug!("Debounce buffer {} fired", self.id);
            (self.on_fire)(payload);
        }
    }
}

impl<T> Drop for DebounceBuffer<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.prune(&self.id);
        }
    }
}

impl<T> fmt::Debug for DebounceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceBuffer")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
