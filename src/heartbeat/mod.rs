//! Shared periodic tick source.
//!
//! One [`Heartbeat`] drives any number of independent listeners registered
//! in a [`ListenerRegistry`].

mod registry;
mod runner;

pub use registry::{ListenerId, ListenerRegistry, RegistryError, TickListener, TickReport};
pub use runner::{DEFAULT_TICK_INTERVAL, Heartbeat, HeartbeatMessage};
