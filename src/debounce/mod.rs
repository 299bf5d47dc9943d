//! Per-owner debouncing driven by the shared heartbeat.
//!
//! A [`DebounceBuffer`] keeps only the most recent payload of its owner and
//! hands it to a callback once `timeout` ticks pass without a new one.

mod buffer;
mod state;

pub use buffer::{ConfigurationError, DebounceBuffer, DebounceBuilder, FireCallback};
pub use state::{DEFAULT_TIMEOUT_TICKS, DebounceState, Payload};
