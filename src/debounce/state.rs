//! Debounce countdown state machine.
//!
//! ```text
//! IDLE  --set_data-->            ARMED (countdown = timeout)
//! ARMED --set_data-->            ARMED (countdown = timeout, payload replaced)
//! ARMED --tick, countdown > 1--> ARMED (countdown - 1)
//! ARMED --tick, countdown = 1--> IDLE  (payload fired)
//! IDLE  --tick-->                IDLE
//! ```

/// Timeout used when a timeout below one tick is requested.
pub const DEFAULT_TIMEOUT_TICKS: u32 = 3;

/// A value that can be debounced.
pub trait Payload: Send + 'static {
    /// Blank payloads are ignored by `set_data`.
    fn is_blank(&self) -> bool {
        false
    }
}

impl Payload for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Countdown and pending payload of one debounced owner.
#[derive(Debug)]
pub struct DebounceState<T> {
    payload: Option<T>,
    countdown: u32,
    timeout: u32,
}

impl<T: Payload> DebounceState<T> {
    /// Creates an idle state. A zero timeout becomes [`DEFAULT_TIMEOUT_TICKS`].
    #[must_use]
    pub fn new(timeout: u32) -> Self {
        Self {
            payload: None,
            countdown: 0,
            timeout: if timeout >= 1 {
                timeout
            } else {
                DEFAULT_TIMEOUT_TICKS
            },
        }
    }

    /// Stores the payload and restarts the countdown.
    ///
    /// Returns `false` and leaves the state untouched for a blank payload.
    pub fn set_data(&mut self, payload: T) -> bool {
        if payload.is_blank() {
            return false;
        }

        self.payload = Some(payload);
        self.countdown = self.timeout;
        true
    }

    /// Advances the countdown by one tick.
    ///
    /// Returns the payload when this tick ends the quiet period.
    pub fn on_tick(&mut self) -> Option<T> {
        if self.countdown == 0 {
            return None;
        }

        self.countdown -= 1;
        if self.countdown == 0 {
            self.payload.take()
        } else {
            None
        }
    }

    /// Checks if a payload is waiting to fire.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.countdown > 0
    }

    /// Ticks left before the pending payload fires.
    #[must_use]
    pub const fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Quiet ticks required before firing.
    #[must_use]
    pub const fn timeout(&self) -> u32 {
        self.timeout
    }
}
