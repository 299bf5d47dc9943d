//! Heartbeat runner.
//!
//! Broadcasts a tick to every registered listener once per interval until
//! told to shut down, then closes the registry so no listener outlives the
//! tick source.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace};

use super::ListenerRegistry;

/// Default interval between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Messages that can be sent to the heartbeat.
#[derive(Debug, Clone)]
pub enum HeartbeatMessage {
    /// Broadcast one extra tick immediately.
    TickNow,
    /// Stop ticking and close the registry.
    Shutdown,
}

/// Periodic tick source.
pub struct Heartbeat {
    /// Listeners to notify.
    registry: Arc<ListenerRegistry>,

    /// Time between ticks.
    interval: Duration,

    /// Ticks broadcast so far.
    ticks: AtomicU64,
}

impl Heartbeat {
    /// Creates a heartbeat over the given registry.
    #[must_use]
    pub fn new(registry: Arc<ListenerRegistry>) -> Self {
        Self {
            registry,
            interval: DEFAULT_TICK_INTERVAL,
            ticks: AtomicU64::new(0),
        }
    }

    /// Sets the interval between ticks.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs the tick loop.
    pub async fn run(&self, mut rx: mpsc::Receiver<HeartbeatMessage>) {
        info!("Heartbeat started ({:?} interval)", self.interval);

        // The first tick lands one full interval after start.
        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.tick();
                }
                msg = rx.recv() => {
                    match msg {
                        Some(HeartbeatMessage::TickNow) => {
                            debug!("Received manual tick");
                            self.tick();
                        }
                        Some(HeartbeatMessage::Shutdown) | None => {
                            info!("Heartbeat shutting down");
                            break;
                        }
                    }
                }
            }
        }

        self.registry.close();
    }

    /// Single tick of the heartbeat.
    fn tick(&self) {
        let report = self.registry.broadcast();
        let count = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;

        trace!(
            "Tick {}: delivered={}, pruned={}, failed={}",
            count, report.delivered, report.pruned, report.failed
        );
    }

    /// Number of ticks broadcast so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heartbeat")
            .field("interval", &self.interval)
            .field("ticks", &self.ticks())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Weak;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::heartbeat::TickListener;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl TickListener for Counter {
        fn on_tick(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_ticks_once_per_interval() {
        let registry = Arc::new(ListenerRegistry::new());
        let counter = Arc::new(Counter::default());
        registry
            .register("counter".into(), Arc::downgrade(&counter) as Weak<dyn TickListener>)
            .unwrap();

        let heartbeat = Arc::new(Heartbeat::new(Arc::clone(&registry)));
        let (tx, rx) = mpsc::channel(4);
        let runner = Arc::clone(&heartbeat);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);

        tx.send(HeartbeatMessage::Shutdown).await.unwrap();
        handle.await.unwrap();

        assert_eq!(heartbeat.ticks(), 3);
        assert!(registry.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_tick() {
        let registry = Arc::new(ListenerRegistry::new());
        let counter = Arc::new(Counter::default());
        registry
            .register("counter".into(), Arc::downgrade(&counter) as Weak<dyn TickListener>)
            .unwrap();

        let heartbeat = Heartbeat::new(Arc::clone(&registry)).with_interval(Duration::from_secs(60));
        let (tx, rx) = mpsc::channel(4);
        tx.send(HeartbeatMessage::TickNow).await.unwrap();
        tx.send(HeartbeatMessage::TickNow).await.unwrap();
        drop(tx);

        heartbeat.run(rx).await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert!(registry.is_closed());
    }
}
