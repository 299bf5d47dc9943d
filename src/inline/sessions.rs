//! Per-user debounced query sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::debounce::{ConfigurationError, DebounceBuffer, Payload};
use crate::heartbeat::{ListenerId, ListenerRegistry, RegistryError, TickListener};

/// Default number of idle ticks before a session is evicted.
pub const DEFAULT_IDLE_TICKS: u32 = 300;

/// Listener id of the idle sweep. User ids are numeric, so it cannot clash.
const SWEEP_LISTENER_ID: &str = "session-sweep";

/// An inline query received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineQuery {
    /// Transport-assigned query identifier, echoed in the answer.
    pub id: String,
    pub user_id: i64,
    pub text: String,
}

impl InlineQuery {
    /// Creates an inline query.
    #[must_use]
    pub fn new(id: impl Into<String>, user_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id,
            text: text.into(),
        }
    }
}

impl Payload for InlineQuery {
    fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

struct Session {
    buffer: Arc<DebounceBuffer<InlineQuery>>,
    idle_ticks: u32,
}

/// Debounce buffers of active users.
///
/// Each user's latest query is released to the returned channel once the
/// user has stopped typing for the configured number of ticks. Sessions
/// with nothing pending for `idle_ticks` sweeps are evicted, see
/// [`UserSessions::watch_idle`].
pub struct UserSessions {
    registry: Arc<ListenerRegistry>,
    debounce_ticks: u32,
    idle_ticks: u32,
    sessions: Mutex<HashMap<i64, Session>>,
    ready_tx: mpsc::UnboundedSender<InlineQuery>,
}

impl UserSessions {
    /// Creates an empty session table and the receiver of settled queries.
    #[must_use]
    pub fn new(
        registry: Arc<ListenerRegistry>,
        debounce_ticks: u32,
        idle_ticks: u32,
    ) -> (Self, mpsc::UnboundedReceiver<InlineQuery>) {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let sessions = Self {
            registry,
            debounce_ticks,
            idle_ticks,
            sessions: Mutex::new(HashMap::new()),
            ready_tx,
        };
        (sessions, ready_rx)
    }

    /// Registers the idle sweep with the heartbeat, so every tick runs
    /// [`UserSessions::evict_idle`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] once the registry has been closed.
    pub fn watch_idle(self: &Arc<Self>) -> Result<(), RegistryError> {
        let listener = Arc::downgrade(self) as Weak<dyn TickListener>;
        self.registry.register(ListenerId::from(SWEEP_LISTENER_ID), listener)
    }

    /// Buffers a query for its user, creating the user's session if needed.
    ///
    /// Returns `Ok(false)` for an empty query.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if a new session cannot be
    /// registered with the heartbeat.
    pub fn submit(&self, query: InlineQuery) -> Result<bool, ConfigurationError> {
        if query.is_blank() {
            return Ok(false);
        }

        let user_id = query.user_id;
        info!("User {} buffering '{}'", user_id, query.text);

        // Armed under the table lock so a sweep cannot evict the session
        // between lookup and arming.
        let mut sessions = self.lock();
        if let Some(session) = sessions.get_mut(&user_id) {
            session.idle_ticks = 0;
            return Ok(session.buffer.set_data(query));
        }

        let buffer = self.open_session(user_id)?;
        let accepted = buffer.set_data(query);
        sessions.insert(user_id, Session { buffer, idle_ticks: 0 });
        info!("Session opened for user {}", user_id);
        Ok(accepted)
    }

    /// Ends a user's session, dropping any pending query.
    ///
    /// Returns whether the user had a session.
    pub fn end_session(&self, user_id: i64) -> bool {
        let removed = self.lock().remove(&user_id);
        match removed {
            Some(session) => {
                session.buffer.unregister();
                info!("Session closed for user {}", user_id);
                true
            }
            None => false,
        }
    }

    /// Counts one idle tick for every session without a pending query and
    /// evicts those idle for `idle_ticks` ticks.
    ///
    /// Returns the number of evicted sessions.
    pub fn evict_idle(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();

        sessions.retain(|user_id, session| {
            if session.buffer.is_armed() {
                session.idle_ticks = 0;
                return true;
            }

            session.idle_ticks = session.idle_ticks.saturating_add(1);
            if session.idle_ticks < self.idle_ticks {
                return true;
            }

            session.buffer.unregister();
            debug!("Listener {} evicted", session.buffer.id());
            info!("Session for user {} idle, evicted", user_id);
            false
        });

        before - sessions.len()
    }

    /// Checks if a user has a session.
    #[must_use]
    pub fn contains(&self, user_id: i64) -> bool {
        self.lock().contains_key(&user_id)
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Checks if no session is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of users with a query still waiting out its quiet period.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock()
            .values()
            .filter(|session| session.buffer.is_armed())
            .count()
    }

    fn open_session(&self, user_id: i64) -> Result<Arc<DebounceBuffer<InlineQuery>>, ConfigurationError> {
        let ready_tx = self.ready_tx.clone();

        DebounceBuffer::builder(user_id)
            .timeout(self.debounce_ticks)
            .registry(&self.registry)
            .on_fire(move |query: InlineQuery| {
                if ready_tx.send(query).is_err() {
                    warn!("Query resolver stopped, dropping settled query for user {}", user_id);
                }
            })
            .build()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TickListener for UserSessions {
    fn on_tick(&self) {
        self.evict_idle();
    }
}

impl std::fmt::Debug for UserSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSessions")
            .field("debounce_ticks", &self.debounce_ticks)
            .field("idle_ticks", &self.idle_ticks)
            .field("sessions", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions(ticks: u32) -> (Arc<ListenerRegistry>, UserSessions, mpsc::UnboundedReceiver<InlineQuery>) {
        let registry = Arc::new(ListenerRegistry::new());
        let (sessions, rx) = UserSessions::new(Arc::clone(&registry), ticks, DEFAULT_IDLE_TICKS);
        (registry, sessions, rx)
    }

    fn watched_sessions(
        ticks: u32,
        idle_ticks: u32,
    ) -> (Arc<ListenerRegistry>, Arc<UserSessions>, mpsc::UnboundedReceiver<InlineQuery>) {
        let registry = Arc::new(ListenerRegistry::new());
        let (sessions, rx) = UserSessions::new(Arc::clone(&registry), ticks, idle_ticks);
        let sessions = Arc::new(sessions);
        sessions.watch_idle().unwrap();
        (registry, sessions, rx)
    }

    #[test]
    fn test_empty_query_rejected() {
        let (_registry, sessions, _rx) = sessions(3);
        assert!(!sessions.submit(InlineQuery::new("q1", 1, "")).unwrap());
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_burst_releases_latest_query_once() {
        let (registry, sessions, mut rx) = sessions(3);

        sessions.submit(InlineQuery::new("q1", 7, "ver")).unwrap();
        registry.broadcast();
        sessions.submit(InlineQuery::new("q2", 7, "verdu")).unwrap();
        registry.broadcast();
        sessions.submit(InlineQuery::new("q3", 7, "verduras")).unwrap();
        assert_eq!(sessions.pending(), 1);

        for _ in 0..3 {
            registry.broadcast();
        }

        assert_eq!(rx.try_recv().unwrap(), InlineQuery::new("q3", 7, "verduras"));
        assert!(rx.try_recv().is_err());
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.pending(), 0);
    }

    #[test]
    fn test_users_debounced_separately() {
        let (registry, sessions, mut rx) = sessions(1);

        sessions.submit(InlineQuery::new("a", 1, "frutas")).unwrap();
        sessions.submit(InlineQuery::new("b", 2, "carnes")).unwrap();
        registry.broadcast();

        let mut released = vec![rx.try_recv().unwrap().user_id, rx.try_recv().unwrap().user_id];
        released.sort_unstable();
        assert_eq!(released, vec![1, 2]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_end_session_drops_pending_query() {
        let (registry, sessions, mut rx) = sessions(1);

        sessions.submit(InlineQuery::new("a", 1, "frutas")).unwrap();
        assert!(sessions.end_session(1));
        assert!(!sessions.end_session(1));

        registry.broadcast();
        assert!(rx.try_recv().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_submit_after_registry_closed_fails() {
        let (registry, sessions, _rx) = sessions(1);
        registry.close();
        assert!(sessions.submit(InlineQuery::new("a", 1, "frutas")).is_err());
        assert!(!sessions.contains(1));
    }

    #[test]
    fn test_idle_sessions_evicted_and_unregistered() {
        let (registry, sessions, mut rx) = watched_sessions(1, 5);

        for user_id in 0..1000 {
            sessions.submit(InlineQuery::new(format!("q{user_id}"), user_id, "frutas")).unwrap();
        }
        assert_eq!(registry.len(), 1001);

        // First tick fires every buffer, the next five count as idle.
        for _ in 0..6 {
            registry.broadcast();
        }

        assert!(sessions.is_empty());
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&ListenerId::from(7_i64)));
        assert_eq!(registry.broadcast().delivered, 1);

        let mut released = 0;
        while rx.try_recv().is_ok() {
            released += 1;
        }
        assert_eq!(released, 1000);
    }

    #[test]
    fn test_activity_keeps_session_alive() {
        let (registry, sessions, _rx) = watched_sessions(1, 3);

        for _ in 0..10 {
            sessions.submit(InlineQuery::new("q", 4, "carnes")).unwrap();
            registry.broadcast();
            registry.broadcast();
        }
        assert!(sessions.contains(4));

        for _ in 0..3 {
            registry.broadcast();
        }
        assert!(!sessions.contains(4));
    }

    #[test]
    fn test_pending_session_never_evicted() {
        let (_registry, sessions, _rx) = sessions(50);

        sessions.submit(InlineQuery::new("q", 9, "verduras")).unwrap();
        for _ in 0..DEFAULT_IDLE_TICKS + 1 {
            assert_eq!(sessions.evict_idle(), 0);
        }
        assert!(sessions.contains(9));
    }

    #[test]
    fn test_evicted_user_gets_fresh_session() {
        let (registry, sessions, mut rx) = watched_sessions(1, 1);

        sessions.submit(InlineQuery::new("q1", 3, "frutas")).unwrap();
        registry.broadcast();
        registry.broadcast();
        assert!(!sessions.contains(3));

        sessions.submit(InlineQuery::new("q2", 3, "carnes")).unwrap();
        registry.broadcast();
        assert_eq!(rx.try_recv().unwrap().id, "q1");
        assert_eq!(rx.try_recv().unwrap().id, "q2");
    }
}
