//! Inline query handling.
//!
//! Queries are debounced per user in [`UserSessions`]; settled queries flow
//! through a channel to the [`QueryResolver`], which produces
//! [`InlineAnswer`]s for the transport.

mod answer;
mod resolver;
mod sessions;

pub use answer::{InlineAnswer, InlineResult, build_results};
pub use resolver::{DEFAULT_CACHE_TIME_SECS, QueryResolver};
pub use sessions::{DEFAULT_IDLE_TICKS, InlineQuery, UserSessions};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::ads::{AdCatalog, CategoryIndex, CategorySheet, ad_record};
    use crate::heartbeat::{Heartbeat, HeartbeatMessage, ListenerRegistry};

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_gets_one_answer() {
        let registry = Arc::new(ListenerRegistry::new());
        let catalog = Arc::new(AdCatalog::new(CategoryIndex::new(vec![CategorySheet::new(
            "VERDURAS",
            vec![ad_record("Lechuga fresca", "")],
        )])));

        let (heartbeat_tx, heartbeat_rx) = mpsc::channel(4);
        let heartbeat = Heartbeat::new(Arc::clone(&registry));
        let heartbeat_handle = tokio::spawn(async move { heartbeat.run(heartbeat_rx).await });

        let (sessions, settled_rx) = UserSessions::new(Arc::clone(&registry), 3, DEFAULT_IDLE_TICKS);
        let (answer_tx, mut answer_rx) = mpsc::channel(4);
        tokio::spawn(QueryResolver::new(catalog).run(settled_rx, answer_tx));

        for (i, text) in ["v", "verd", "verduraz"].into_iter().enumerate() {
            sessions.submit(InlineQuery::new(format!("q{i}"), 11, text)).unwrap();
            tokio::time::sleep(Duration::from_millis(1300)).await;
        }

        let answer = tokio::time::timeout(Duration::from_secs(10), answer_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(answer.query_id, "q2");
        assert_eq!(answer.category, "VERDURAS");
        assert_eq!(answer.results.len(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(answer_rx.try_recv().is_err());

        heartbeat_tx.send(HeartbeatMessage::Shutdown).await.unwrap();
        heartbeat_handle.await.unwrap();
        assert!(registry.is_closed());
    }
}
