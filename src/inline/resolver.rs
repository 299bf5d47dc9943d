//! Worker that turns settled queries into answers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::answer::{InlineAnswer, build_results};
use super::sessions::InlineQuery;
use crate::ads::{AdCatalog, AdLookup};

/// Default time the client may cache an answer.
pub const DEFAULT_CACHE_TIME_SECS: u32 = 60;

/// Resolves settled queries against the ad catalog.
#[derive(Debug, Clone)]
pub struct QueryResolver {
    catalog: Arc<AdCatalog>,
    cache_time_secs: u32,
}

impl QueryResolver {
    /// Creates a resolver over the given catalog.
    #[must_use]
    pub fn new(catalog: Arc<AdCatalog>) -> Self {
        Self {
            catalog,
            cache_time_secs: DEFAULT_CACHE_TIME_SECS,
        }
    }

    /// Sets the cache time attached to answers.
    #[must_use]
    pub const fn with_cache_time(mut self, secs: u32) -> Self {
        self.cache_time_secs = secs;
        self
    }

    /// Builds the answer for a query.
    ///
    /// Returns `None` when no category matches or the matched category is
    /// misconfigured; a matched category without ads yields an empty answer.
    pub async fn answer(&self, query: &InlineQuery) -> Option<InlineAnswer> {
        info!("User {} processing '{}'", query.user_id, query.text);

        match self.catalog.resolve_ads(&query.text).await {
            AdLookup::Ads { category, ads } => Some(InlineAnswer {
                query_id: query.id.clone(),
                user_id: query.user_id,
                results: build_results(&query.id, &ads),
                category,
                cache_time_secs: self.cache_time_secs,
            }),
            AdLookup::NoAdsAvailable => {
                info!("No category for '{}' from user {}", query.text, query.user_id);
                None
            }
            AdLookup::Misconfigured { category, .. } => {
                warn!(
                    "Not answering user {}: category '{}' is misconfigured",
                    query.user_id, category
                );
                None
            }
        }
    }

    /// Answers settled queries until either channel closes.
    pub async fn run(
        self,
        mut queries: mpsc::UnboundedReceiver<InlineQuery>,
        answers: mpsc::Sender<InlineAnswer>,
    ) {
        info!("Query resolver started");

        while let Some(query) = queries.recv().await {
            let Some(answer) = self.answer(&query).await else {
                continue;
            };

            if answers.send(answer).await.is_err() {
                warn!("Answer channel closed, stopping resolver");
                break;
            }
        }

        info!("Query resolver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::{CategoryIndex, CategorySheet, MESSAGE_FIELD, Record, ad_record};

    fn resolver() -> QueryResolver {
        let mut broken = Record::new();
        broken.insert(MESSAGE_FIELD.to_owned(), "orphan".to_owned());

        let index = CategoryIndex::new(vec![
            CategorySheet::new(
                "VERDURAS",
                vec![
                    ad_record("Buy now", ""),
                    ad_record("", "http://x/y.jpg"),
                    ad_record("Sale!", "http://x/z.jpg"),
                ],
            ),
            CategorySheet::new("FRUTAS", vec![]),
            CategorySheet::new("CARNES", vec![broken]),
        ]);
        QueryResolver::new(Arc::new(AdCatalog::new(index))).with_cache_time(30)
    }

    #[tokio::test]
    async fn test_answer_matched_category() {
        let answer = resolver()
            .answer(&InlineQuery::new("q1", 5, "verduraz"))
            .await
            .unwrap();

        assert_eq!(answer.query_id, "q1");
        assert_eq!(answer.category, "VERDURAS");
        assert_eq!(answer.cache_time_secs, 30);
        assert_eq!(answer.results.len(), 2);
    }

    #[tokio::test]
    async fn test_answer_empty_category_is_empty_answer() {
        let answer = resolver().answer(&InlineQuery::new("q1", 5, "frutas")).await;
        assert!(answer.is_some_and(|a| a.results.is_empty()));
    }

    #[tokio::test]
    async fn test_no_answer_without_match_or_on_schema_error() {
        let resolver = resolver();
        assert!(resolver.answer(&InlineQuery::new("q1", 5, "xyz123")).await.is_none());
        assert!(resolver.answer(&InlineQuery::new("q2", 5, "carnes")).await.is_none());
    }

    #[tokio::test]
    async fn test_run_forwards_answers() {
        let (query_tx, query_rx) = mpsc::unbounded_channel();
        let (answer_tx, mut answer_rx) = mpsc::channel(4);

        query_tx.send(InlineQuery::new("q1", 5, "xyz123")).unwrap();
        query_tx.send(InlineQuery::new("q2", 5, "verduras")).unwrap();
        drop(query_tx);

        resolver().run(query_rx, answer_tx).await;

        let answer = answer_rx.recv().await.unwrap();
        assert_eq!(answer.query_id, "q2");
        assert!(answer_rx.recv().await.is_none());
    }
}
