//! Shared, reloadable view of the category index.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use super::index::CategoryIndex;
use super::parser::SchemaError;
use super::types::Ad;

/// Result of looking up ads for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdLookup {
    /// A category matched; `ads` may legitimately be empty.
    Ads { category: String, ads: Vec<Ad> },

    /// No category is close enough to the query.
    NoAdsAvailable,

    /// A category matched but its sheet lacks a required column.
    Misconfigured { category: String, error: SchemaError },
}

/// The category index shared between query workers.
///
/// Readers take a snapshot of the current index; [`AdCatalog::reload`]
/// swaps in a whole new one, so no reader sees a half-updated set.
#[derive(Debug, Default)]
pub struct AdCatalog {
    index: RwLock<Arc<CategoryIndex>>,
}

impl AdCatalog {
    /// Creates a catalog serving the given index.
    #[must_use]
    pub fn new(index: CategoryIndex) -> Self {
        Self {
            index: RwLock::new(Arc::new(index)),
        }
    }

    /// Returns the index currently being served.
    pub async fn snapshot(&self) -> Arc<CategoryIndex> {
        Arc::clone(&*self.index.read().await)
    }

    /// Replaces the served index, returning the previous category count.
    pub async fn reload(&self, index: CategoryIndex) -> usize {
        let new_len = index.len();
        let mut current = self.index.write().await;
        let old_len = current.len();
        *current = Arc::new(index);

        info!("Category index reloaded: {} → {} categories", old_len, new_len);
        old_len
    }

    /// Resolves a query to its category and parses that category's ads.
    ///
    /// The parser only runs when a category matched.
    pub async fn resolve_ads(&self, query: &str) -> AdLookup {
        let index = self.snapshot().await;
        let lookup = index.lookup(query);

        if let AdLookup::Misconfigured { category, error } = &lookup {
            error!("Category '{}' is misconfigured: {}", category, error);
        }

        lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::types::{CategorySheet, ad_record};

    fn catalog() -> AdCatalog {
        AdCatalog::new(CategoryIndex::new(vec![
            CategorySheet::new("VERDURAS", vec![ad_record("Lechuga fresca", "")]),
            CategorySheet::new("FRUTAS", vec![]),
        ]))
    }

    #[tokio::test]
    async fn test_resolve_ads_found() {
        let lookup = catalog().resolve_ads("verduraz").await;
        assert!(matches!(lookup, AdLookup::Ads { ref category, ref ads } if category == "VERDURAS" && ads.len() == 1));
    }

    #[tokio::test]
    async fn test_resolve_ads_no_match() {
        assert_eq!(catalog().resolve_ads("xyz123").await, AdLookup::NoAdsAvailable);
    }

    #[tokio::test]
    async fn test_reload_swaps_index() {
        let catalog = catalog();
        let old_snapshot = catalog.snapshot().await;

        let old_len = catalog
            .reload(CategoryIndex::new(vec![CategorySheet::new("CARNES", vec![])]))
            .await;

        assert_eq!(old_len, 2);
        assert_eq!(old_snapshot.len(), 2);
        assert_eq!(catalog.snapshot().await.len(), 1);
        assert_eq!(catalog.resolve_ads("verduras").await, AdLookup::NoAdsAvailable);
    }
}
