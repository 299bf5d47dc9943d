//! Ad categories: fuzzy category resolution and ad parsing.

mod catalog;
mod index;
mod parser;
mod types;

pub use catalog::{AdCatalog, AdLookup};
pub use index::{CategoryIndex, MIN_MATCH_RATIO, MatchCandidate, Resolution, similarity_ratio};
pub use parser::{ParsedAds, SchemaError, parse_ads};
pub use types::{Ad, AdError, CategorySheet, MEDIA_FIELD, MESSAGE_FIELD, Record, ad_record};
