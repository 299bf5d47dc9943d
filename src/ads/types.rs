//! Ad entities and the raw sheet shapes they are parsed from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header of the column holding the ad text.
pub const MESSAGE_FIELD: &str = "MESSAGE";

/// Header of the column holding the optional image URL.
pub const MEDIA_FIELD: &str = "MEDIA";

/// One raw sheet row, keyed by column header.
pub type Record = BTreeMap<String, String>;

/// Errors raised when building a single ad.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdError {
    #[error("Ad message is empty")]
    EmptyMessage,
}

/// A pre-authored ad snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ad {
    message: String,
    media: Option<String>,
}

impl Ad {
    /// Creates an ad from the raw `MESSAGE` and `MEDIA` cell values.
    ///
    /// An empty `media` string means the ad has no image.
    ///
    /// # Errors
    ///
    /// Returns [`AdError::EmptyMessage`] if `message` is empty.
    pub fn new(message: impl Into<String>, media: impl Into<String>) -> Result<Self, AdError> {
        let message = message.into();
        if message.is_empty() {
            return Err(AdError::EmptyMessage);
        }

        let media = media.into();
        Ok(Self {
            message,
            media: (!media.is_empty()).then_some(media),
        })
    }

    /// The ad text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The image URL, if the ad has one.
    #[must_use]
    pub fn media(&self) -> Option<&str> {
        self.media.as_deref()
    }
}

/// A category worksheet: its title and raw rows in sheet order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySheet {
    /// Category name, expected upper-case.
    pub title: String,

    /// Rows below the header, in sheet order.
    #[serde(default)]
    pub records: Vec<Record>,
}

impl CategorySheet {
    /// Creates a category sheet.
    #[must_use]
    pub fn new(title: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            title: title.into(),
            records,
        }
    }

    /// Number of raw rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if the sheet has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Builds a record with the two required columns.
#[must_use]
pub fn ad_record(message: &str, media: &str) -> Record {
    Record::from([
        (MESSAGE_FIELD.to_owned(), message.to_owned()),
        (MEDIA_FIELD.to_owned(), media.to_owned()),
    ])
}
