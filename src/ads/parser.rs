//! Tolerant parsing of raw sheet rows into ads.
//!
//! A row with an empty message is skipped and parsing continues. A row that
//! lacks one of the required columns means the sheet itself is malformed, so
//! the whole parse fails with a [`SchemaError`] instead of returning a
//! partial list.

use thiserror::Error;
use tracing::debug;

use super::types::{Ad, MEDIA_FIELD, MESSAGE_FIELD, Record};

/// The sheet does not have the expected column layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Record #{} is missing required field '{field}'", .index + 1)]
    MissingField {
        /// Zero-based position of the offending record.
        index: usize,
        field: &'static str,
    },
}

/// Ads parsed from one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAds {
    /// Valid ads in sheet order.
    pub ads: Vec<Ad>,

    /// Zero-based positions of records skipped for having no message.
    pub skipped: Vec<usize>,
}

/// Parses raw records into ads, preserving input order.
///
/// # Errors
///
/// Returns [`SchemaError::MissingField`] on the first record lacking
/// `MESSAGE` or `MEDIA`.
pub fn parse_ads(records: &[Record]) -> Result<ParsedAds, SchemaError> {
    let mut parsed = ParsedAds::default();

    for (index, record) in records.iter().enumerate() {
        let message = required_field(record, index, MESSAGE_FIELD)?;
        let media = required_field(record, index, MEDIA_FIELD)?;

        match Ad::new(message, media) {
            Ok(ad) => parsed.ads.push(ad),
            Err(e) => {
                debug!("Skipping record #{}: {}", index + 1, e);
                parsed.skipped.push(index);
            }
        }
    }

    Ok(parsed)
}

fn required_field<'a>(
    record: &'a Record,
    index: usize,
    field: &'static str,
) -> Result<&'a str, SchemaError> {
    record
        .get(field)
        .map(String::as_str)
        .ok_or(SchemaError::MissingField { index, field })
}
