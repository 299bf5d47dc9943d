//! Exported category sheets and their validation.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ads::{CategoryIndex, CategorySheet, ParsedAds, SchemaError, ad_record, parse_ads};

/// Errors that can occur while loading or validating sheets.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Sheet at index {index} has an empty title")]
    EmptyTitle { index: usize },

    #[error("Duplicate sheet title found: {title}")]
    DuplicateTitle { title: String },

    #[error("Sheet title '{title}' is not upper-case (queries are matched upper-case)")]
    NonCanonicalTitle { title: String },

    #[error("Sheet '{title}' is malformed: {source}")]
    Schema {
        title: String,
        #[source]
        source: SchemaError,
    },

    #[error("No sheets configured")]
    NoSheets,

    #[error("Failed to read sheets file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse sheets file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Per-sheet parse summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSummary {
    pub title: String,
    /// Valid ads in the sheet.
    pub ads: usize,
    /// Zero-based positions of rows skipped for having no message.
    pub skipped: Vec<usize>,
}

/// Every category sheet of the ad spreadsheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetBook {
    /// Worksheets in spreadsheet order.
    pub sheets: Vec<CategorySheet>,
}

impl SheetBook {
    /// Loads sheets from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SheetError> {
        let content = std::fs::read_to_string(path)?;
        let book: Self = serde_json::from_str(&content)?;
        Ok(book)
    }

    /// Saves sheets to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), SheetError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the sheet titles.
    ///
    /// Row contents are not checked here: a malformed sheet only disables
    /// its own category. Use [`SheetBook::validate_all`] for a full report.
    ///
    /// # Errors
    ///
    /// Returns the first title error encountered.
    pub fn validate(&self) -> Result<(), SheetError> {
        if self.sheets.is_empty() {
            return Err(SheetError::NoSheets);
        }

        let mut seen_titles = HashSet::new();
        for (index, sheet) in self.sheets.iter().enumerate() {
            check_title(index, sheet, &mut seen_titles)?;
        }

        Ok(())
    }

    /// Returns detailed validation results for every sheet, including row
    /// parsing.
    #[must_use]
    pub fn validate_all(&self) -> Vec<Result<SheetSummary, SheetError>> {
        if self.sheets.is_empty() {
            return vec![Err(SheetError::NoSheets)];
        }

        let mut seen_titles = HashSet::new();

        self.sheets
            .iter()
            .enumerate()
            .map(|(index, sheet)| {
                check_title(index, sheet, &mut seen_titles)?;

                let ParsedAds { ads, skipped } =
                    parse_ads(&sheet.records).map_err(|source| SheetError::Schema {
                        title: sheet.title.clone(),
                        source,
                    })?;

                Ok(SheetSummary {
                    title: sheet.title.clone(),
                    ads: ads.len(),
                    skipped,
                })
            })
            .collect()
    }

    /// Builds the category index served to queries.
    #[must_use]
    pub fn to_index(&self, min_ratio: f64) -> CategoryIndex {
        CategoryIndex::new(self.sheets.iter().cloned()).with_min_ratio(min_ratio)
    }

    /// Returns the number of sheets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Checks if there are no sheets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Creates an example sheet export for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self {
            sheets: vec![
                CategorySheet::new(
                    "VERDURAS",
                    vec![
                        ad_record("🥬 Lechuga fresca todos los días", ""),
                        ad_record(
                            "🥕 Zanahorias a mitad de precio",
                            "https://example.com/img/zanahorias.jpg",
                        ),
                    ],
                ),
                CategorySheet::new(
                    "FRUTAS",
                    vec![ad_record(
                        "🍎 Manzanas de temporada",
                        "https://example.com/img/manzanas.jpg",
                    )],
                ),
            ],
        }
    }
}

fn check_title<'a>(
    index: usize,
    sheet: &'a CategorySheet,
    seen_titles: &mut HashSet<&'a str>,
) -> Result<(), SheetError> {
    if sheet.title.is_empty() {
        return Err(SheetError::EmptyTitle { index });
    }

    if !seen_titles.insert(sheet.title.as_str()) {
        return Err(SheetError::DuplicateTitle {
            title: sheet.title.clone(),
        });
    }

    if sheet.title != sheet.title.to_uppercase() {
        return Err(SheetError::NonCanonicalTitle {
            title: sheet.title.clone(),
        });
    }

    Ok(())
}
