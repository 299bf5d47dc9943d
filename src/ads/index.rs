//! Fuzzy resolution of free text onto a known category.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::catalog::AdLookup;
use super::parser::parse_ads;
use super::types::CategorySheet;

/// Minimum similarity a category must strictly exceed to be accepted.
pub const MIN_MATCH_RATIO: f64 = 0.8;

/// Edit cost of replacing one character. Counting a substitution as a
/// deletion plus an insertion keeps [`similarity_ratio`] in line with the
/// usual Levenshtein ratio ("VERDURAZ" vs "VERDURAS" scores 0.875).
const SUBSTITUTION_COST: usize = 2;

/// A category scored against a query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub title: String,
    pub score: f64,
}

/// Outcome of resolving a query against the index.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// The best category scored above the threshold.
    Matched {
        sheet: &'a CategorySheet,
        score: f64,
    },
    /// No category scored above the threshold.
    NoMatch {
        /// Best-scoring category, if the index is not empty.
        best: Option<MatchCandidate>,
    },
}

/// Similarity of two strings in `[0, 1]`.
///
/// `(len_a + len_b - distance) / (len_a + len_b)` with lengths counted in
/// characters. Two empty strings are identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let distance = edit_distance(&a, &b);
    (total - distance) as f64 / total as f64
}

/// Levenshtein distance with unit insert/delete and [`SUBSTITUTION_COST`].
fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { SUBSTITUTION_COST };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Known categories keyed by title.
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    sheets: BTreeMap<String, CategorySheet>,
    min_ratio: f64,
}

impl Default for CategoryIndex {
    fn default() -> Self {
        Self {
            sheets: BTreeMap::new(),
            min_ratio: MIN_MATCH_RATIO,
        }
    }
}

impl CategoryIndex {
    /// Builds an index from category sheets. A repeated title replaces the
    /// earlier sheet.
    #[must_use]
    pub fn new(sheets: impl IntoIterator<Item = CategorySheet>) -> Self {
        let mut index = Self::default();
        for sheet in sheets {
            if let Some(previous) = index.sheets.insert(sheet.title.clone(), sheet) {
                warn!("Duplicate category '{}', keeping the last sheet", previous.title);
            }
        }
        index
    }

    /// Sets the acceptance threshold.
    #[must_use]
    pub const fn with_min_ratio(mut self, min_ratio: f64) -> Self {
        self.min_ratio = min_ratio;
        self
    }

    /// The acceptance threshold.
    #[must_use]
    pub const fn min_ratio(&self) -> f64 {
        self.min_ratio
    }

    /// Scores every category against the query, best first.
    ///
    /// Equal scores are ordered by title.
    #[must_use]
    pub fn rank(&self, query: &str) -> Vec<MatchCandidate> {
        let normalized = query.to_uppercase();
        let mut candidates: Vec<MatchCandidate> = self
            .sheets
            .keys()
            .map(|title| MatchCandidate {
                title: title.clone(),
                score: similarity_ratio(&normalized, title),
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.title.cmp(&b.title)));
        candidates
    }

    /// Best-scoring category; the smallest title wins a tie.
    #[must_use]
    pub fn best_match(&self, query: &str) -> Option<MatchCandidate> {
        let normalized = query.to_uppercase();
        let mut best: Option<MatchCandidate> = None;

        // Titles iterate in ascending order, so only a strictly higher score
        // may displace the current best.
        for title in self.sheets.keys() {
            let score = similarity_ratio(&normalized, title);
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(MatchCandidate {
                    title: title.clone(),
                    score,
                });
            }
        }

        best
    }

    /// Resolves a query to its category.
    #[must_use]
    pub fn resolve(&self, query: &str) -> Resolution<'_> {
        let best = self.best_match(query);

        match best {
            Some(candidate) if candidate.score > self.min_ratio => {
                match self.sheets.get(&candidate.title) {
                    Some(sheet) => Resolution::Matched {
                        sheet,
                        score: candidate.score,
                    },
                    None => Resolution::NoMatch {
                        best: Some(candidate),
                    },
                }
            }
            best => Resolution::NoMatch { best },
        }
    }

    /// Resolves a query and parses the matched category's ads.
    #[must_use]
    pub fn lookup(&self, query: &str) -> AdLookup {
        match self.resolve(query) {
            Resolution::Matched { sheet, score } => {
                debug!("Query '{}' matched '{}' (score {:.3})", query, sheet.title, score);
                match parse_ads(&sheet.records) {
                    Ok(parsed) => AdLookup::Ads {
                        category: sheet.title.clone(),
                        ads: parsed.ads,
                    },
                    Err(error) => AdLookup::Misconfigured {
                        category: sheet.title.clone(),
                        error,
                    },
                }
            }
            Resolution::NoMatch { best } => {
                if let Some(best) = best {
                    debug!(
                        "Query '{}' has no category (closest '{}', score {:.3})",
                        query, best.title, best.score
                    );
                }
                AdLookup::NoAdsAvailable
            }
        }
    }

    /// Gets a category by exact title.
    #[must_use]
    pub fn get(&self, title: &str) -> Option<&CategorySheet> {
        self.sheets.get(title)
    }

    /// Category titles in ascending order.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Checks if there are no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::types::{Ad, MESSAGE_FIELD, Record, ad_record};

    fn index(titles: &[&str]) -> CategoryIndex {
        CategoryIndex::new(titles.iter().map(|t| CategorySheet::new(*t, vec![])))
    }

    fn matched_title(resolution: &Resolution<'_>) -> Option<String> {
        match resolution {
            Resolution::Matched { sheet, .. } => Some(sheet.title.clone()),
            Resolution::NoMatch { .. } => None,
        }
    }

    #[test]
    fn test_ratio_identical_is_one() {
        assert!((similarity_ratio("VERDURAS", "VERDURAS") - 1.0).abs() < f64::EPSILON);
        assert!((similarity_ratio("ñandú", "ñandú") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_one_substitution() {
        assert!((similarity_ratio("VERDURAZ", "VERDURAS") - 0.875).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_disjoint_is_zero() {
        assert!(similarity_ratio("ABC", "XYZ").abs() < f64::EPSILON);
        assert!(similarity_ratio("", "ABC").abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_is_symmetric() {
        let forward = similarity_ratio("FRUTAS", "FRUTILLAS");
        let backward = similarity_ratio("FRUTILLAS", "FRUTAS");
        assert!((forward - backward).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_case_normalized_query() {
        let idx = index(&["VERDURAS"]);
        let lower = idx.best_match("verduras").unwrap();
        let upper = idx.best_match("VERDURAS").unwrap();
        assert!((lower.score - upper.score).abs() < f64::EPSILON);
        assert!((lower.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_typo() {
        let idx = index(&["VERDURAS", "FRUTAS"]);
        assert_eq!(matched_title(&idx.resolve("verduraz")).as_deref(), Some("VERDURAS"));
    }

    #[test]
    fn test_resolve_garbage_is_no_match() {
        let idx = index(&["VERDURAS", "FRUTAS"]);
        let resolution = idx.resolve("xyz123");
        assert!(matches!(resolution, Resolution::NoMatch { best: Some(ref b) } if b.score < 0.8));
    }

    #[test]
    fn test_resolve_threshold_is_strict() {
        // one substitution over ten characters scores exactly 0.8
        let idx = index(&["ABCDE"]);
        let best = idx.best_match("abcdx").unwrap();
        assert!((best.score - 0.8).abs() < f64::EPSILON);
        assert_eq!(matched_title(&idx.resolve("abcdx")), None);

        let idx = index(&["ABCDEF"]);
        assert_eq!(matched_title(&idx.resolve("abcdex")).as_deref(), Some("ABCDEF"));
    }

    #[test]
    fn test_resolve_tie_prefers_smallest_title() {
        let idx = index(&["ABCDEFGHIY", "ABCDEFGHIX"]);
        assert_eq!(matched_title(&idx.resolve("abcdefghiz")).as_deref(), Some("ABCDEFGHIX"));
    }

    #[test]
    fn test_resolve_empty_index() {
        let idx = CategoryIndex::default();
        assert_eq!(idx.resolve("anything"), Resolution::NoMatch { best: None });
    }

    #[test]
    fn test_custom_threshold() {
        let idx = index(&["FRUTAS"]).with_min_ratio(0.5);
        assert_eq!(matched_title(&idx.resolve("frutillas")).as_deref(), Some("FRUTAS"));
    }

    #[test]
    fn test_rank_orders_by_score_then_title() {
        let idx = index(&["FRUTAS", "VERDURAS", "CARNES"]);
        let ranked = idx.rank("verdura");
        assert_eq!(ranked[0].title, "VERDURAS");
        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_lookup_distinguishes_outcomes() {
        let mut broken = Record::new();
        broken.insert(MESSAGE_FIELD.to_owned(), "orphan".to_owned());

        let idx = CategoryIndex::new(vec![
            CategorySheet::new("VERDURAS", vec![ad_record("Lechuga", "")]),
            CategorySheet::new("FRUTAS", vec![]),
            CategorySheet::new("CARNES", vec![broken]),
        ]);

        assert_eq!(
            idx.lookup("verduras"),
            AdLookup::Ads {
                category: "VERDURAS".to_owned(),
                ads: vec![Ad::new("Lechuga", "").unwrap()],
            }
        );
        assert_eq!(
            idx.lookup("frutas"),
            AdLookup::Ads {
                category: "FRUTAS".to_owned(),
                ads: vec![],
            }
        );
        assert!(matches!(idx.lookup("carnes"), AdLookup::Misconfigured { .. }));
        assert_eq!(idx.lookup("xyz123"), AdLookup::NoAdsAvailable);
    }

    #[test]
    fn test_duplicate_titles_keep_last() {
        let idx = CategoryIndex::new(vec![
            CategorySheet::new("FRUTAS", vec![]),
            CategorySheet::new("FRUTAS", vec![ad_record("Manzana", "")]),
        ]);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("FRUTAS").map(CategorySheet::len), Some(1));
    }
}
