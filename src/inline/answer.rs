//! Inline results built from ads.

use serde::Serialize;

use crate::ads::Ad;

/// Characters of the message shown in a result title.
const TITLE_PREVIEW_CHARS: usize = 20;

/// One entry of an inline answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineResult {
    /// Ad with an image.
    Photo {
        id: String,
        title: String,
        description: String,
        photo_url: String,
        thumb_url: String,
        caption: String,
    },
    /// Text-only ad.
    Article {
        id: String,
        title: String,
        description: String,
        message_text: String,
    },
}

impl InlineResult {
    /// Builds the result for one ad.
    #[must_use]
    pub fn from_ad(id: String, ad: &Ad) -> Self {
        let title = preview_title(ad.message());
        let description = ad.message().to_owned();

        match ad.media() {
            Some(url) => Self::Photo {
                id,
                title,
                description,
                photo_url: url.to_owned(),
                thumb_url: url.to_owned(),
                caption: ad.message().to_owned(),
            },
            None => Self::Article {
                id,
                title,
                description,
                message_text: ad.message().to_owned(),
            },
        }
    }

    /// The result identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Photo { id, .. } | Self::Article { id, .. } => id,
        }
    }
}

/// Answer to one inline query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineAnswer {
    pub query_id: String,
    pub user_id: i64,
    pub category: String,
    pub results: Vec<InlineResult>,
    pub cache_time_secs: u32,
}

/// Builds one result per ad, in ad order, with ids unique within the query.
#[must_use]
pub fn build_results(query_id: &str, ads: &[Ad]) -> Vec<InlineResult> {
    ads.iter()
        .enumerate()
        .map(|(i, ad)| InlineResult::from_ad(format!("{query_id}-{i}"), ad))
        .collect()
}

fn preview_title(message: &str) -> String {
    format!("{}...", message.chars().take(TITLE_PREVIEW_CHARS).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_for_media_ad() {
        let ad = Ad::new("Sale!", "http://x/z.jpg").unwrap();
        let result = InlineResult::from_ad("q-0".to_owned(), &ad);
        assert_eq!(
            result,
            InlineResult::Photo {
                id: "q-0".to_owned(),
                title: "Sale!...".to_owned(),
                description: "Sale!".to_owned(),
                photo_url: "http://x/z.jpg".to_owned(),
                thumb_url: "http://x/z.jpg".to_owned(),
                caption: "Sale!".to_owned(),
            }
        );
    }

    #[test]
    fn test_article_for_text_ad() {
        let ad = Ad::new("Buy now", "").unwrap();
        assert!(matches!(
            InlineResult::from_ad("q-0".to_owned(), &ad),
            InlineResult::Article { ref message_text, .. } if message_text == "Buy now"
        ));
    }

    #[test]
    fn test_title_truncated_by_chars() {
        assert_eq!(preview_title("ñ".repeat(30).as_str()), format!("{}...", "ñ".repeat(20)));
    }

    #[test]
    fn test_build_results_unique_ids() {
        let ads = vec![Ad::new("one", "").unwrap(), Ad::new("two", "").unwrap()];
        let results = build_results("q7", &ads);
        let ids: Vec<&str> = results.iter().map(InlineResult::id).collect();
        assert_eq!(ids, vec!["q7-0", "q7-1"]);
    }

    #[test]
    fn test_result_serializes_with_type_tag() {
        let ad = Ad::new("Buy now", "").unwrap();
        let json = serde_json::to_value(InlineResult::from_ad("q-0".to_owned(), &ad)).unwrap();
        assert_eq!(json["type"], "article");
        assert_eq!(json["message_text"], "Buy now");
    }
}
