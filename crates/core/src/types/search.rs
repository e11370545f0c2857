//! Search suggestion types.

use serde::{Deserialize, Serialize};

use super::money::Money;

/// Category of a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Product,
    Article,
    Page,
    Collection,
    /// A past search term served when the remote endpoint fails.
    History,
}

impl SuggestionKind {
    /// Label shown under the suggestion title.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Article => "Article",
            Self::Page => "Page",
            Self::Collection => "Collection",
            Self::History => "Recent search",
        }
    }
}

/// One normalized suggestion row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_count: Option<u32>,
}

impl Suggestion {
    /// A bare suggestion with only the required fields set.
    #[must_use]
    pub fn new(kind: SuggestionKind, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            url: url.into(),
            image: None,
            price: None,
            category: None,
            summary: None,
            product_count: None,
        }
    }
}

/// Cached suggestions for one exact query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionCacheEntry {
    pub suggestions: Vec<Suggestion>,
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
}

impl SuggestionCacheEntry {
    /// Whether the entry is older than `ttl_ms` at `now_ms`.
    ///
    /// An entry exactly `ttl_ms` old is still fresh.
    #[must_use]
    pub const fn is_expired(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms - self.timestamp > ttl_ms
    }
}

/// One remembered search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub term: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}
