//! Suggestion list and match highlighting.

use askama::Template;
use regex::RegexBuilder;
use scifi_theme_core::{Suggestion, SuggestionKind};

use super::{escape_html, format_money};

/// Escape `title` and wrap case-insensitive literal matches of `query` in `<mark>`.
///
/// The query is matched literally against the raw title, so it never lands
/// inside an entity produced by escaping.
#[must_use]
pub fn highlight(title: &str, query: &str) -> String {
    let needle = query.trim();
    if needle.is_empty() {
        return escape_html(title);
    }

    let pattern = match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::warn!(error = %e, "Highlight pattern rejected");
            return escape_html(title);
        }
    };

    let mut out = String::with_capacity(title.len());
    let mut last = 0;
    for found in pattern.find_iter(title) {
        out.push_str(&escape_html(title.get(last..found.start()).unwrap_or_default()));
        out.push_str("<mark>");
        out.push_str(&escape_html(found.as_str()));
        out.push_str("</mark>");
        last = found.end();
    }
    out.push_str(&escape_html(title.get(last..).unwrap_or_default()));
    out
}

/// Suggestion display data for templates.
#[derive(Debug, Clone)]
pub struct SuggestionView {
    pub kind: &'static str,
    pub kind_class: &'static str,
    /// Escaped title with `<mark>` highlights.
    pub title_html: String,
    pub url: String,
    pub image: Option<String>,
    pub price: Option<String>,
    pub detail: Option<String>,
    pub selected: bool,
}

impl SuggestionView {
    #[must_use]
    pub fn new(suggestion: &Suggestion, query: &str, selected: bool) -> Self {
        let detail = match suggestion.kind {
            SuggestionKind::Collection => suggestion
                .product_count
                .map(|count| format!("{count} products")),
            SuggestionKind::Product => suggestion.category.clone(),
            SuggestionKind::Article | SuggestionKind::Page | SuggestionKind::History => {
                suggestion.summary.clone()
            }
        };

        Self {
            kind: suggestion.kind.label(),
            kind_class: match suggestion.kind {
                SuggestionKind::Product => "product",
                SuggestionKind::Article => "article",
                SuggestionKind::Page => "page",
                SuggestionKind::Collection => "collection",
                SuggestionKind::History => "history",
            },
            title_html: highlight(&suggestion.title, query),
            url: suggestion.url.clone(),
            image: suggestion.image.clone(),
            price: suggestion.price.map(format_money),
            detail,
            selected,
        }
    }
}

/// Suggestion dropdown fragment.
#[derive(Template)]
#[template(path = "search/suggestions.html")]
pub struct SuggestionListTemplate {
    pub query: String,
    pub search_url: String,
    pub suggestions: Vec<SuggestionView>,
}

impl SuggestionListTemplate {
    /// Build the list for `query`, marking the suggestion at `selected`.
    #[must_use]
    pub fn new(query: &str, suggestions: &[Suggestion], selected: Option<usize>) -> Self {
        Self {
            query: query.to_string(),
            search_url: format!("/search?q={}", urlencoding::encode(query)),
            suggestions: suggestions
                .iter()
                .enumerate()
                .map(|(index, suggestion)| {
                    SuggestionView::new(suggestion, query, selected == Some(index))
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scifi_theme_core::Money;

    use super::*;

    #[test]
    fn test_highlight_case_insensitive() {
        assert_eq!(
            highlight("Quantum Drive", "quantum"),
            "<mark>Quantum</mark> Drive"
        );
        assert_eq!(highlight("Warp warp", "WARP"), "<mark>Warp</mark> <mark>warp</mark>");
    }

    #[test]
    fn test_highlight_literal_metacharacters() {
        assert_eq!(highlight("C++ (beta)", "c++"), "<mark>C++</mark> (beta)");
        assert_eq!(highlight("a.b", "."), "a<mark>.</mark>b");
    }

    #[test]
    fn test_highlight_escapes_markup() {
        assert_eq!(
            highlight("<b>Laser</b>", "laser"),
            "&lt;b&gt;<mark>Laser</mark>&lt;/b&gt;"
        );
        assert_eq!(highlight("Laser", ""), "Laser");
    }

    #[test]
    fn test_highlight_ignores_entity_text() {
        assert_eq!(highlight("R&D Lab", "amp"), "R&amp;D Lab");
        assert_eq!(highlight("Size <XL>", "lt"), "Size &lt;XL&gt;");
    }

    #[test]
    fn test_highlight_matches_escaped_characters() {
        assert_eq!(highlight("R&D Lab", "&"), "R<mark>&amp;</mark>D Lab");
        assert_eq!(highlight("Size <XL>", "<xl>"), "Size <mark>&lt;XL&gt;</mark>");
    }

    #[test]
    fn test_suggestion_list_renders() {
        let suggestion = Suggestion {
            price: Some(Money::from_cents(1999)),
            ..Suggestion::new(SuggestionKind::Product, "Photon Boots", "/products/photon-boots")
        };
        let html = SuggestionListTemplate::new("photon boots", &[suggestion], Some(0))
            .render()
            .unwrap();

        assert!(html.contains("<mark>Photon Boots</mark>"));
        assert!(html.contains("$19.99"));
        assert!(html.contains("is-selected"));
        assert!(html.contains("/search?q=photon%20boots"));
    }
}
