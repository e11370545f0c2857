//! HTML fragments for the theme's dynamic regions.
//!
//! Templates live in `templates/` and receive preformatted view models: every
//! price is already a display string, so templates never do arithmetic.
//! Each region is re-rendered wholesale from the current store snapshot.

mod cart;
mod search;
mod wishlist;

pub use cart::{CartCountTemplate, CartLineView, CartSidebarTemplate, CartView, FreeShippingView};
pub use search::{SuggestionListTemplate, SuggestionView, highlight};
pub use wishlist::{WishlistItemView, WishlistPanelTemplate};

use scifi_theme_core::Money;
use thiserror::Error;

/// Errors from rendering a fragment.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Format cents as a display price (`$12.34`).
#[must_use]
pub fn format_money(money: Money) -> String {
    format!("${money}")
}

/// Escape text for inclusion in HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Money::from_cents(123_456)), "$1234.56");
        assert_eq!(format_money(Money::ZERO), "$0.00");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }
}
