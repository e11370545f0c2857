//! Wishlist panel.

use askama::Template;
use scifi_theme_core::WishlistEntry;

use super::format_money;

/// Wishlist entry display data for templates.
#[derive(Debug, Clone)]
pub struct WishlistItemView {
    pub id: String,
    pub title: String,
    pub url: String,
    pub image: Option<String>,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub vendor: Option<String>,
    pub purchasable: bool,
}

impl From<&WishlistEntry> for WishlistItemView {
    fn from(entry: &WishlistEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            title: entry.title.clone(),
            url: entry.url.clone(),
            image: entry.image.clone(),
            price: format_money(entry.price),
            compare_at_price: entry
                .compare_at_price
                .filter(|compare| *compare > entry.price)
                .map(format_money),
            vendor: entry.vendor.clone(),
            purchasable: entry.is_purchasable(),
        }
    }
}

/// Wishlist panel fragment.
#[derive(Template)]
#[template(path = "wishlist/panel.html")]
pub struct WishlistPanelTemplate {
    pub items: Vec<WishlistItemView>,
}

impl WishlistPanelTemplate {
    #[must_use]
    pub fn new(entries: &[WishlistEntry]) -> Self {
        Self {
            items: entries.iter().map(WishlistItemView::from).collect(),
        }
    }
}
