//! Cart sidebar and count badge.

use askama::Template;
use scifi_theme_core::{CartLine, CartState, DEFAULT_QUANTITY_CAP, FreeShippingProgress, Money};

use super::format_money;

/// Label shown when a line has no variant label.
const DEFAULT_VARIANT_LABEL: &str = "Default option";

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub key: String,
    pub title: String,
    pub variant_title: String,
    pub image: Option<String>,
    pub url: Option<String>,
    pub price: String,
    /// Set only when the line is discounted.
    pub original_price: Option<String>,
    pub line_price: String,
    pub quantity: u32,
    pub max_quantity: i64,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            key: line.key.to_string(),
            title: line.product_title.clone(),
            variant_title: line
                .variant_title
                .clone()
                .unwrap_or_else(|| DEFAULT_VARIANT_LABEL.to_string()),
            image: line.image.clone(),
            url: line.url.clone(),
            price: format_money(line.final_price),
            original_price: line
                .is_discounted()
                .then(|| format_money(line.original_price)),
            line_price: format_money(line.line_price()),
            quantity: line.quantity,
            max_quantity: line
                .inventory_quantity
                .filter(|q| *q > 0)
                .unwrap_or(i64::from(DEFAULT_QUANTITY_CAP)),
        }
    }
}

/// Free-shipping progress display data.
#[derive(Debug, Clone)]
pub struct FreeShippingView {
    /// Bar width, `0`..=`100`.
    pub percent: String,
    pub remaining: String,
    pub is_free: bool,
}

impl From<FreeShippingProgress> for FreeShippingView {
    fn from(progress: FreeShippingProgress) -> Self {
        Self {
            percent: format!("{:.0}", progress.percent),
            remaining: format_money(progress.remaining),
            is_free: progress.is_free(),
        }
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub free_shipping: FreeShippingView,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &CartState, free_shipping_threshold: Money) -> Self {
        Self {
            items: cart.items().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            subtotal: format_money(cart.total_price()),
            free_shipping: cart.free_shipping(free_shipping_threshold).into(),
        }
    }
}

/// Cart sidebar fragment.
#[derive(Template)]
#[template(path = "cart/sidebar.html")]
pub struct CartSidebarTemplate {
    pub cart: CartView,
    pub is_open: bool,
}

/// Cart count badge fragment.
#[derive(Template)]
#[template(path = "cart/count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}
