//! Wishlist entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProductId, VariantId};
use super::money::Money;
use super::product::Product;

/// Reference to a product as it appears on a product card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    pub handle: String,
}

impl ProductRef {
    #[must_use]
    pub fn new(id: ProductId, handle: impl Into<String>) -> Self {
        Self {
            id,
            handle: handle.into(),
        }
    }
}

/// A wishlisted product with the display data captured when it was added.
///
/// The snapshot is never re-synced with live product data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub image: Option<String>,
    pub url: String,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    /// Variant added by "add all to cart"; `None` when nothing was purchasable.
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub added_at: DateTime<Utc>,
}

impl WishlistEntry {
    /// Capture a snapshot of `product` at `added_at`.
    #[must_use]
    pub fn snapshot(product: &Product, added_at: DateTime<Utc>) -> Self {
        let variant_id = product
            .variants
            .iter()
            .find(|variant| variant.available)
            .map(|variant| variant.id);

        Self {
            id: product.id,
            handle: product.handle.clone(),
            title: product.title.clone(),
            price: product.price,
            compare_at_price: product.compare_at_price,
            image: product.featured_image.clone(),
            url: format!("/products/{}", product.handle),
            vendor: product.vendor.clone(),
            product_type: product.product_type.clone(),
            variant_id,
            added_at,
        }
    }

    /// Whether "add all to cart" can add this entry.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.variant_id.is_some()
    }
}
