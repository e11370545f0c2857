//! Product and variant types.
//!
//! A [`Product`] declares an ordered list of options (e.g. `Color`, `Size`)
//! and an unordered list of [`Variant`]s, each carrying one value per option
//! in the same positional order.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{ProductId, VariantId};
use super::money::Money;

/// Quantity ceiling used when inventory does not bound the quantity.
pub const DEFAULT_QUANTITY_CAP: u32 = 999;

/// Tracked quantities at or below this count are reported as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// One option axis of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option name (e.g. "Size").
    pub name: String,
    /// Allowed values in display order.
    pub values: Vec<String>,
}

/// Whether the shop tracks inventory for a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InventoryManagement {
    #[default]
    None,
    Tracked,
}

/// What happens when a tracked variant runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InventoryPolicy {
    /// Refuse further sales.
    #[default]
    Deny,
    /// Keep selling (back-order).
    Continue,
}

/// One purchasable configuration of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub title: String,
    /// Selected option values, positionally aligned with the product options.
    pub options: Vec<String>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub available: bool,
    pub inventory_management: InventoryManagement,
    pub inventory_policy: InventoryPolicy,
    /// Only meaningful when inventory is tracked.
    pub inventory_quantity: i64,
    pub sku: Option<String>,
    pub featured_image: Option<String>,
}

impl Variant {
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        matches!(self.inventory_management, InventoryManagement::Tracked)
    }

    /// Whether the compare-at price exceeds the price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|compare| compare > self.price)
    }

    /// Stock label for this variant. The first matching rule wins.
    #[must_use]
    pub const fn availability(&self) -> Availability {
        if !self.available {
            return Availability::OutOfStock;
        }
        if !self.is_tracked() {
            return Availability::InStock;
        }

        let quantity = self.inventory_quantity;
        if quantity > LOW_STOCK_THRESHOLD {
            Availability::InStock
        } else if quantity > 0 {
            Availability::LowStock(quantity)
        } else if matches!(self.inventory_policy, InventoryPolicy::Continue) {
            Availability::BackOrder
        } else {
            Availability::OutOfStock
        }
    }

    /// Upper bound for the quantity selector.
    ///
    /// Tracked variants that deny overselling are capped at their inventory
    /// (never below 1); everything else gets [`DEFAULT_QUANTITY_CAP`].
    #[must_use]
    pub fn quantity_cap(&self) -> u32 {
        if self.is_tracked() && matches!(self.inventory_policy, InventoryPolicy::Deny) {
            u32::try_from(self.inventory_quantity.max(1)).unwrap_or(DEFAULT_QUANTITY_CAP)
        } else {
            DEFAULT_QUANTITY_CAP
        }
    }

    /// Whether this variant's option tuple equals `values` at every position.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, values: &[S]) -> bool {
        self.options.len() == values.len()
            && self
                .options
                .iter()
                .zip(values)
                .all(|(option, value)| option == value.as_ref())
    }
}

/// Stock status shown next to the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    OutOfStock,
    InStock,
    LowStock(i64),
    BackOrder,
}

impl Availability {
    /// Whether the variant can be added to the cart.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        !matches!(self, Self::OutOfStock)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfStock => f.write_str("Out of stock"),
            Self::InStock => f.write_str("In stock"),
            Self::LowStock(left) => write!(f, "Low stock, {left} left"),
            Self::BackOrder => f.write_str("Back-order"),
        }
    }
}

/// Product snapshot with its options and variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub available: bool,
    pub featured_image: Option<String>,
    pub options: Vec<ProductOption>,
    pub variants: Vec<Variant>,
}

impl Product {
    /// Find the variant whose option values equal `values` positionally.
    ///
    /// Returns the first match when the source data contains duplicates.
    #[must_use]
    pub fn find_variant<S: AsRef<str>>(&self, values: &[S]) -> Option<&Variant> {
        if values.len() != self.options.len() {
            return None;
        }
        self.variants.iter().find(|variant| variant.matches(values))
    }

    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.id == id)
    }

    /// First available variant, falling back to the first variant.
    #[must_use]
    pub fn first_available_variant(&self) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|variant| variant.available)
            .or_else(|| self.variants.first())
    }
}
