//! Cart snapshot types.
//!
//! The shop is the source of truth for the cart. A [`CartState`] mirrors one
//! server response and is replaced wholesale after every mutation; lines are
//! never patched in place. The aggregates are derived from the lines when the
//! state is built and cannot be set independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::{LineKey, ProductId, VariantId};
use super::money::Money;

/// One row of the cart: a variant, its quantity and its unit prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Line key, stable across quantity changes.
    pub key: LineKey,
    pub variant_id: VariantId,
    pub product_id: ProductId,
    /// Quantity; 0 means the line is about to be removed.
    pub quantity: u32,
    /// Unit price after discounts.
    pub final_price: Money,
    /// Unit price before discounts.
    pub original_price: Money,
    pub product_title: String,
    pub variant_title: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
    /// Inventory ceiling reported for the line, if any.
    pub inventory_quantity: Option<i64>,
    /// Line item properties submitted with the add call.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl CartLine {
    /// `final_price × quantity`.
    #[must_use]
    pub fn line_price(&self) -> Money {
        self.final_price * self.quantity
    }

    /// Whether the line carries a discount.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.original_price > self.final_price
    }
}

/// Snapshot of the whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartState {
    items: Vec<CartLine>,
    item_count: u32,
    total_price: Money,
}

impl CartState {
    /// Build a cart from its lines, deriving the aggregates.
    #[must_use]
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let item_count = items
            .iter()
            .fold(0_u32, |count, line| count.saturating_add(line.quantity));
        let total_price = items.iter().map(CartLine::line_price).sum();
        Self {
            items,
            item_count,
            total_price,
        }
    }

    /// A cart with no lines.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            item_count: 0,
            total_price: Money::ZERO,
        }
    }

    /// Lines in server order.
    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    /// Sum of line quantities.
    #[must_use]
    pub const fn item_count(&self) -> u32 {
        self.item_count
    }

    /// Sum of `final_price × quantity` over all lines.
    #[must_use]
    pub const fn total_price(&self) -> Money {
        self.total_price
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by key.
    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.items.iter().find(|line| &line.key == key)
    }

    /// Progress toward the free-shipping threshold.
    #[must_use]
    pub fn free_shipping(&self, threshold: Money) -> FreeShippingProgress {
        FreeShippingProgress::compute(self.total_price, threshold)
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Free-shipping progress bar values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeShippingProgress {
    /// `min(100, subtotal / threshold × 100)`.
    pub percent: f64,
    /// `max(0, threshold - subtotal)`.
    pub remaining: Money,
}

impl FreeShippingProgress {
    /// Compute progress for a subtotal against a threshold.
    ///
    /// A zero threshold means shipping is always free.
    #[must_use]
    pub fn compute(subtotal: Money, threshold: Money) -> Self {
        if threshold.cents() <= 0 {
            return Self {
                percent: 100.0,
                remaining: Money::ZERO,
            };
        }

        #[allow(clippy::cast_precision_loss)] // cart totals stay far below 2^52 cents
        let percent = (subtotal.cents() as f64 / threshold.cents() as f64 * 100.0).clamp(0.0, 100.0);
        let remaining = Money::from_cents((threshold.cents() - subtotal.cents()).max(0));

        Self { percent, remaining }
    }

    /// Whether the threshold has been reached.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.remaining.is_zero()
    }
}
