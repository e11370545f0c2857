//! Bounded quantity input on the product page.

use scifi_theme_core::{DEFAULT_QUANTITY_CAP, InventoryPolicy, Variant};
use serde::Serialize;

use crate::events::{EventBus, ThemeEvent};

/// Step used by page up / page down.
pub const PAGE_STEP: i64 = 10;

/// Tracked quantities at or below this count show a "only N left" notice.
pub const LOW_INVENTORY_NOTICE: i64 = 10;

/// Inventory hint shown under the quantity input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InventoryNotice {
    /// Inventory is not tracked.
    Hidden,
    /// The chosen quantity exceeds the stock left.
    Exceeds(i64),
    BackOrder,
    SoldOut,
    Low(i64),
    Available,
}

impl InventoryNotice {
    /// Notice for `variant` with `value` units chosen.
    #[must_use]
    pub fn for_variant(variant: &Variant, value: u32) -> Self {
        if !variant.is_tracked() {
            return Self::Hidden;
        }

        let left = variant.inventory_quantity.max(0);
        if i64::from(value) > left && left > 0 {
            Self::Exceeds(left)
        } else if left == 0 {
            if matches!(variant.inventory_policy, InventoryPolicy::Continue) {
                Self::BackOrder
            } else {
                Self::SoldOut
            }
        } else if left <= LOW_INVENTORY_NOTICE {
            Self::Low(left)
        } else {
            Self::Available
        }
    }

    #[must_use]
    pub fn message(self) -> Option<String> {
        match self {
            Self::Hidden => None,
            Self::Exceeds(left) => Some(format!("Not enough stock ({left} left)")),
            Self::BackOrder => Some("Available on back-order".to_string()),
            Self::SoldOut => Some("Sold out".to_string()),
            Self::Low(left) => Some(format!("Only {left} left")),
            Self::Available => Some("In stock".to_string()),
        }
    }
}

/// Quantity input clamped to `[min, max]`.
///
/// Every change of `value` publishes [`ThemeEvent::QuantityChanged`].
#[derive(Debug)]
pub struct QuantitySelector {
    min: u32,
    max: u32,
    value: u32,
    disabled: bool,
    events: EventBus,
}

impl QuantitySelector {
    #[must_use]
    pub const fn new(events: EventBus) -> Self {
        Self {
            min: 1,
            max: DEFAULT_QUANTITY_CAP,
            value: 1,
            disabled: false,
            events,
        }
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    #[must_use]
    pub const fn min(&self) -> u32 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub const fn can_decrease(&self) -> bool {
        !self.disabled && self.value > self.min
    }

    #[must_use]
    pub const fn can_increase(&self) -> bool {
        !self.disabled && self.value < self.max
    }

    pub fn increase(&mut self) -> u32 {
        self.step(1)
    }

    pub fn decrease(&mut self) -> u32 {
        self.step(-1)
    }

    /// Move by `delta`, clamped. Returns the new value.
    pub fn step(&mut self, delta: i64) -> u32 {
        self.set_value(i64::from(self.value) + delta)
    }

    pub fn page_up(&mut self) -> u32 {
        self.step(PAGE_STEP)
    }

    pub fn page_down(&mut self) -> u32 {
        self.step(-PAGE_STEP)
    }

    /// Set the value, clamped to the bounds. Returns the new value.
    pub fn set_value(&mut self, value: i64) -> u32 {
        let clamped = self.clamp(value);
        if clamped != self.value {
            self.value = clamped;
            self.events.publish(ThemeEvent::QuantityChanged { value: clamped });
        }
        self.value
    }

    pub fn set_max(&mut self, max: u32) {
        self.max = max.max(self.min);
        self.reclamp();
    }

    pub fn set_min(&mut self, min: u32) {
        self.min = min.min(self.max);
        self.reclamp();
    }

    pub const fn enable(&mut self) {
        self.disabled = false;
    }

    pub const fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn reset(&mut self) {
        self.set_value(i64::from(self.min));
    }

    /// Adopt a newly selected variant's bounds.
    pub fn apply_variant(&mut self, variant: &Variant) {
        self.set_max(variant.quantity_cap());
        if variant.available {
            self.enable();
        } else {
            self.disable();
        }
        self.reset();
    }

    fn reclamp(&mut self) {
        self.set_value(i64::from(self.value));
    }

    fn clamp(&self, value: i64) -> u32 {
        let clamped = value.clamp(i64::from(self.min), i64::from(self.max));
        u32::try_from(clamped).unwrap_or(self.min)
    }
}
