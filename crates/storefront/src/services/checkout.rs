//! Checkout preferences and the running order total.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use scifi_theme_core::Money;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, add_breadcrumb};
use crate::events::{EventBus, ThemeEvent};
use crate::render::format_money;
use crate::storage::{ClientStorage, keys, load_json, save_json};

/// Delivery preferences saved with the shipping step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShippingPreferences {
    pub signature_required: bool,
    pub sms_notifications: bool,
    pub email_notifications: bool,
    pub delivery_instructions: Option<String>,
    pub preferred_delivery_time: Option<String>,
}

/// Remembered payment and shipping choices.
pub struct CheckoutPreferences {
    storage: Arc<dyn ClientStorage>,
    events: EventBus,
}

impl CheckoutPreferences {
    #[must_use]
    pub fn new(storage: Arc<dyn ClientStorage>, events: EventBus) -> Self {
        Self { storage, events }
    }

    #[must_use]
    pub fn preferred_payment_gateway(&self) -> Option<String> {
        load_json(self.storage.as_ref(), keys::PREFERRED_PAYMENT_GATEWAY)
    }

    #[must_use]
    pub fn preferred_shipping_method(&self) -> Option<String> {
        load_json(self.storage.as_ref(), keys::PREFERRED_SHIPPING_METHOD)
    }

    #[must_use]
    pub fn shipping_preferences(&self) -> ShippingPreferences {
        load_json(self.storage.as_ref(), keys::SHIPPING_PREFERENCES)
    }

    /// # Errors
    ///
    /// Returns an error if the preferences cannot be saved.
    pub fn save_shipping_preferences(&self, preferences: &ShippingPreferences) -> Result<()> {
        save_json(self.storage.as_ref(), keys::SHIPPING_PREFERENCES, preferences)?;
        Ok(())
    }

    /// Remember the shipping method and announce it to the order total.
    ///
    /// # Errors
    ///
    /// Returns an error if the choice cannot be saved.
    #[instrument(skip(self, price))]
    pub fn select_shipping_method(
        &self,
        id: &str,
        price: Money,
        delivery_days: Option<u32>,
    ) -> Result<()> {
        save_json(self.storage.as_ref(), keys::PREFERRED_SHIPPING_METHOD, &id)?;
        add_breadcrumb("checkout", "Shipping method selected", Some(&[("id", id)]));
        self.events.publish(ThemeEvent::ShippingMethodSelected {
            id: id.to_string(),
            price,
            delivery_days,
        });
        Ok(())
    }

    /// Remember the payment method.
    ///
    /// # Errors
    ///
    /// Returns an error if the choice cannot be saved.
    #[instrument(skip(self))]
    pub fn select_payment_method(&self, id: &str) -> Result<()> {
        save_json(self.storage.as_ref(), keys::PREFERRED_PAYMENT_GATEWAY, &id)?;
        add_breadcrumb("checkout", "Payment method selected", Some(&[("id", id)]));
        self.events.publish(ThemeEvent::PaymentMethodSelected { id: id.to_string() });
        Ok(())
    }
}

/// Cart subtotal plus the chosen shipping rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderTotal {
    subtotal: Money,
    shipping: Option<Money>,
    delivery_days: Option<u32>,
}

impl OrderTotal {
    #[must_use]
    pub const fn new(subtotal: Money) -> Self {
        Self {
            subtotal,
            shipping: None,
            delivery_days: None,
        }
    }

    /// Fold in an event. Returns whether the total changed.
    pub fn apply(&mut self, event: &ThemeEvent) -> bool {
        let before = *self;
        match event {
            ThemeEvent::CartUpdated { total_price, .. } => self.subtotal = *total_price,
            ThemeEvent::ShippingMethodSelected {
                price,
                delivery_days,
                ..
            } => {
                self.shipping = Some(*price);
                self.delivery_days = *delivery_days;
            }
            _ => return false,
        }
        debug!(total = %self.total(), "Order total updated");
        *self != before
    }

    #[must_use]
    pub const fn subtotal(&self) -> Money {
        self.subtotal
    }

    #[must_use]
    pub const fn shipping(&self) -> Option<Money> {
        self.shipping
    }

    /// Subtotal plus shipping (zero until a method is chosen).
    #[must_use]
    pub fn total(&self) -> Money {
        self.subtotal + self.shipping.unwrap_or(Money::ZERO)
    }

    #[must_use]
    pub fn total_label(&self) -> String {
        format_money(self.total())
    }

    #[must_use]
    pub fn shipping_label(&self) -> String {
        match self.shipping {
            None => "Calculated at checkout".to_string(),
            Some(price) if price.is_zero() => "Free".to_string(),
            Some(price) => format_money(price),
        }
    }

    /// Expected delivery date for an order placed on `ordered`.
    #[must_use]
    pub fn delivery_estimate(&self, ordered: NaiveDate) -> Option<NaiveDate> {
        self.delivery_days
            .and_then(|days| add_business_days(ordered, days))
    }
}

/// `date` moved forward by `days` weekdays.
#[must_use]
pub fn add_business_days(date: NaiveDate, days: u32) -> Option<NaiveDate> {
    let mut current = date;
    let mut left = days;
    while left > 0 {
        current = current.checked_add_days(Days::new(1))?;
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            left -= 1;
        }
    }
    Some(current)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::storage::MemoryStorage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_selections_persist_and_publish() {
        let storage = Arc::new(MemoryStorage::new());
        let events = EventBus::new();
        let mut selections = events.subscribe_to(&[
            EventKind::ShippingMethodSelected,
            EventKind::PaymentMethodSelected,
        ]);
        let prefs = CheckoutPreferences::new(storage.clone(), events);

        prefs
            .select_shipping_method("express", Money::from_cents(2000), Some(1))
            .unwrap();
        prefs.select_payment_method("warp-pay").unwrap();

        assert_eq!(prefs.preferred_shipping_method().as_deref(), Some("express"));
        assert_eq!(prefs.preferred_payment_gateway().as_deref(), Some("warp-pay"));
        assert_eq!(selections.drain().len(), 2);
    }

    #[test]
    fn test_corrupt_preferences_read_as_absent() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::SHIPPING_PREFERENCES, "[oops").unwrap();
        storage.set(keys::PREFERRED_SHIPPING_METHOD, "express").unwrap();
        let prefs = CheckoutPreferences::new(storage, EventBus::new());

        assert_eq!(prefs.shipping_preferences(), ShippingPreferences::default());
        assert_eq!(prefs.preferred_shipping_method(), None);
    }

    #[test]
    fn test_shipping_preferences_roundtrip_camel_case() {
        let storage = Arc::new(MemoryStorage::new());
        let prefs = CheckoutPreferences::new(storage.clone(), EventBus::new());
        let saved = ShippingPreferences {
            signature_required: true,
            delivery_instructions: Some("Leave at airlock".to_string()),
            ..ShippingPreferences::default()
        };
        prefs.save_shipping_preferences(&saved).unwrap();

        let raw = storage.get(keys::SHIPPING_PREFERENCES).unwrap().unwrap();
        assert!(raw.contains("signatureRequired"));
        assert_eq!(prefs.shipping_preferences(), saved);
    }

    #[test]
    fn test_order_total_follows_events() {
        let mut total = OrderTotal::default();
        assert_eq!(total.shipping_label(), "Calculated at checkout");

        assert!(total.apply(&ThemeEvent::CartUpdated {
            item_count: 2,
            total_price: Money::from_cents(4000),
        }));
        assert!(total.apply(&ThemeEvent::ShippingMethodSelected {
            id: "standard".to_string(),
            price: Money::ZERO,
            delivery_days: Some(3),
        }));
        assert_eq!(total.total(), Money::from_cents(4000));
        assert_eq!(total.shipping_label(), "Free");

        total.apply(&ThemeEvent::ShippingMethodSelected {
            id: "express".to_string(),
            price: Money::from_cents(2000),
            delivery_days: Some(1),
        });
        assert_eq!(total.total_label(), "$60.00");
        assert!(!total.apply(&ThemeEvent::QuantityChanged { value: 3 }));
    }

    #[test]
    fn test_business_days_skip_weekends() {
        // 2026-10-16 is a Friday.
        assert_eq!(add_business_days(date(2026, 10, 16), 1), Some(date(2026, 10, 19)));
        assert_eq!(add_business_days(date(2026, 10, 16), 3), Some(date(2026, 10, 21)));
        assert_eq!(add_business_days(date(2026, 10, 14), 0), Some(date(2026, 10, 14)));

        let mut total = OrderTotal::new(Money::ZERO);
        assert_eq!(total.delivery_estimate(date(2026, 10, 16)), None);
        total.apply(&ThemeEvent::ShippingMethodSelected {
            id: "economy".to_string(),
            price: Money::from_cents(500),
            delivery_days: Some(7),
        });
        assert_eq!(total.delivery_estimate(date(2026, 10, 16)), Some(date(2026, 10, 27)));
    }
}
