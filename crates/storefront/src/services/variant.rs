//! Variant selection for a product page.
//!
//! Holds one selected value per option axis and resolves the full tuple to a
//! variant by positional match. A selection that matches no variant is a
//! normal "unavailable" state, not an error.

use scifi_theme_core::{Money, Product, Variant, VariantId};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{AppError, Result};
use crate::events::{EventBus, ThemeEvent};
use crate::render::format_money;

/// State of the add-to-cart button for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ButtonState {
    Available,
    SoldOut,
    /// The selection matches no variant.
    Unavailable,
}

impl ButtonState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "Add to cart",
            Self::SoldOut => "Sold out",
            Self::Unavailable => "Unavailable",
        }
    }

    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Display values for the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantView {
    pub variant_id: Option<VariantId>,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub on_sale: bool,
    pub availability: String,
    pub sku: String,
    pub button: ButtonState,
}

/// Whether each value of one option axis leads to an available variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionAvailability {
    pub name: String,
    pub values: Vec<(String, bool)>,
}

/// Resolves option selections to variants of one product.
#[derive(Debug)]
pub struct VariantResolver {
    product: Product,
    selected: Vec<Option<String>>,
    events: EventBus,
}

impl VariantResolver {
    /// Start from `initial` if it belongs to the product, otherwise from the
    /// first available variant.
    #[must_use]
    pub fn new(product: Product, initial: Option<VariantId>, events: EventBus) -> Self {
        let start = initial
            .and_then(|id| product.variant(id))
            .or_else(|| product.first_available_variant());

        let selected = (0..product.options.len())
            .map(|axis| start.and_then(|variant| variant.options.get(axis).cloned()))
            .collect();

        Self {
            product,
            selected,
            events,
        }
    }

    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    /// Currently selected value per axis.
    #[must_use]
    pub fn selection(&self) -> &[Option<String>] {
        &self.selected
    }

    /// Record the value for one option axis and re-resolve.
    ///
    /// Publishes [`ThemeEvent::VariantChanged`] when the new selection matches
    /// a variant.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the product has no such option axis.
    #[instrument(skip(self, value), fields(product_id = %self.product.id))]
    pub fn select_option(&mut self, index: usize, value: impl Into<String>) -> Result<Option<Variant>> {
        let slot = self.selected.get_mut(index).ok_or_else(|| {
            AppError::BadRequest(format!("Product has no option at position {index}"))
        })?;
        *slot = Some(value.into());

        let resolved = self.resolve().cloned();
        match &resolved {
            Some(variant) => {
                debug!(variant_id = %variant.id, "Selection resolved");
                self.events.publish(ThemeEvent::VariantChanged {
                    product_id: self.product.id,
                    variant: variant.clone(),
                });
            }
            None => debug!("Selection matches no variant"),
        }
        Ok(resolved)
    }

    /// Select by option name instead of position.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the product has no option with that name.
    pub fn select_named(&mut self, name: &str, value: impl Into<String>) -> Result<Option<Variant>> {
        let index = self
            .product
            .options
            .iter()
            .position(|option| option.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::BadRequest(format!("Product has no option named {name}")))?;
        self.select_option(index, value)
    }

    /// The variant matching every selected value, if any.
    #[must_use]
    pub fn resolve(&self) -> Option<&Variant> {
        let values: Option<Vec<&str>> = self.selected.iter().map(Option::as_deref).collect();
        self.product.find_variant(&values?)
    }

    /// Price, stock label, SKU and button state for the current selection.
    #[must_use]
    pub fn view(&self) -> VariantView {
        let Some(variant) = self.resolve() else {
            return VariantView {
                variant_id: None,
                price: format_money(self.product.price),
                compare_at_price: None,
                on_sale: false,
                availability: ButtonState::Unavailable.label().to_string(),
                sku: "N/A".to_string(),
                button: ButtonState::Unavailable,
            };
        };

        let on_sale = variant.is_on_sale();
        let availability = variant.availability();
        VariantView {
            variant_id: Some(variant.id),
            price: format_money(variant.price),
            compare_at_price: variant
                .compare_at_price
                .filter(|_| on_sale)
                .map(format_money),
            on_sale,
            availability: availability.to_string(),
            sku: variant
                .sku
                .clone()
                .filter(|sku| !sku.is_empty())
                .unwrap_or_else(|| "N/A".to_string()),
            button: if availability.is_purchasable() {
                ButtonState::Available
            } else {
                ButtonState::SoldOut
            },
        }
    }

    /// For each axis, which values would lead to an available variant if
    /// swapped into the current selection.
    #[must_use]
    pub fn option_availability(&self) -> Vec<OptionAvailability> {
        self.product
            .options
            .iter()
            .enumerate()
            .map(|(axis, option)| OptionAvailability {
                name: option.name.clone(),
                values: option
                    .values
                    .iter()
                    .map(|value| (value.clone(), self.is_reachable(axis, value)))
                    .collect(),
            })
            .collect()
    }

    fn is_reachable(&self, axis: usize, value: &str) -> bool {
        self.product.variants.iter().any(|variant| {
            variant.available
                && variant.options.iter().enumerate().all(|(i, option)| {
                    if i == axis {
                        option == value
                    } else {
                        self.selected
                            .get(i)
                            .and_then(Option::as_deref)
                            .is_none_or(|selected| selected == option)
                    }
                })
        })
    }

    /// Product URL pointing at the resolved variant.
    #[must_use]
    pub fn deep_link(&self, base: &Url) -> Option<Url> {
        let variant = self.resolve()?;
        let mut url = base.join(&format!("products/{}", self.product.handle)).ok()?;
        url.query_pairs_mut()
            .append_pair("variant", &variant.id.to_string());
        Some(url)
    }

    /// Price of the resolved variant, or the product price.
    #[must_use]
    pub fn price(&self) -> Money {
        self.resolve().map_or(self.product.price, |variant| variant.price)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scifi_theme_core::{InventoryManagement, InventoryPolicy, ProductId, ProductOption};

    use super::*;
    use crate::events::EventKind;

    fn variant(id: i64, options: &[&str], available: bool) -> Variant {
        Variant {
            id: VariantId::new(id),
            title: options.join(" / "),
            options: options.iter().map(ToString::to_string).collect(),
            price: Money::from_cents(4500),
            compare_at_price: None,
            available,
            inventory_management: InventoryManagement::None,
            inventory_policy: InventoryPolicy::Deny,
            inventory_quantity: 0,
            sku: None,
            featured_image: None,
        }
    }

    fn product() -> Product {
        Product {
            id: ProductId::new(7),
            handle: "plasma-jacket".to_string(),
            title: "Plasma Jacket".to_string(),
            vendor: None,
            product_type: None,
            price: Money::from_cents(4500),
            compare_at_price: None,
            available: true,
            featured_image: None,
            options: vec![
                ProductOption {
                    name: "Color".to_string(),
                    values: vec!["Red".to_string(), "Blue".to_string()],
                },
                ProductOption {
                    name: "Size".to_string(),
                    values: vec!["M".to_string(), "L".to_string()],
                },
            ],
            variants: vec![variant(1, &["Red", "M"], true), variant(2, &["Red", "L"], true)],
        }
    }

    #[test]
    fn test_initial_selection_from_first_available() {
        let resolver = VariantResolver::new(product(), None, EventBus::new());
        assert_eq!(resolver.resolve().unwrap().id, VariantId::new(1));

        let resolver = VariantResolver::new(product(), Some(VariantId::new(2)), EventBus::new());
        assert_eq!(resolver.resolve().unwrap().id, VariantId::new(2));
    }

    #[test]
    fn test_select_resolves_and_publishes() {
        let events = EventBus::new();
        let mut changes = events.subscribe_to(&[EventKind::VariantChanged]);
        let mut resolver = VariantResolver::new(product(), None, events);

        resolver.select_option(0, "Red").unwrap();
        let resolved = resolver.select_option(1, "L").unwrap();
        assert_eq!(resolved.unwrap().id, VariantId::new(2));

        let published = changes.drain();
        assert_eq!(published.len(), 2);
        assert!(matches!(
            published.last(),
            Some(ThemeEvent::VariantChanged { variant, .. }) if variant.id == VariantId::new(2)
        ));
    }

    #[test]
    fn test_no_match_is_unavailable_and_silent() {
        let events = EventBus::new();
        let mut changes = events.subscribe_to(&[EventKind::VariantChanged]);
        let mut resolver = VariantResolver::new(product(), None, events);

        resolver.select_option(1, "L").unwrap();
        changes.drain();
        let resolved = resolver.select_named("color", "Blue").unwrap();
        assert!(resolved.is_none());
        assert!(changes.try_recv().is_none());

        let view = resolver.view();
        assert_eq!(view.button, ButtonState::Unavailable);
        assert_eq!(view.sku, "N/A");
        assert!(resolver.deep_link(&Url::parse("https://shop.test/").unwrap()).is_none());
    }

    #[test]
    fn test_bad_axis_rejected() {
        let mut resolver = VariantResolver::new(product(), None, EventBus::new());
        assert!(matches!(resolver.select_option(5, "XL"), Err(AppError::BadRequest(_))));
        assert!(resolver.select_named("Material", "Wool").is_err());
    }

    #[test]
    fn test_view_for_sale_variant() {
        let mut product = product();
        if let Some(v) = product.variants.get_mut(0) {
            v.compare_at_price = Some(Money::from_cents(6000));
            v.sku = Some("PJ-RED-M".to_string());
        }
        let resolver = VariantResolver::new(product, None, EventBus::new());
        let view = resolver.view();
        assert!(view.on_sale);
        assert_eq!(view.price, "$45.00");
        assert_eq!(view.compare_at_price.as_deref(), Some("$60.00"));
        assert_eq!(view.sku, "PJ-RED-M");
        assert_eq!(view.availability, "In stock");
        assert!(view.button.is_enabled());
    }

    #[test]
    fn test_sold_out_button() {
        let mut product = product();
        product.variants = vec![variant(1, &["Red", "M"], false)];
        let resolver = VariantResolver::new(product, None, EventBus::new());
        assert_eq!(resolver.view().button, ButtonState::SoldOut);
    }

    #[test]
    fn test_option_availability() {
        let resolver = VariantResolver::new(product(), None, EventBus::new());
        let availability = resolver.option_availability();
        assert_eq!(
            availability[0].values,
            vec![("Red".to_string(), true), ("Blue".to_string(), false)]
        );
        assert_eq!(
            availability[1].values,
            vec![("M".to_string(), true), ("L".to_string(), true)]
        );
    }

    #[test]
    fn test_deep_link() {
        let resolver = VariantResolver::new(product(), Some(VariantId::new(2)), EventBus::new());
        let url = resolver
            .deep_link(&Url::parse("https://shop.test/").unwrap())
            .unwrap();
        assert_eq!(url.as_str(), "https://shop.test/products/plasma-jacket?variant=2");
    }
}
