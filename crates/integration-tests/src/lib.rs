//! Integration tests for the Sci-Fi theme runtime.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p scifi-theme-integration-tests
//! ```
//!
//! Every test drives a [`ThemeApp`] assembled over an [`InMemoryShop`] and a
//! [`MemoryStorage`], through the same dispatch table a page would use. No
//! network access is needed.
//!
//! # Test Categories
//!
//! - `cart` - Cart aggregates, quantity changes, single-flight
//! - `variant` - Option selection and variant resolution
//! - `wishlist` - Idempotent adds, add-all, sharing
//! - `search` - Suggestion cache TTL and history fallback

use std::collections::BTreeMap;
use std::sync::Arc;

use scifi_theme_core::{
    CartLine, InventoryManagement, InventoryPolicy, LineKey, Money, Product, ProductId,
    ProductOption, Variant, VariantId,
};
use scifi_theme_storefront::shopify::InMemoryShop;
use scifi_theme_storefront::storage::MemoryStorage;
use scifi_theme_storefront::{ThemeApp, ThemeConfig};
use url::Url;

/// Base URL every test app is configured with.
pub const SHOP_URL: &str = "https://scifi-store.test/";

/// A tracked variant that denies overselling.
#[must_use]
pub fn variant(id: i64, options: &[&str], price_cents: i64, inventory: i64) -> Variant {
    Variant {
        id: VariantId::new(id),
        title: options.join(" / "),
        options: options.iter().map(ToString::to_string).collect(),
        price: Money::from_cents(price_cents),
        compare_at_price: None,
        available: inventory > 0,
        inventory_management: InventoryManagement::Tracked,
        inventory_policy: InventoryPolicy::Deny,
        inventory_quantity: inventory,
        sku: Some(format!("SKU-{id}")),
        featured_image: None,
    }
}

/// A product with the given option axes and variants. Price comes from the
/// first variant.
#[must_use]
pub fn product(id: i64, handle: &str, options: &[(&str, &[&str])], variants: Vec<Variant>) -> Product {
    let price = variants.first().map_or(Money::ZERO, |variant| variant.price);
    Product {
        id: ProductId::new(id),
        handle: handle.to_string(),
        title: title_case(handle),
        vendor: Some("Orbital Outfitters".to_string()),
        product_type: Some("Apparel".to_string()),
        price,
        compare_at_price: None,
        available: variants.iter().any(|variant| variant.available),
        featured_image: None,
        options: options
            .iter()
            .map(|(name, values)| ProductOption {
                name: (*name).to_string(),
                values: values.iter().map(ToString::to_string).collect(),
            })
            .collect(),
        variants,
    }
}

/// A single-variant product.
#[must_use]
pub fn simple_product(id: i64, handle: &str, variant_id: i64, price_cents: i64) -> Product {
    product(
        id,
        handle,
        &[("Title", &["Default Title"])],
        vec![variant(variant_id, &["Default Title"], price_cents, 25)],
    )
}

/// Jacket with options `[Color, Size]` and variants Red/M (1) and Red/L (2).
#[must_use]
pub fn plasma_jacket() -> Product {
    product(
        100,
        "plasma-jacket",
        &[("Color", &["Red", "Blue"]), ("Size", &["M", "L"])],
        vec![variant(1, &["Red", "M"], 12_000, 8), variant(2, &["Red", "L"], 12_000, 3)],
    )
}

/// A cart line priced at `price_cents` per unit.
#[must_use]
pub fn line(key: &str, variant_id: i64, quantity: u32, price_cents: i64) -> CartLine {
    CartLine {
        key: LineKey::new(key),
        variant_id: VariantId::new(variant_id),
        product_id: ProductId::new(variant_id * 10),
        quantity,
        final_price: Money::from_cents(price_cents),
        original_price: Money::from_cents(price_cents),
        product_title: format!("Item {variant_id}"),
        variant_title: None,
        image: None,
        url: None,
        inventory_quantity: None,
        properties: BTreeMap::new(),
    }
}

/// An app wired to an in-memory shop and storage.
pub struct TestShop {
    pub shop: InMemoryShop,
    pub storage: Arc<MemoryStorage>,
    pub app: ThemeApp,
}

impl TestShop {
    /// Shop with `products` in its catalog and an empty cart.
    ///
    /// # Panics
    ///
    /// Panics if [`SHOP_URL`] does not parse.
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let shop = InMemoryShop::with_products(products);
        let storage = Arc::new(MemoryStorage::new());
        let config = ThemeConfig::for_shop(Url::parse(SHOP_URL).expect("valid shop URL"));
        let app = ThemeApp::new(config, Arc::new(shop.clone()), storage.clone());
        Self { shop, storage, app }
    }

    /// Same as [`TestShop::new`] but with `lines` already in the cart and
    /// the app initialized.
    pub async fn with_cart(products: impl IntoIterator<Item = Product>, lines: Vec<CartLine>) -> Self {
        let test = Self::new(products);
        test.shop.seed_cart(lines);
        test.app.init().await;
        test
    }

    /// A second app over the same shop and storage, as after a page reload.
    ///
    /// # Panics
    ///
    /// Panics if [`SHOP_URL`] does not parse.
    #[must_use]
    pub fn reload(&self) -> ThemeApp {
        let config = ThemeConfig::for_shop(Url::parse(SHOP_URL).expect("valid shop URL"));
        ThemeApp::new(config, Arc::new(self.shop.clone()), self.storage.clone())
    }

    /// Messages of the notices currently shown.
    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.app
            .notifications()
            .active()
            .into_iter()
            .map(|notice| notice.message)
            .collect()
    }
}

fn title_case(handle: &str) -> String {
    handle
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
