//! Wishlist store.
//!
//! A client-only set of product snapshots, unique by product id, persisted
//! under the `wishlist` storage key after every mutation. The snapshot taken
//! at add time is never refreshed from the shop.

use std::sync::{Arc, PoisonError, RwLock};

use askama::Template;
use chrono::Utc;
use scifi_theme_core::{Money, ProductId, ProductRef, WishlistEntry};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::events::{EventBus, ThemeEvent};
use crate::notifications::NotificationBus;
use crate::render::{RenderError, WishlistPanelTemplate, format_money};
use crate::shopify::{AddToCart, StorefrontApi};
use crate::storage::{ClientStorage, keys, load_json, save_json};

use super::cart::CartStore;

/// Result of moving the wishlist into the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddAllSummary {
    pub added: usize,
    pub attempted: usize,
}

/// Client-side wishlist.
pub struct WishlistStore {
    api: Arc<dyn StorefrontApi>,
    storage: Arc<dyn ClientStorage>,
    events: EventBus,
    notifications: Arc<NotificationBus>,
    entries: RwLock<Vec<WishlistEntry>>,
    panel_html: RwLock<String>,
}

impl WishlistStore {
    /// Restore the wishlist from storage. Corrupt content reads as empty.
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        storage: Arc<dyn ClientStorage>,
        events: EventBus,
        notifications: Arc<NotificationBus>,
    ) -> Self {
        let entries: Vec<WishlistEntry> = load_json(storage.as_ref(), keys::WISHLIST);
        debug!(count = entries.len(), "Wishlist restored");

        let store = Self {
            api,
            storage,
            events,
            notifications,
            entries: RwLock::new(entries),
            panel_html: RwLock::new(String::new()),
        };
        if let Err(e) = store.render() {
            warn!(error = %e, "Failed to render wishlist panel");
        }
        store
    }

    #[must_use]
    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.id == id)
    }

    /// Last rendered panel fragment.
    #[must_use]
    pub fn panel_html(&self) -> String {
        self.panel_html.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Add a product, fetching its snapshot from the shop.
    ///
    /// Returns `false` (with an informational notice) if it was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the product cannot be fetched (the wishlist is left
    /// unchanged) or the wishlist cannot be saved.
    #[instrument(skip(self), fields(product_id = %product.id))]
    pub async fn add(&self, product: &ProductRef) -> Result<bool> {
        if self.contains(product.id) {
            self.notifications.info("Already in your wishlist");
            return Ok(false);
        }

        let snapshot = self
            .api
            .get_product(&product.handle)
            .await
            .map_err(|e| AppError::action("Could not add to wishlist", e))?;
        let mut entry = WishlistEntry::snapshot(&snapshot, Utc::now());
        entry.id = product.id;

        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            // Another add for the same product may have landed while fetching
            if entries.iter().any(|existing| existing.id == product.id) {
                return Ok(false);
            }
            entries.push(entry);
        }

        add_breadcrumb(
            "wishlist",
            "Added to wishlist",
            Some(&[("product_id", &product.id.to_string())]),
        );
        self.changed()?;
        self.notifications.success("Added to wishlist");
        Ok(true)
    }

    /// Remove a product. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be saved.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn remove(&self, id: ProductId) -> Result<bool> {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            entries.len() != before
        };
        if !removed {
            return Ok(false);
        }

        add_breadcrumb(
            "wishlist",
            "Removed from wishlist",
            Some(&[("product_id", &id.to_string())]),
        );
        self.changed()?;
        self.notifications.info("Removed from wishlist");
        Ok(true)
    }

    /// Add the product if absent, remove it otherwise. Returns whether it is
    /// now in the wishlist.
    ///
    /// # Errors
    ///
    /// As [`WishlistStore::add`] and [`WishlistStore::remove`].
    pub async fn toggle(&self, product: &ProductRef) -> Result<bool> {
        if self.contains(product.id) {
            self.remove(product.id)?;
            Ok(false)
        } else {
            self.add(product).await
        }
    }

    /// Remove everything. Does nothing on an empty wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be saved.
    pub fn clear(&self) -> Result<bool> {
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            if entries.is_empty() {
                return Ok(false);
            }
            entries.clear();
        }

        self.changed()?;
        self.notifications.info("Wishlist cleared");
        Ok(true)
    }

    /// Add one unit of every purchasable entry to the cart.
    ///
    /// Entries are tried one after another; a failure is logged and the next
    /// entry is still attempted. On any success the cart is reloaded and
    /// opened.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cart reload after a successful batch fails.
    #[instrument(skip(self, cart))]
    pub async fn add_all_to_cart(&self, cart: &CartStore) -> Result<AddAllSummary> {
        let candidates: Vec<_> = self
            .entries()
            .into_iter()
            .filter_map(|entry| entry.variant_id.map(|variant_id| (entry, variant_id)))
            .collect();

        if candidates.is_empty() {
            self.notifications.warning("Nothing in your wishlist can be added to the cart");
            return Ok(AddAllSummary {
                added: 0,
                attempted: 0,
            });
        }

        let attempted = candidates.len();
        let mut added = 0;
        for (entry, variant_id) in candidates {
            match self.api.add_to_cart(&AddToCart::new(variant_id, 1)).await {
                Ok(_) => added += 1,
                Err(e) => warn!(
                    product_id = %entry.id,
                    variant_id = %variant_id,
                    error = %e,
                    "Wishlist item could not be added to cart"
                ),
            }
        }

        info!(added, attempted, "Wishlist moved to cart");
        if added == 0 {
            self.notifications.error("Could not add wishlist items to the cart");
            return Ok(AddAllSummary { added, attempted });
        }

        cart.load().await?;
        cart.open();
        self.notifications.success(format!("{added} of {attempted} added to cart"));
        Ok(AddAllSummary { added, attempted })
    }

    /// Link listing the wishlisted product ids, or `None` when empty.
    #[must_use]
    pub fn share_url(&self, base: &Url) -> Option<Url> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        if entries.is_empty() {
            return None;
        }

        let ids = entries
            .iter()
            .map(|entry| entry.id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut url = base.join("wishlist").ok()?;
        url.query_pairs_mut().append_pair("products", &ids);
        Some(url)
    }

    /// Summary line for sharing, or `None` when empty.
    #[must_use]
    pub fn share_text(&self) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        if entries.is_empty() {
            return None;
        }

        let total: Money = entries.iter().map(|entry| entry.price).sum();
        let noun = if entries.len() == 1 { "product" } else { "products" };
        Some(format!(
            "I saved {} {noun} worth {} in total. Take a look!",
            entries.len(),
            format_money(total)
        ))
    }

    /// Persist, re-render and announce the new wishlist.
    fn changed(&self) -> Result<()> {
        let entries = self.entries();
        save_json(self.storage.as_ref(), keys::WISHLIST, &entries)?;
        if let Err(e) = self.render() {
            warn!(error = %e, "Failed to render wishlist panel");
        }
        self.events.publish(ThemeEvent::WishlistUpdated {
            count: entries.len(),
        });
        Ok(())
    }

    fn render(&self) -> std::result::Result<(), RenderError> {
        let html = WishlistPanelTemplate::new(&self.entries()).render()?;
        *self.panel_html.write().unwrap_or_else(PoisonError::into_inner) = html;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use scifi_theme_core::{
        InventoryManagement, InventoryPolicy, Product, ProductOption, Variant, VariantId,
    };

    use super::*;
    use crate::events::EventKind;
    use crate::notifications::Level;
    use crate::shopify::InMemoryShop;
    use crate::storage::MemoryStorage;

    fn product(id: i64, available: bool) -> Product {
        Product {
            id: ProductId::new(id),
            handle: format!("p{id}"),
            title: format!("Product {id}"),
            vendor: Some("Orbital".to_string()),
            product_type: None,
            price: Money::from_cents(1000 * id),
            compare_at_price: None,
            available,
            featured_image: None,
            options: vec![ProductOption {
                name: "Title".to_string(),
                values: vec!["Default Title".to_string()],
            }],
            variants: vec![Variant {
                id: VariantId::new(id * 10),
                title: "Default Title".to_string(),
                options: vec!["Default Title".to_string()],
                price: Money::from_cents(1000 * id),
                compare_at_price: None,
                available,
                inventory_management: InventoryManagement::None,
                inventory_policy: InventoryPolicy::Deny,
                inventory_quantity: 0,
                sku: None,
                featured_image: None,
            }],
        }
    }

    struct Fixture {
        shop: InMemoryShop,
        storage: Arc<MemoryStorage>,
        events: EventBus,
        notifications: Arc<NotificationBus>,
    }

    impl Fixture {
        fn new(products: Vec<Product>) -> Self {
            Self {
                shop: InMemoryShop::with_products(products),
                storage: Arc::new(MemoryStorage::new()),
                events: EventBus::new(),
                notifications: Arc::new(NotificationBus::new(Duration::from_secs(3))),
            }
        }

        fn wishlist(&self) -> WishlistStore {
            WishlistStore::new(
                Arc::new(self.shop.clone()),
                self.storage.clone(),
                self.events.clone(),
                Arc::clone(&self.notifications),
            )
        }

        fn cart(&self) -> CartStore {
            CartStore::new(
                Arc::new(self.shop.clone()),
                self.events.clone(),
                Arc::clone(&self.notifications),
                Money::from_cents(50_000),
            )
        }
    }

    fn reference(id: i64) -> ProductRef {
        ProductRef::new(ProductId::new(id), format!("p{id}"))
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let fixture = Fixture::new(vec![product(1, true)]);
        let wishlist = fixture.wishlist();

        assert!(wishlist.add(&reference(1)).await.unwrap());
        assert!(!wishlist.add(&reference(1)).await.unwrap());
        assert_eq!(wishlist.len(), 1);

        let last = fixture.notifications.active().pop().unwrap();
        assert_eq!(last.level, Level::Info);
        assert_eq!(last.message, "Already in your wishlist");
    }

    #[tokio::test]
    async fn test_add_persists_and_publishes() {
        let fixture = Fixture::new(vec![product(1, true)]);
        let mut updates = fixture.events.subscribe_to(&[EventKind::WishlistUpdated]);
        let wishlist = fixture.wishlist();

        wishlist.add(&reference(1)).await.unwrap();
        assert_eq!(updates.try_recv(), Some(ThemeEvent::WishlistUpdated { count: 1 }));
        assert!(wishlist.panel_html().contains("Product 1"));

        // A second store over the same storage sees the entry.
        let restored = fixture.wishlist();
        assert!(restored.contains(ProductId::new(1)));
        assert_eq!(restored.entries()[0].price, Money::from_cents(1000));
    }

    #[tokio::test]
    async fn test_add_fetch_failure_leaves_wishlist_unchanged() {
        let fixture = Fixture::new(vec![product(1, true)]);
        fixture.shop.fail_handle("p1");
        let wishlist = fixture.wishlist();

        let err = wishlist.add(&reference(1)).await.unwrap_err();
        assert_eq!(err.user_message(), "Could not add to wishlist");
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_corrupt_storage_reads_empty() {
        let fixture = Fixture::new(Vec::new());
        fixture.storage.set(keys::WISHLIST, "{not json").unwrap();
        assert!(fixture.wishlist().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_remove_clear() {
        let fixture = Fixture::new(vec![product(1, true), product(2, true)]);
        let wishlist = fixture.wishlist();

        assert!(wishlist.toggle(&reference(1)).await.unwrap());
        assert!(wishlist.toggle(&reference(2)).await.unwrap());
        assert!(!wishlist.toggle(&reference(1)).await.unwrap());
        assert!(!wishlist.remove(ProductId::new(99)).unwrap());
        assert_eq!(wishlist.len(), 1);

        assert!(wishlist.clear().unwrap());
        assert!(!wishlist.clear().unwrap());
        assert!(wishlist.is_empty());
    }

    #[tokio::test]
    async fn test_add_all_isolates_failures() {
        let fixture = Fixture::new(vec![product(1, true), product(2, true), product(3, true)]);
        fixture.shop.fail_variant(VariantId::new(20));
        let wishlist = fixture.wishlist();
        let cart = fixture.cart();
        for id in 1..=3 {
            wishlist.add(&reference(id)).await.unwrap();
        }

        let summary = wishlist.add_all_to_cart(&cart).await.unwrap();
        assert_eq!(summary, AddAllSummary { added: 2, attempted: 3 });
        assert_eq!(cart.state().item_count(), 2);
        assert!(cart.is_open());
        assert_eq!(
            fixture.notifications.active().pop().unwrap().message,
            "2 of 3 added to cart"
        );
    }

    #[tokio::test]
    async fn test_add_all_without_candidates() {
        let fixture = Fixture::new(vec![product(1, false)]);
        let wishlist = fixture.wishlist();
        let cart = fixture.cart();
        wishlist.add(&reference(1)).await.unwrap();
        let before = fixture.shop.request_count();

        let summary = wishlist.add_all_to_cart(&cart).await.unwrap();
        assert_eq!(summary.attempted, 0);
        assert_eq!(fixture.shop.request_count(), before);
        assert_eq!(fixture.notifications.active().pop().unwrap().level, Level::Warning);
    }

    #[tokio::test]
    async fn test_share() {
        let fixture = Fixture::new(vec![product(1, true), product(2, true)]);
        let wishlist = fixture.wishlist();
        let base = Url::parse("https://shop.test/").unwrap();
        assert!(wishlist.share_url(&base).is_none());
        assert!(wishlist.share_text().is_none());

        wishlist.add(&reference(1)).await.unwrap();
        wishlist.add(&reference(2)).await.unwrap();
        assert_eq!(
            wishlist.share_url(&base).unwrap().as_str(),
            "https://shop.test/wishlist?products=1%2C2"
        );
        assert_eq!(
            wishlist.share_text().unwrap(),
            "I saved 2 products worth $30.00 in total. Take a look!"
        );
    }
}
