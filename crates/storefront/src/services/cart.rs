//! Cart store.
//!
//! Mirrors the shop's cart. Every mutation follows "fire, await, reconcile":
//! the Ajax call is made, then the whole cart is reloaded and replaces the
//! local snapshot. There is no retry. At most one mutation runs at a time;
//! calls made meanwhile return [`Mutation::Busy`].
//!
//! Quantity edits keep a provisional value per line while the change is in
//! flight. The provisional value is dropped once the call completes, so a
//! failed change falls back to the shop's quantity.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use askama::Template;
use scifi_theme_core::{CartLine, CartState, LineKey, Money, VariantId};
use tracing::{debug, instrument, warn};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::events::{EventBus, ThemeEvent};
use crate::notifications::NotificationBus;
use crate::render::{CartCountTemplate, CartSidebarTemplate, CartView, RenderError};
use crate::shopify::{AddToCart, StorefrontApi};

use super::single_flight::{BusyFlag, Mutation};

/// Client-side mirror of the shop's cart.
pub struct CartStore {
    api: Arc<dyn StorefrontApi>,
    events: EventBus,
    notifications: Arc<NotificationBus>,
    free_shipping_threshold: Money,
    state: RwLock<CartState>,
    provisional: Mutex<HashMap<LineKey, u32>>,
    open: AtomicBool,
    busy: BusyFlag,
    sidebar_html: RwLock<String>,
    count_html: RwLock<String>,
}

impl CartStore {
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        events: EventBus,
        notifications: Arc<NotificationBus>,
        free_shipping_threshold: Money,
    ) -> Self {
        Self {
            api,
            events,
            notifications,
            free_shipping_threshold,
            state: RwLock::new(CartState::empty()),
            provisional: Mutex::new(HashMap::new()),
            open: AtomicBool::new(false),
            busy: BusyFlag::new(),
            sidebar_html: RwLock::new(String::new()),
            count_html: RwLock::new(String::new()),
        }
    }

    // =========================================================================
    // Snapshot Accessors
    // =========================================================================

    /// Current cart snapshot.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Quantity to show for a line: the provisional value while a change is
    /// in flight, otherwise the shop's quantity.
    #[must_use]
    pub fn displayed_quantity(&self, key: &LineKey) -> Option<u32> {
        let provisional = self
            .provisional
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied();
        provisional.or_else(|| self.state().line(key).map(|line| line.quantity))
    }

    /// Last rendered sidebar fragment.
    #[must_use]
    pub fn sidebar_html(&self) -> String {
        self.sidebar_html.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Last rendered count badge fragment.
    #[must_use]
    pub fn count_html(&self) -> String {
        self.count_html.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    // =========================================================================
    // View State
    // =========================================================================

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    pub fn open(&self) {
        self.set_open(true);
    }

    pub fn close(&self) {
        self.set_open(false);
    }

    /// Flip the view; returns the new state.
    pub fn toggle(&self) -> bool {
        let open = !self.is_open();
        self.set_open(open);
        open
    }

    fn set_open(&self, open: bool) {
        if self.open.swap(open, Ordering::Relaxed) != open
            && let Err(e) = self.render()
        {
            warn!(error = %e, "Failed to re-render cart sidebar");
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the cart and replace the local snapshot.
    ///
    /// On failure the previous snapshot is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be fetched or rendered.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<CartState> {
        let cart = self
            .api
            .get_cart()
            .await
            .map_err(|e| AppError::action("Could not load your cart", e))?;

        *self.state.write().unwrap_or_else(PoisonError::into_inner) = cart.clone();
        self.render()?;
        self.events.publish(ThemeEvent::CartUpdated {
            item_count: cart.item_count(),
            total_price: cart.total_price(),
        });

        debug!(item_count = cart.item_count(), "Cart loaded");
        Ok(cart)
    }

    /// Reload after a failed mutation; the original error wins.
    async fn reconcile(&self) {
        if let Err(e) = self.load().await {
            warn!(error = %e, "Reload after failed cart change also failed");
        }
    }

    fn render(&self) -> std::result::Result<(), RenderError> {
        let cart = self.state();
        let sidebar = CartSidebarTemplate {
            cart: CartView::new(&cart, self.free_shipping_threshold),
            is_open: self.is_open(),
        }
        .render()?;
        let count = CartCountTemplate {
            count: cart.item_count(),
        }
        .render()?;

        *self.sidebar_html.write().unwrap_or_else(PoisonError::into_inner) = sidebar;
        *self.count_html.write().unwrap_or_else(PoisonError::into_inner) = count;
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a variant, reload, and open the cart view.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the shop's message (or a generic one) if the
    /// add fails, or if the reload afterwards fails.
    #[instrument(skip(self, properties), fields(variant_id = %variant_id))]
    pub async fn add_item(
        &self,
        variant_id: VariantId,
        quantity: u32,
        properties: BTreeMap<String, String>,
    ) -> Result<Mutation<CartLine>> {
        let Some(_guard) = self.busy.try_acquire() else {
            debug!("Cart busy, add dropped");
            return Ok(Mutation::Busy);
        };

        add_breadcrumb(
            "cart",
            "Add to cart",
            Some(&[
                ("variant_id", &variant_id.to_string()),
                ("quantity", &quantity.to_string()),
            ]),
        );

        let request = AddToCart {
            id: variant_id,
            quantity: quantity.max(1),
            properties,
        };
        let line = self
            .api
            .add_to_cart(&request)
            .await
            .map_err(|e| AppError::action("Could not add to cart", e))?;

        self.load().await?;
        self.notifications.success("Added to cart");
        self.open();

        Ok(Mutation::Applied(line))
    }

    /// Set a line's quantity. Negative targets clamp to zero, and zero removes
    /// the line exactly as [`CartStore::remove_item`] does. Targets beyond
    /// `u32::MAX` saturate.
    ///
    /// # Errors
    ///
    /// Returns an error if the change fails; the cart is reloaded first so the
    /// displayed quantity reverts to the shop's value.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn update_quantity(&self, key: &LineKey, quantity: i64) -> Result<Mutation<CartState>> {
        if quantity <= 0 {
            return self.remove_item(key).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let Some(_guard) = self.busy.try_acquire() else {
            debug!("Cart busy, quantity change dropped");
            return Ok(Mutation::Busy);
        };

        self.set_provisional(key, Some(quantity));
        let result = self.api.change_line(key, quantity).await;
        self.set_provisional(key, None);

        match result {
            Ok(_) => Ok(Mutation::Applied(self.load().await?)),
            Err(e) => {
                self.reconcile().await;
                Err(AppError::action("Could not update quantity", e))
            }
        }
    }

    /// Change a line's quantity by `delta` relative to what is displayed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown line, otherwise as
    /// [`CartStore::update_quantity`].
    pub async fn adjust_quantity(&self, key: &LineKey, delta: i64) -> Result<Mutation<CartState>> {
        let current = self
            .displayed_quantity(key)
            .ok_or_else(|| AppError::NotFound(format!("cart line {key}")))?;
        self.update_quantity(key, i64::from(current) + delta).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails (after reconciling).
    #[instrument(skip(self), fields(key = %key))]
    pub async fn remove_item(&self, key: &LineKey) -> Result<Mutation<CartState>> {
        let Some(_guard) = self.busy.try_acquire() else {
            debug!("Cart busy, removal dropped");
            return Ok(Mutation::Busy);
        };

        add_breadcrumb("cart", "Remove from cart", Some(&[("key", key.as_str())]));

        match self.api.change_line(key, 0).await {
            Ok(_) => {
                let cart = self.load().await?;
                self.notifications.success("Item removed");
                Ok(Mutation::Applied(cart))
            }
            Err(e) => {
                self.reconcile().await;
                Err(AppError::action("Could not remove item", e))
            }
        }
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear fails (after reconciling).
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Mutation<CartState>> {
        let Some(_guard) = self.busy.try_acquire() else {
            debug!("Cart busy, clear dropped");
            return Ok(Mutation::Busy);
        };

        match self.api.clear_cart().await {
            Ok(_) => {
                let cart = self.load().await?;
                self.notifications.success("Cart cleared");
                Ok(Mutation::Applied(cart))
            }
            Err(e) => {
                self.reconcile().await;
                Err(AppError::action("Could not clear cart", e))
            }
        }
    }

    /// Apply a discount code.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for a blank code, or an error if the shop rejects it.
    #[instrument(skip(self))]
    pub async fn apply_discount_code(&self, code: &str) -> Result<Mutation<CartState>> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::BadRequest("Enter a discount code".to_string()));
        }

        let Some(_guard) = self.busy.try_acquire() else {
            debug!("Cart busy, discount dropped");
            return Ok(Mutation::Busy);
        };

        self.api
            .apply_discount(code)
            .await
            .map_err(|e| AppError::action("Invalid discount code", e))?;

        let cart = self.load().await?;
        self.notifications.success("Discount code applied");
        Ok(Mutation::Applied(cart))
    }

    fn set_provisional(&self, key: &LineKey, quantity: Option<u32>) {
        let mut provisional = self.provisional.lock().unwrap_or_else(PoisonError::into_inner);
        match quantity {
            Some(quantity) => {
                provisional.insert(key.clone(), quantity);
            }
            None => {
                provisional.remove(key);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use scifi_theme_core::{
        InventoryManagement, InventoryPolicy, Product, ProductId, ProductOption, Variant,
    };

    use super::*;
    use crate::events::EventKind;
    use crate::notifications::Level;
    use crate::shopify::InMemoryShop;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            handle: "warp-core".to_string(),
            title: "Warp Core".to_string(),
            vendor: None,
            product_type: None,
            price: Money::from_cents(1000),
            compare_at_price: None,
            available: true,
            featured_image: None,
            options: vec![ProductOption {
                name: "Title".to_string(),
                values: vec!["Default Title".to_string()],
            }],
            variants: vec![Variant {
                id: VariantId::new(11),
                title: "Default Title".to_string(),
                options: vec!["Default Title".to_string()],
                price: Money::from_cents(1000),
                compare_at_price: None,
                available: true,
                inventory_management: InventoryManagement::None,
                inventory_policy: InventoryPolicy::Deny,
                inventory_quantity: 0,
                sku: None,
                featured_image: None,
            }],
        }
    }

    fn store(shop: &InMemoryShop) -> (CartStore, EventBus, Arc<NotificationBus>) {
        let events = EventBus::new();
        let notifications = Arc::new(NotificationBus::new(Duration::from_secs(3)));
        let store = CartStore::new(
            Arc::new(shop.clone()),
            events.clone(),
            Arc::clone(&notifications),
            Money::from_cents(50_000),
        );
        (store, events, notifications)
    }

    fn seeded_line(key: &str, quantity: u32, price: i64) -> CartLine {
        CartLine {
            key: LineKey::new(key),
            variant_id: VariantId::new(11),
            product_id: ProductId::new(1),
            quantity,
            final_price: Money::from_cents(price),
            original_price: Money::from_cents(price),
            product_title: "Warp Core".to_string(),
            variant_title: None,
            image: None,
            url: None,
            inventory_quantity: None,
            properties: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_load_replaces_state_and_publishes() {
        let shop = InMemoryShop::with_products([product()]);
        shop.seed_cart(vec![seeded_line("a", 2, 1000)]);
        let (store, events, _) = store(&shop);
        let mut updates = events.subscribe_to(&[EventKind::CartUpdated]);

        let cart = store.load().await.unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_price(), Money::from_cents(2000));
        assert!(store.sidebar_html().contains(r#"data-key="a""#));
        assert_eq!(
            updates.try_recv(),
            Some(ThemeEvent::CartUpdated {
                item_count: 2,
                total_price: Money::from_cents(2000)
            })
        );
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_state() {
        let shop = InMemoryShop::with_products([product()]);
        shop.seed_cart(vec![seeded_line("a", 2, 1000)]);
        let (store, _, _) = store(&shop);
        store.load().await.unwrap();

        shop.set_offline(true);
        assert!(store.load().await.is_err());
        assert_eq!(store.state().item_count(), 2);
    }

    #[tokio::test]
    async fn test_add_item_reloads_and_opens() {
        let shop = InMemoryShop::with_products([product()]);
        let (store, _, notifications) = store(&shop);

        let outcome = store
            .add_item(VariantId::new(11), 2, BTreeMap::new())
            .await
            .unwrap();
        assert!(matches!(outcome, Mutation::Applied(ref line) if line.quantity == 2));
        assert_eq!(store.state().item_count(), 2);
        assert!(store.is_open());
        assert_eq!(notifications.active()[0].level, Level::Success);
    }

    #[tokio::test]
    async fn test_add_item_failure_surfaces_shop_message() {
        let shop = InMemoryShop::with_products([product()]);
        let (store, _, _) = store(&shop);

        let err = store
            .add_item(VariantId::new(404), 1, BTreeMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Cannot find variant");
        assert!(!store.is_busy());
        assert!(!store.is_open());
    }

    #[tokio::test]
    async fn test_negative_quantity_removes_line() {
        let shop = InMemoryShop::with_products([product()]);
        shop.seed_cart(vec![seeded_line("a", 2, 1000)]);
        let (store, _, _) = store(&shop);
        store.load().await.unwrap();

        let outcome = store.update_quantity(&LineKey::new("a"), -5).await.unwrap();
        let cart = outcome.applied().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total_price(), Money::ZERO);
    }

    #[tokio::test]
    async fn test_oversized_quantity_saturates_instead_of_removing() {
        let shop = InMemoryShop::with_products([product()]);
        shop.seed_cart(vec![seeded_line("a", 2, 1000)]);
        let (store, _, _) = store(&shop);
        store.load().await.unwrap();

        let outcome = store
            .update_quantity(&LineKey::new("a"), 5_000_000_000)
            .await
            .unwrap();
        let cart = outcome.applied().unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.line(&LineKey::new("a")).unwrap().quantity, u32::MAX);
        assert_eq!(store.displayed_quantity(&LineKey::new("a")), Some(u32::MAX));
    }

    #[tokio::test]
    async fn test_failed_change_reverts_to_shop_quantity() {
        let shop = InMemoryShop::with_products([product()]);
        shop.seed_cart(vec![seeded_line("a", 2, 1000)]);
        let (store, _, _) = store(&shop);
        store.load().await.unwrap();

        let err = store
            .update_quantity(&LineKey::new("missing"), 3)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "No line item with key missing");
        assert_eq!(store.displayed_quantity(&LineKey::new("a")), Some(2));
        assert_eq!(store.displayed_quantity(&LineKey::new("missing")), None);
    }

    #[tokio::test]
    async fn test_adjust_quantity_from_displayed() {
        let shop = InMemoryShop::with_products([product()]);
        shop.seed_cart(vec![seeded_line("a", 2, 1000)]);
        let (store, _, _) = store(&shop);
        store.load().await.unwrap();

        let outcome = store.adjust_quantity(&LineKey::new("a"), 1).await.unwrap();
        assert!(outcome.applied().is_some());
        assert_eq!(store.displayed_quantity(&LineKey::new("a")), Some(3));

        assert!(matches!(
            store.adjust_quantity(&LineKey::new("zzz"), 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_mutation_dropped() {
        let shop = InMemoryShop::with_products([product()]);
        shop.set_latency(Duration::from_millis(50));
        let (store, _, _) = store(&shop);

        let (first, second) = tokio::join!(
            store.add_item(VariantId::new(11), 1, BTreeMap::new()),
            store.add_item(VariantId::new(11), 1, BTreeMap::new()),
        );
        assert!(matches!(first.unwrap(), Mutation::Applied(_)));
        assert!(second.unwrap().is_busy());
        assert_eq!(store.state().item_count(), 1);
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn test_clear_and_discount() {
        let shop = InMemoryShop::with_products([product()]);
        shop.seed_cart(vec![seeded_line("a", 2, 1000)]);
        let (store, _, _) = store(&shop);

        let outcome = store.apply_discount_code(" NEBULA10 ").await.unwrap();
        assert!(!outcome.is_busy());
        assert_eq!(shop.discount().as_deref(), Some("NEBULA10"));
        assert!(matches!(
            store.apply_discount_code("  ").await,
            Err(AppError::BadRequest(_))
        ));

        let cart = store.clear().await.unwrap().applied().unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_toggle_view() {
        let shop = InMemoryShop::new();
        let (store, _, _) = store(&shop);
        assert!(store.toggle());
        assert!(store.is_open());
        assert!(!store.toggle());
        store.open();
        store.close();
        assert!(!store.is_open());
    }
}
