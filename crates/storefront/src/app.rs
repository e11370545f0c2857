//! Application root.
//!
//! Owns every store and wires them together through the event bus. Cheaply
//! cloneable via `Arc`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scifi_theme_core::{LineKey, Money, Product, ProductId, ProductRef, VariantId};
use tracing::{debug, instrument};

use crate::config::ThemeConfig;
use crate::dispatch::{Action, Command, DispatchOutcome, Payload};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::events::{EventBus, EventKind, Subscription, ThemeEvent};
use crate::notifications::NotificationBus;
use crate::services::{
    CartStore, CheckoutPreferences, Mutation, OrderTotal, QuantitySelector, SearchSuggest,
    VariantResolver, VariantView, WishlistStore,
};
use crate::shopify::{AjaxClient, StorefrontApi};
use crate::storage::{ClientStorage, FileStorage};

/// The theme runtime: stores, buses and the dispatch table.
#[derive(Clone)]
pub struct ThemeApp {
    inner: Arc<ThemeAppInner>,
}

struct ThemeAppInner {
    config: ThemeConfig,
    api: Arc<dyn StorefrontApi>,
    events: EventBus,
    notifications: Arc<NotificationBus>,
    cart: CartStore,
    wishlist: WishlistStore,
    search: SearchSuggest,
    checkout: CheckoutPreferences,
    quantity: Mutex<QuantitySelector>,
    variant: Mutex<Option<VariantResolver>>,
    order_total: Mutex<OrderTotal>,
    inbox: Mutex<Subscription>,
}

impl ThemeApp {
    /// Assemble the runtime over an API and a storage backend.
    #[must_use]
    pub fn new(
        config: ThemeConfig,
        api: Arc<dyn StorefrontApi>,
        storage: Arc<dyn ClientStorage>,
    ) -> Self {
        let events = EventBus::new();
        let inbox = events.subscribe_to(&[
            EventKind::VariantChanged,
            EventKind::CartUpdated,
            EventKind::ShippingMethodSelected,
        ]);
        let notifications = Arc::new(NotificationBus::new(config.notification_duration));

        let cart = CartStore::new(
            Arc::clone(&api),
            events.clone(),
            Arc::clone(&notifications),
            config.free_shipping_threshold,
        );
        let wishlist = WishlistStore::new(
            Arc::clone(&api),
            Arc::clone(&storage),
            events.clone(),
            Arc::clone(&notifications),
        );
        let search = SearchSuggest::new(Arc::clone(&api), Arc::clone(&storage), &config.search);
        let checkout = CheckoutPreferences::new(storage, events.clone());
        let quantity = QuantitySelector::new(events.clone());

        Self {
            inner: Arc::new(ThemeAppInner {
                config,
                api,
                events,
                notifications,
                cart,
                wishlist,
                search,
                checkout,
                quantity: Mutex::new(quantity),
                variant: Mutex::new(None),
                order_total: Mutex::new(OrderTotal::default()),
                inbox: Mutex::new(inbox),
            }),
        }
    }

    /// Runtime talking to the configured shop, persisting under the storage
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the storage directory cannot be
    /// set up.
    pub fn from_config(config: ThemeConfig) -> Result<Self> {
        let storage: Arc<dyn ClientStorage> = Arc::new(FileStorage::open(&config.storage_dir)?);
        let api = AjaxClient::new(&config, Arc::clone(&storage))?;
        Ok(Self::new(config, Arc::new(api), storage))
    }

    /// Load the cart. A failure is posted as a notice and the cart stays
    /// empty.
    pub async fn init(&self) {
        if let Err(e) = self.inner.cart.load().await {
            self.fail(&e);
        }
        self.process_events();
    }

    #[must_use]
    pub fn config(&self) -> &ThemeConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn search(&self) -> &SearchSuggest {
        &self.inner.search
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutPreferences {
        &self.inner.checkout
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationBus {
        &self.inner.notifications
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Current product-page quantity.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        lock(&self.inner.quantity).value()
    }

    /// Current quantity bound.
    #[must_use]
    pub fn quantity_max(&self) -> u32 {
        lock(&self.inner.quantity).max()
    }

    #[must_use]
    pub fn order_total(&self) -> OrderTotal {
        *lock(&self.inner.order_total)
    }

    /// View of the product page's current selection, if a product is open.
    #[must_use]
    pub fn variant_view(&self) -> Option<VariantView> {
        lock(&self.inner.variant).as_ref().map(VariantResolver::view)
    }

    /// Fetch a product snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the product cannot be fetched.
    pub async fn product(&self, handle: &str) -> Result<Product> {
        self.inner
            .api
            .get_product(handle)
            .await
            .map_err(|e| AppError::action("Could not load product", e))
    }

    /// Open a product page: fetch the product and start variant selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the product cannot be fetched.
    #[instrument(skip(self))]
    pub async fn open_product(&self, handle: &str, initial: Option<VariantId>) -> Result<VariantView> {
        let product = self.product(handle).await?;
        let resolver = VariantResolver::new(product, initial, self.inner.events.clone());
        if let Some(variant) = resolver.resolve() {
            lock(&self.inner.quantity).apply_variant(variant);
        }
        let view = resolver.view();
        *lock(&self.inner.variant) = Some(resolver);
        Ok(view)
    }

    /// Run a command. Errors become error notices; nothing propagates.
    #[instrument(skip(self, command), fields(action = %command.action))]
    pub async fn dispatch(&self, command: Command) -> DispatchOutcome {
        add_breadcrumb("action", command.action.as_str(), None);

        let outcome = match self.run(&command).await {
            Ok(outcome) => outcome,
            Err(e) => DispatchOutcome::Failed {
                message: self.fail(&e),
            },
        };
        self.process_events();
        outcome
    }

    /// Parse an action identifier and run it.
    pub async fn dispatch_str(&self, action: &str, payload: Payload) -> DispatchOutcome {
        match Command::parse(action, payload) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => DispatchOutcome::Failed {
                message: self.fail(&e),
            },
        }
    }

    /// Deliver pending events to the stores that react to them.
    pub fn process_events(&self) {
        let pending = lock(&self.inner.inbox).drain();
        for event in pending {
            match &event {
                ThemeEvent::VariantChanged { variant, .. } => {
                    lock(&self.inner.quantity).apply_variant(variant);
                }
                ThemeEvent::CartUpdated { .. } | ThemeEvent::ShippingMethodSelected { .. } => {
                    lock(&self.inner.order_total).apply(&event);
                }
                _ => debug!(kind = ?event.kind(), "Event ignored"),
            }
        }
    }

    fn fail(&self, error: &AppError) -> String {
        error.report();
        let message = error.user_message();
        self.inner.notifications.error(message.clone());
        message
    }

    async fn run(&self, command: &Command) -> Result<DispatchOutcome> {
        let payload = &command.payload;
        let inner = &self.inner;

        let outcome = match command.action {
            Action::CartToggle => {
                inner.cart.toggle();
                DispatchOutcome::Applied
            }
            Action::CartOpen => {
                inner.cart.open();
                DispatchOutcome::Applied
            }
            Action::CartClose => {
                inner.cart.close();
                DispatchOutcome::Applied
            }
            Action::CartAdd => {
                let variant: VariantId = payload.parse_required("variant")?;
                let quantity = match payload.parse::<u32>("quantity")? {
                    Some(quantity) => quantity,
                    None => self.quantity(),
                };
                applied(inner.cart.add_item(variant, quantity, payload.properties()).await?)
            }
            Action::QuantityPlus => {
                applied(inner.cart.adjust_quantity(&line_key(payload)?, 1).await?)
            }
            Action::QuantityMinus => {
                applied(inner.cart.adjust_quantity(&line_key(payload)?, -1).await?)
            }
            Action::QuantitySet => {
                let quantity: i64 = payload.parse_required("quantity")?;
                applied(inner.cart.update_quantity(&line_key(payload)?, quantity).await?)
            }
            Action::CartRemove => applied(inner.cart.remove_item(&line_key(payload)?).await?),
            Action::CartClear => applied(inner.cart.clear().await?),
            Action::CartDiscount => {
                applied(inner.cart.apply_discount_code(payload.require("code")?).await?)
            }
            Action::WishlistToggle => {
                let product = ProductRef::new(
                    payload.parse_required("product-id")?,
                    payload.require("handle")?,
                );
                inner.wishlist.toggle(&product).await?;
                DispatchOutcome::Applied
            }
            Action::WishlistRemove => {
                let id: ProductId = payload.parse_required("product-id")?;
                inner.wishlist.remove(id)?;
                DispatchOutcome::Applied
            }
            Action::WishlistAddAll => {
                inner.wishlist.add_all_to_cart(&inner.cart).await?;
                DispatchOutcome::Applied
            }
            Action::WishlistClear => {
                inner.wishlist.clear()?;
                DispatchOutcome::Applied
            }
            Action::WishlistShare => {
                let shared = inner
                    .wishlist
                    .share_url(&inner.config.shop_url)
                    .zip(inner.wishlist.share_text());
                match shared {
                    Some((url, text)) => DispatchOutcome::Share { url, text },
                    None => {
                        inner.notifications.warning("Your wishlist is empty, nothing to share");
                        DispatchOutcome::Dropped
                    }
                }
            }
            Action::SearchQuery => {
                let outcome = inner.search.query_debounced(payload.get("q").unwrap_or_default()).await;
                if outcome.suggestions().is_some() {
                    DispatchOutcome::Applied
                } else {
                    DispatchOutcome::Dropped
                }
            }
            Action::SearchSubmit => self.submit_search(payload.get("q"))?,
            Action::SuggestionNext => {
                inner.search.select_next();
                DispatchOutcome::Applied
            }
            Action::SuggestionPrevious => {
                inner.search.select_previous();
                DispatchOutcome::Applied
            }
            Action::VariantSelect => {
                let value = payload.require("value")?;
                let mut variant = lock(&inner.variant);
                let resolver = variant
                    .as_mut()
                    .ok_or_else(|| AppError::BadRequest("No product is open".to_string()))?;
                match payload.parse::<usize>("option")? {
                    Some(index) => resolver.select_option(index, value)?,
                    None => resolver.select_named(payload.require("name")?, value)?,
                };
                DispatchOutcome::Applied
            }
            Action::ShippingSelect => {
                let price = Money::from_cents(payload.parse_required("price")?);
                inner.checkout.select_shipping_method(
                    payload.require("id")?,
                    price,
                    payload.parse("delivery-days")?,
                )?;
                DispatchOutcome::Applied
            }
            Action::PaymentSelect => {
                inner.checkout.select_payment_method(payload.require("id")?)?;
                DispatchOutcome::Applied
            }
        };
        Ok(outcome)
    }

    /// Record the search and return the results page, or the selected
    /// suggestion's page.
    fn submit_search(&self, term: Option<&str>) -> Result<DispatchOutcome> {
        let base = &self.inner.config.shop_url;
        let target = match term.map(str::trim).filter(|term| !term.is_empty()) {
            Some(term) => {
                self.inner.search.record_search(term);
                let mut url = base.join("search").map_err(|e| AppError::Internal(e.to_string()))?;
                url.query_pairs_mut().append_pair("q", term);
                url
            }
            None => {
                let suggestion = self
                    .inner
                    .search
                    .selected()
                    .ok_or_else(|| AppError::BadRequest("Enter a search term".to_string()))?;
                base.join(&suggestion.url)
                    .map_err(|e| AppError::Internal(e.to_string()))?
            }
        };
        Ok(DispatchOutcome::Navigate(target))
    }
}

fn applied<T>(mutation: Mutation<T>) -> DispatchOutcome {
    if mutation.is_busy() {
        DispatchOutcome::Dropped
    } else {
        DispatchOutcome::Applied
    }
}

fn line_key(payload: &Payload) -> Result<LineKey> {
    payload.require("key").map(LineKey::from)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
