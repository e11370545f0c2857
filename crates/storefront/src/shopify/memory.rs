//! In-process shop implementing [`StorefrontApi`].
//!
//! Backs the unit and integration tests. Cart lines merge by variant like the
//! real shop and prices come from the product catalog. Failures can be
//! injected per variant or per handle.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use scifi_theme_core::{
    CartLine, CartState, LineKey, Product, Suggestion, SuggestionKind, Variant, VariantId,
};

use super::{AddToCart, AjaxError, StorefrontApi, SuggestQuery, SuggestResults};

/// Shop state held entirely in memory.
#[derive(Clone, Default)]
pub struct InMemoryShop {
    inner: Arc<Mutex<ShopState>>,
}

#[derive(Default)]
struct ShopState {
    products: Vec<Product>,
    lines: Vec<CartLine>,
    next_line: u64,
    discount: Option<String>,
    suggestions: HashMap<String, SuggestResults>,
    failing_variants: HashSet<VariantId>,
    failing_handles: HashSet<String>,
    offline: bool,
    latency: Option<Duration>,
    requests: usize,
    suggest_requests: usize,
}

impl InMemoryShop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shop seeded with a product catalog.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let shop = Self::new();
        for product in products {
            shop.add_product(product);
        }
        shop
    }

    fn state(&self) -> MutexGuard<'_, ShopState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a product to the catalog.
    pub fn add_product(&self, product: Product) {
        self.state().products.push(product);
    }

    /// Serve fixed suggestions for an exact query.
    pub fn set_suggestions(&self, query: impl Into<String>, results: SuggestResults) {
        self.state().suggestions.insert(query.into(), results);
    }

    /// Make every add of this variant fail with a 422.
    pub fn fail_variant(&self, id: VariantId) {
        self.state().failing_variants.insert(id);
    }

    /// Make product lookups for this handle fail.
    pub fn fail_handle(&self, handle: impl Into<String>) {
        self.state().failing_handles.insert(handle.into());
    }

    /// Fail every call as if the shop were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Delay every call (for exercising in-flight behavior).
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    /// Replace the cart with these lines.
    pub fn seed_cart(&self, lines: Vec<CartLine>) {
        let mut state = self.state();
        state.next_line = u64::try_from(lines.len()).unwrap_or(u64::MAX);
        state.lines = lines;
    }

    /// Total calls received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state().requests
    }

    /// Calls to the suggest endpoint received.
    #[must_use]
    pub fn suggest_count(&self) -> usize {
        self.state().suggest_requests
    }

    /// Last discount code applied.
    #[must_use]
    pub fn discount(&self) -> Option<String> {
        self.state().discount.clone()
    }

    /// Count the call, wait out any latency and fail if offline.
    async fn enter(&self) -> Result<(), AjaxError> {
        let latency = {
            let mut state = self.state();
            state.requests += 1;
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.state().offline {
            return Err(AjaxError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn cart(state: &ShopState) -> CartState {
        CartState::from_lines(state.lines.clone())
    }
}

fn find_variant(products: &[Product], id: VariantId) -> Option<(&Product, &Variant)> {
    products
        .iter()
        .find_map(|product| product.variant(id).map(|variant| (product, variant)))
}

fn unprocessable(description: impl Into<String>) -> AjaxError {
    AjaxError::Api {
        status: 422,
        description: description.into(),
    }
}

#[async_trait]
impl StorefrontApi for InMemoryShop {
    async fn get_cart(&self) -> Result<CartState, AjaxError> {
        self.enter().await?;
        Ok(Self::cart(&self.state()))
    }

    async fn add_to_cart(&self, request: &AddToCart) -> Result<CartLine, AjaxError> {
        self.enter().await?;
        let mut state = self.state();

        if state.failing_variants.contains(&request.id) {
            return Err(unprocessable("Cart Error"));
        }
        let (product, variant) = find_variant(&state.products, request.id)
            .map(|(product, variant)| (product.clone(), variant.clone()))
            .ok_or_else(|| unprocessable("Cannot find variant"))?;
        if !variant.available {
            return Err(unprocessable(format!("{} is already sold out.", product.title)));
        }

        let properties = request.properties.clone();
        if let Some(line) = state
            .lines
            .iter_mut()
            .find(|line| line.variant_id == request.id && line.properties == properties)
        {
            line.quantity += request.quantity;
            return Ok(line.clone());
        }

        let line = CartLine {
            key: LineKey::new(format!("{}:{}", request.id, state.next_line)),
            variant_id: variant.id,
            product_id: product.id,
            quantity: request.quantity,
            final_price: variant.price,
            original_price: variant.compare_at_price.unwrap_or(variant.price),
            product_title: product.title,
            variant_title: (product.variants.len() > 1).then(|| variant.title.clone()),
            image: variant.featured_image.clone().or(product.featured_image),
            url: Some(format!("/products/{}?variant={}", product.handle, variant.id)),
            inventory_quantity: variant.is_tracked().then_some(variant.inventory_quantity),
            properties,
        };
        state.next_line += 1;
        state.lines.push(line.clone());
        Ok(line)
    }

    async fn change_line(&self, key: &LineKey, quantity: u32) -> Result<CartState, AjaxError> {
        self.enter().await?;
        let mut state = self.state();

        let Some(index) = state.lines.iter().position(|line| &line.key == key) else {
            return Err(AjaxError::Api {
                status: 400,
                description: format!("No line item with key {key}"),
            });
        };
        if quantity == 0 {
            state.lines.remove(index);
        } else if let Some(line) = state.lines.get_mut(index) {
            line.quantity = quantity;
        }
        Ok(Self::cart(&state))
    }

    async fn clear_cart(&self) -> Result<CartState, AjaxError> {
        self.enter().await?;
        let mut state = self.state();
        state.lines.clear();
        Ok(Self::cart(&state))
    }

    async fn apply_discount(&self, code: &str) -> Result<CartState, AjaxError> {
        self.enter().await?;
        let mut state = self.state();
        state.discount = Some(code.to_string());
        Ok(Self::cart(&state))
    }

    async fn search_suggest(&self, query: &SuggestQuery) -> Result<SuggestResults, AjaxError> {
        self.enter().await?;
        let mut state = self.state();
        state.suggest_requests += 1;

        if let Some(results) = state.suggestions.get(&query.q) {
            return Ok(results.clone());
        }

        // Default: products whose title contains the query
        let needle = query.q.to_lowercase();
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let products = state
            .products
            .iter()
            .filter(|product| product.title.to_lowercase().contains(&needle))
            .take(limit)
            .map(|product| Suggestion {
                image: product.featured_image.clone(),
                price: Some(product.price),
                category: product.product_type.clone(),
                ..Suggestion::new(
                    SuggestionKind::Product,
                    product.title.clone(),
                    format!("/products/{}", product.handle),
                )
            })
            .collect();

        Ok(SuggestResults {
            products,
            ..SuggestResults::default()
        })
    }

    async fn get_product(&self, handle: &str) -> Result<Product, AjaxError> {
        self.enter().await?;
        let state = self.state();

        if state.failing_handles.contains(handle) {
            return Err(AjaxError::Api {
                status: 500,
                description: String::new(),
            });
        }
        state
            .products
            .iter()
            .find(|product| product.handle == handle)
            .cloned()
            .ok_or_else(|| AjaxError::NotFound(format!("Product not found: {handle}")))
    }
}
