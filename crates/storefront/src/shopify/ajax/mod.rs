//! `reqwest` implementation of the Shopify Ajax API.
//!
//! Product snapshots are cached using `moka`; cart and search calls always hit
//! the shop. The cart cookie is persisted through [`ClientStorage`].

mod conversions;
mod session;

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use scifi_theme_core::{CartLine, CartState, LineKey, Product};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ThemeConfig;
use crate::storage::ClientStorage;
use crate::shopify::types::{AjaxCart, AjaxCartLine, AjaxErrorBody, AjaxProduct, SuggestPayload};
use crate::shopify::{AddToCart, AjaxError, StorefrontApi, SuggestQuery, SuggestResults};

use conversions::{convert_cart, convert_cart_line, convert_product, convert_suggest};
use session::CartSession;

/// Client for the Shopify Ajax API of one shop.
///
/// Keeps the shop's cart cookie between calls, so every clone of a client
/// operates on the same cart. The cookie is restored from and saved to client
/// storage, so the cart also outlives the process.
#[derive(Clone)]
pub struct AjaxClient {
    inner: Arc<AjaxClientInner>,
}

struct AjaxClientInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<String, Product>,
    session: CartSession,
}

impl AjaxClient {
    /// Create a client for the configured shop, resuming the cart stored in
    /// `storage`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ThemeConfig, storage: Arc<dyn ClientStorage>) -> Result<Self, AjaxError> {
        let mut headers = HeaderMap::new();
        // Shopify answers Ajax endpoints with JSON only when asked like a browser would
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let session = CartSession::restore(config.shop_url.clone(), storage);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(session.jar())
            .build()?;

        let products = Cache::builder()
            .max_capacity(500)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(AjaxClientInner {
                client,
                base_url: config.shop_url.clone(),
                products,
                session,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AjaxError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| AjaxError::Unavailable(format!("Invalid endpoint {path}: {e}")))
    }

    /// Send a request and decode the JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AjaxError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                AjaxError::Unavailable(e.to_string())
            } else {
                AjaxError::Http(e)
            }
        })?;

        let status = response.status();
        self.inner.session.persist();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(AjaxError::RateLimited(retry_after));
        }

        let response_text = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AjaxError::NotFound(
                response_text.chars().take(200).collect::<String>(),
            ));
        }

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shop returned non-success status"
            );
            return Err(AjaxError::Api {
                status: status.as_u16(),
                description: error_description(&response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Ajax response"
            );
            AjaxError::Parse(e)
        })
    }
}

/// Pull the shop's message out of an error body (`description`, then `message`).
fn error_description(body: &str) -> String {
    serde_json::from_str::<AjaxErrorBody>(body)
        .ok()
        .and_then(|b| b.description.or(b.message))
        .unwrap_or_default()
}

#[async_trait]
impl StorefrontApi for AjaxClient {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<CartState, AjaxError> {
        let url = self.endpoint("/cart.js")?;
        let cart: AjaxCart = self.send(self.inner.client.get(url)).await?;
        Ok(convert_cart(cart))
    }

    #[instrument(skip(self, request), fields(variant_id = %request.id, quantity = request.quantity))]
    async fn add_to_cart(&self, request: &AddToCart) -> Result<CartLine, AjaxError> {
        let url = self.endpoint("/cart/add.js")?;
        let line: AjaxCartLine = self.send(self.inner.client.post(url).json(request)).await?;
        Ok(convert_cart_line(line))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn change_line(&self, key: &LineKey, quantity: u32) -> Result<CartState, AjaxError> {
        let url = self.endpoint("/cart/change.js")?;
        let body = serde_json::json!({ "id": key.as_str(), "quantity": quantity });
        let cart: AjaxCart = self.send(self.inner.client.post(url).json(&body)).await?;
        Ok(convert_cart(cart))
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<CartState, AjaxError> {
        let url = self.endpoint("/cart/clear.js")?;
        let cart: AjaxCart = self.send(self.inner.client.post(url)).await?;
        Ok(convert_cart(cart))
    }

    #[instrument(skip(self))]
    async fn apply_discount(&self, code: &str) -> Result<CartState, AjaxError> {
        let url = self.endpoint("/cart/update.js")?;
        let body = serde_json::json!({ "discount": code });
        let cart: AjaxCart = self.send(self.inner.client.post(url).json(&body)).await?;
        Ok(convert_cart(cart))
    }

    #[instrument(skip(self, query), fields(q = %query.q))]
    async fn search_suggest(&self, query: &SuggestQuery) -> Result<SuggestResults, AjaxError> {
        let mut url = self.endpoint("/search/suggest.json")?;
        url.query_pairs_mut()
            .append_pair("q", &query.q)
            .append_pair("resources[type]", &query.resource_types)
            .append_pair("resources[limit]", &query.limit.to_string());

        let payload: SuggestPayload = self.send(self.inner.client.get(url)).await?;
        Ok(convert_suggest(payload))
    }

    #[instrument(skip(self))]
    async fn get_product(&self, handle: &str) -> Result<Product, AjaxError> {
        if let Some(product) = self.inner.products.get(handle).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let url = self.endpoint(&format!("/products/{}.js", urlencoding::encode(handle)))?;
        let product: AjaxProduct = self
            .send(self.inner.client.get(url))
            .await
            .map_err(|e| match e {
                AjaxError::NotFound(_) => AjaxError::NotFound(format!("Product not found: {handle}")),
                other => other,
            })?;
        let product = convert_product(product);

        self.inner
            .products
            .insert(handle.to_string(), product.clone())
            .await;

        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, keys};

    fn client(base: &str) -> AjaxClient {
        let storage = Arc::new(MemoryStorage::new());
        AjaxClient::new(&ThemeConfig::for_shop(Url::parse(base).unwrap()), storage).unwrap()
    }

    #[test]
    fn test_endpoint_resolves_from_shop_root() {
        let client = client("https://scifi.example.com/collections/all");
        assert_eq!(
            client.endpoint("/cart.js").unwrap().as_str(),
            "https://scifi.example.com/cart.js"
        );
    }

    #[test]
    fn test_error_description_prefers_description() {
        let body = r#"{"status": 422, "message": "Cart Error", "description": "Sold out"}"#;
        assert_eq!(error_description(body), "Sold out");
        assert_eq!(error_description(r#"{"message": "Cart Error"}"#), "Cart Error");
        assert_eq!(error_description("<html>oops</html>"), "");
    }

    #[test]
    fn test_stored_cart_token_seeds_client() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::CART_TOKEN, "c1-abc").unwrap();

        let config = ThemeConfig::for_shop(Url::parse("https://scifi.example.com/").unwrap());
        let client = AjaxClient::new(&config, storage).unwrap();

        assert_eq!(client.inner.session.token().as_deref(), Some("c1-abc"));
    }

    #[tokio::test]
    async fn test_unreachable_shop_is_an_error() {
        // Port 9 (discard) is closed on test hosts; the call must fail, not hang or panic
        let client = client("http://127.0.0.1:9");
        assert!(client.get_cart().await.is_err());
    }
}
