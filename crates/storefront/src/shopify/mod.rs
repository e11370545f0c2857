//! Shopify Ajax API access.
//!
//! # Architecture
//!
//! - The shop is the source of truth - the stores mirror what these calls return
//! - [`StorefrontApi`] is the seam every store talks to; [`AjaxClient`] implements
//!   it over `reqwest`, [`InMemoryShop`] implements it in memory
//! - Wire types live in [`types`] and are converted to `scifi_theme_core`
//!   domain types before leaving this module
//! - Product snapshots are cached via `moka` (5 minute TTL); cart calls never are
//!
//! # Endpoints
//!
//! | Call | Endpoint |
//! |---|---|
//! | [`StorefrontApi::get_cart`] | `GET /cart.js` |
//! | [`StorefrontApi::add_to_cart`] | `POST /cart/add.js` |
//! | [`StorefrontApi::change_line`] | `POST /cart/change.js` |
//! | [`StorefrontApi::clear_cart`] | `POST /cart/clear.js` |
//! | [`StorefrontApi::apply_discount`] | `POST /cart/update.js` |
//! | [`StorefrontApi::search_suggest`] | `GET /search/suggest.json` |
//! | [`StorefrontApi::get_product`] | `GET /products/:handle.js` |
//!
//! # Example
//!
//! ```rust,ignore
//! use scifi_theme_storefront::shopify::{AjaxClient, StorefrontApi};
//!
//! let client = AjaxClient::new(&config, Arc::new(FileStorage::open(&config.storage_dir)?))?;
//! let cart = client.get_cart().await?;
//! println!("{} items", cart.item_count());
//! ```

mod ajax;
mod memory;
pub mod types;

pub use ajax::AjaxClient;
pub use memory::InMemoryShop;

use std::collections::BTreeMap;

use async_trait::async_trait;
use scifi_theme_core::{CartLine, CartState, LineKey, Product, Suggestion, VariantId};
use thiserror::Error;

/// Errors that can occur when calling the Shopify Ajax API.
#[derive(Debug, Error)]
pub enum AjaxError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The shop answered with a non-success status.
    #[error("API error {status}: {description}")]
    Api { status: u16, description: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Transport unavailable (connection refused, offline).
    #[error("Shop unavailable: {0}")]
    Unavailable(String),
}

impl AjaxError {
    /// Message the shop provided for this failure, if any.
    ///
    /// Only `Api` errors carry a shop-provided `description`; every other
    /// variant returns `None` so callers fall back to a generic message.
    #[must_use]
    pub fn shop_message(&self) -> Option<&str> {
        match self {
            Self::Api { description, .. } if !description.is_empty() => Some(description),
            _ => None,
        }
    }
}

/// Body of `POST /cart/add.js`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AddToCart {
    pub id: VariantId,
    pub quantity: u32,
    pub properties: BTreeMap<String, String>,
}

impl AddToCart {
    /// Add `quantity` of a variant without line properties.
    #[must_use]
    pub fn new(id: VariantId, quantity: u32) -> Self {
        Self {
            id,
            quantity,
            properties: BTreeMap::new(),
        }
    }
}

/// Query of `GET /search/suggest.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestQuery {
    pub q: String,
    /// `resources[type]`; empty means every type.
    pub resource_types: String,
    /// `resources[limit]`.
    pub limit: u32,
}

/// Suggestions grouped by category, in the shop's ranking order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestResults {
    pub products: Vec<Suggestion>,
    pub articles: Vec<Suggestion>,
    pub pages: Vec<Suggestion>,
    pub collections: Vec<Suggestion>,
}

/// The Shopify Ajax endpoints the theme consumes.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// Fetch the current cart.
    async fn get_cart(&self) -> Result<CartState, AjaxError>;

    /// Add a variant to the cart; returns the affected line.
    async fn add_to_cart(&self, request: &AddToCart) -> Result<CartLine, AjaxError>;

    /// Set a line's quantity (0 removes it).
    async fn change_line(&self, key: &LineKey, quantity: u32) -> Result<CartState, AjaxError>;

    /// Remove every line.
    async fn clear_cart(&self) -> Result<CartState, AjaxError>;

    /// Apply a discount code to the cart.
    async fn apply_discount(&self, code: &str) -> Result<CartState, AjaxError>;

    /// Fetch categorized search suggestions.
    async fn search_suggest(&self, query: &SuggestQuery) -> Result<SuggestResults, AjaxError>;

    /// Fetch a product snapshot by handle.
    async fn get_product(&self, handle: &str) -> Result<Product, AjaxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ajax_error_display() {
        let err = AjaxError::NotFound("product plasma-jacket".to_string());
        assert_eq!(err.to_string(), "Not found: product plasma-jacket");

        let err = AjaxError::Api {
            status: 422,
            description: "All 3 Plasma Jacket are in your cart.".to_string(),
        };
        assert_eq!(err.to_string(), "API error 422: All 3 Plasma Jacket are in your cart.");
    }

    #[test]
    fn test_shop_message_only_for_api_errors() {
        let err = AjaxError::Api {
            status: 422,
            description: "Sold out".to_string(),
        };
        assert_eq!(err.shop_message(), Some("Sold out"));

        let err = AjaxError::Api {
            status: 500,
            description: String::new(),
        };
        assert_eq!(err.shop_message(), None);

        assert_eq!(AjaxError::RateLimited(2).shop_message(), None);
    }

    #[test]
    fn test_rate_limited_error() {
        let err = AjaxError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
