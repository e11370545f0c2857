//! Wire types for the Shopify Ajax API.
//!
//! These mirror the JSON the shop sends and are deliberately lenient: every
//! field the theme does not strictly need is optional or defaulted. They are
//! converted to `scifi_theme_core` types before leaving the `shopify` module.

use std::collections::BTreeMap;

use serde::Deserialize;

// =============================================================================
// Cart Types
// =============================================================================

/// `GET /cart.js` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AjaxCart {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub items: Vec<AjaxCartLine>,
    /// Reported by the shop; the client recomputes it from `items`.
    #[serde(default)]
    pub item_count: Option<u32>,
    /// Reported by the shop; the client recomputes it from `items`.
    #[serde(default)]
    pub total_price: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One line of an Ajax cart (also the `POST /cart/add.js` response).
#[derive(Debug, Clone, Deserialize)]
pub struct AjaxCartLine {
    pub key: String,
    pub variant_id: i64,
    #[serde(default)]
    pub product_id: i64,
    pub quantity: u32,
    /// Unit price in cents.
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub final_price: Option<i64>,
    #[serde(default)]
    pub original_price: Option<i64>,
    #[serde(default)]
    pub product_title: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub properties: Option<BTreeMap<String, serde_json::Value>>,
}

/// Error body of a failed Ajax call (e.g. 422 from `/cart/add.js`).
#[derive(Debug, Clone, Deserialize)]
pub struct AjaxErrorBody {
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Product Types
// =============================================================================

/// `GET /products/:handle.js` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AjaxProduct {
    pub id: i64,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default, rename = "type")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub compare_at_price: Option<i64>,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub options: Vec<AjaxProductOption>,
    #[serde(default)]
    pub variants: Vec<AjaxVariant>,
}

/// Option axis of an Ajax product.
#[derive(Debug, Clone, Deserialize)]
pub struct AjaxProductOption {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Variant of an Ajax product.
#[derive(Debug, Clone, Deserialize)]
pub struct AjaxVariant {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub compare_at_price: Option<i64>,
    #[serde(default)]
    pub available: bool,
    /// `"shopify"` (or another service name) when tracked, `null` otherwise.
    #[serde(default)]
    pub inventory_management: Option<String>,
    /// `"deny"` or `"continue"`.
    #[serde(default)]
    pub inventory_policy: Option<String>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub featured_image: Option<AjaxImage>,
}

/// Image reference as either a bare URL or an object with `src`/`url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AjaxImage {
    Url(String),
    Object {
        #[serde(default, alias = "src")]
        url: Option<String>,
    },
}

impl AjaxImage {
    /// The image URL, if present.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Object { url } => url.as_deref(),
        }
    }
}

// =============================================================================
// Search Suggest Types
// =============================================================================

/// `GET /search/suggest.json` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestPayload {
    #[serde(default)]
    pub resources: SuggestResources,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestResources {
    #[serde(default)]
    pub results: SuggestResultsPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestResultsPayload {
    #[serde(default)]
    pub products: Vec<SuggestProduct>,
    #[serde(default)]
    pub articles: Vec<SuggestArticle>,
    #[serde(default)]
    pub pages: Vec<SuggestPage>,
    #[serde(default)]
    pub collections: Vec<SuggestCollection>,
}

/// Price as sent by the suggest endpoint: a decimal string or integer cents.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WirePrice {
    Cents(i64),
    Decimal(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestProduct {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub featured_image: Option<AjaxImage>,
    #[serde(default)]
    pub price: Option<WirePrice>,
    #[serde(default)]
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestArticle {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub image: Option<AjaxImage>,
    #[serde(default, alias = "summary_html")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestPage {
    pub title: String,
    pub url: String,
    #[serde(default, alias = "body")]
    pub body_html: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestCollection {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub featured_image: Option<AjaxImage>,
    #[serde(default)]
    pub products_count: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_payload_parses() {
        let json = r#"{
            "token": "c1",
            "item_count": 2,
            "total_price": 2000,
            "items": [{
                "key": "111:abc",
                "variant_id": 111,
                "product_id": 9,
                "quantity": 2,
                "price": 1000,
                "final_price": 1000,
                "original_price": 1200,
                "product_title": "Plasma Jacket",
                "variant_title": null,
                "image": "https://cdn.example.com/p.png",
                "properties": {"engraving": "X-01", "gift": null}
            }]
        }"#;
        let cart: AjaxCart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].original_price, Some(1200));
    }

    #[test]
    fn test_image_accepts_string_or_object() {
        let url: AjaxImage = serde_json::from_str(r#""https://cdn/x.png""#).unwrap();
        assert_eq!(url.url(), Some("https://cdn/x.png"));

        let object: AjaxImage = serde_json::from_str(r#"{"src": "https://cdn/y.png"}"#).unwrap();
        assert_eq!(object.url(), Some("https://cdn/y.png"));
    }

    #[test]
    fn test_suggest_payload_missing_categories() {
        let payload: SuggestPayload =
            serde_json::from_str(r#"{"resources": {"results": {"products": []}}}"#).unwrap();
        assert!(payload.resources.results.articles.is_empty());
    }
}
