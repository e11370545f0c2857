//! Cart cookie persistence.
//!
//! Shopify identifies the visitor's cart by the `cart` cookie. The cookie jar
//! handed to `reqwest` is seeded from client storage on startup and written
//! back after each response, so the cart survives a restart.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, warn};
use url::Url;

use crate::storage::{ClientStorage, keys};

const CART_COOKIE: &str = "cart";

/// Cookie jar bound to the shop, mirroring the cart token into storage.
pub(super) struct CartSession {
    jar: Arc<Jar>,
    shop_url: Url,
    storage: Arc<dyn ClientStorage>,
    saved: Mutex<Option<String>>,
}

impl CartSession {
    /// Build a jar holding the stored cart token, if there is one.
    pub(super) fn restore(shop_url: Url, storage: Arc<dyn ClientStorage>) -> Self {
        let jar = Arc::new(Jar::default());
        let saved = match storage.get(keys::CART_TOKEN) {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read stored cart token");
                None
            }
        };
        if let Some(token) = &saved {
            jar.add_cookie_str(&format!("{CART_COOKIE}={token}; Path=/"), &shop_url);
            debug!("Restored cart token");
        }

        Self {
            jar,
            shop_url,
            storage,
            saved: Mutex::new(saved),
        }
    }

    pub(super) fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Current cart token held by the jar.
    pub(super) fn token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.shop_url)?;
        cart_token(header.to_str().ok()?).map(str::to_string)
    }

    /// Write the jar's cart token to storage when it changed.
    pub(super) fn persist(&self) {
        let Some(token) = self.token() else {
            return;
        };
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        if saved.as_deref() == Some(token.as_str()) {
            return;
        }
        match self.storage.set(keys::CART_TOKEN, &token) {
            Ok(()) => *saved = Some(token),
            Err(e) => warn!(error = %e, "Could not store cart token"),
        }
    }
}

/// The `cart` value from a `Cookie` header.
fn cart_token(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CART_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
