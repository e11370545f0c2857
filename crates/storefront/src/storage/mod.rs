//! Client-side key/value storage.
//!
//! The theme persists a handful of JSON documents between sessions:
//!
//! | Key | Contents |
//! |---|---|
//! | `wishlist` | Wishlist entries |
//! | `searchHistory` | Recent searches, newest first |
//! | `searchSuggestionsCache` | Query → suggestions with capture time |
//! | `preferredPaymentGateway` | Last chosen payment method |
//! | `preferredShippingMethod` | Last chosen shipping method |
//! | `shippingPreferences` | Delivery preferences |
//! | `cart` | Shop cart token (raw cookie value) |
//!
//! ## Implementations
//!
//! - [`FileStorage`]: one `<key>.json` file per key under a directory.
//! - [`MemoryStorage`]: for tests and throwaway sessions.
//!
//! Reads go through [`load_json`], which treats absent and corrupt values the
//! same way: the caller gets `T::default()`. Corrupt values are logged.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Storage keys used by the theme.
pub mod keys {
    pub const WISHLIST: &str = "wishlist";
    pub const SEARCH_HISTORY: &str = "searchHistory";
    pub const SEARCH_SUGGESTIONS_CACHE: &str = "searchSuggestionsCache";
    pub const PREFERRED_PAYMENT_GATEWAY: &str = "preferredPaymentGateway";
    pub const PREFERRED_SHIPPING_METHOD: &str = "preferredShippingMethod";
    pub const SHIPPING_PREFERENCES: &str = "shippingPreferences";
    pub const CART_TOKEN: &str = "cart";
}

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// String key/value store with the semantics of browser `localStorage`.
pub trait ClientStorage: Send + Sync {
    /// Raw value for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode `key`, falling back to `T::default()`.
///
/// Never fails: unreadable storage and undecodable JSON both yield the default.
pub fn load_json<T>(storage: &dyn ClientStorage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!(key, error = %e, "Storage read failed, using default");
            return T::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(key, error = %e, "Corrupt stored value, using default");
        T::default()
    })
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns an error if encoding or the backend write fails.
pub fn save_json<T: Serialize + ?Sized>(
    storage: &dyn ClientStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw)
}
