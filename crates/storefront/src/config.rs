//! Theme runtime configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOP_URL` - Base URL of the shop (e.g., <https://scifi-store.myshopify.com>)
//!
//! ## Optional
//! - `THEME_STORAGE_DIR` - Directory backing client storage (default: .scifi-theme)
//! - `FREE_SHIPPING_THRESHOLD_CENTS` - Free-shipping threshold (default: 50000)
//! - `NOTIFICATION_DURATION_MS` - How long notifications stay visible (default: 3000)
//! - `SEARCH_DEBOUNCE_MS` - Debounce window for search-as-you-type (default: 300)
//! - `SEARCH_RESOURCE_TYPES` - Comma-separated suggestion resource types (default: all)
//! - `PRODUCT_CACHE_TTL_SECS` - In-memory product snapshot TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use scifi_theme_core::Money;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Theme runtime configuration.
#[derive(Debug, Clone)]
pub struct ThemeConfig {
    /// Shop base URL; every Ajax endpoint is resolved against it
    pub shop_url: Url,
    /// Directory backing client storage
    pub storage_dir: PathBuf,
    /// Cart subtotal at which shipping becomes free
    pub free_shipping_threshold: Money,
    /// Display duration for notifications
    pub notification_duration: Duration,
    /// Search settings
    pub search: SearchConfig,
    /// TTL of cached product snapshots
    pub product_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Search suggestion settings.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Debounce window for search-as-you-type
    pub debounce: Duration,
    /// `resources[type]` filter; empty means every type
    pub resource_types: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            resource_types: String::new(),
        }
    }
}

impl ThemeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let shop_url = parse_env::<Url>("SHOP_URL", &get_required_env("SHOP_URL")?)?;
        let storage_dir = PathBuf::from(get_env_or_default("THEME_STORAGE_DIR", ".scifi-theme"));
        let threshold = parse_env::<i64>(
            "FREE_SHIPPING_THRESHOLD_CENTS",
            &get_env_or_default("FREE_SHIPPING_THRESHOLD_CENTS", "50000"),
        )?;
        let notification_ms = parse_env::<u64>(
            "NOTIFICATION_DURATION_MS",
            &get_env_or_default("NOTIFICATION_DURATION_MS", "3000"),
        )?;
        let debounce_ms = parse_env::<u64>(
            "SEARCH_DEBOUNCE_MS",
            &get_env_or_default("SEARCH_DEBOUNCE_MS", "300"),
        )?;
        let product_ttl_secs = parse_env::<u64>(
            "PRODUCT_CACHE_TTL_SECS",
            &get_env_or_default("PRODUCT_CACHE_TTL_SECS", "300"),
        )?;

        Ok(Self {
            shop_url,
            storage_dir,
            free_shipping_threshold: Money::from_cents(threshold),
            notification_duration: Duration::from_millis(notification_ms),
            search: SearchConfig {
                debounce: Duration::from_millis(debounce_ms),
                resource_types: get_env_or_default("SEARCH_RESOURCE_TYPES", ""),
            },
            product_cache_ttl: Duration::from_secs(product_ttl_secs),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for a shop URL with every other setting at its default.
    #[must_use]
    pub fn for_shop(shop_url: Url) -> Self {
        Self {
            shop_url,
            storage_dir: PathBuf::from(".scifi-theme"),
            free_shipping_threshold: Money::from_cents(50_000),
            notification_duration: Duration::from_millis(3000),
            search: SearchConfig::default(),
            product_cache_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a raw environment value, naming the variable on failure.
fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_valid_number() {
        let value: u64 = parse_env("SEARCH_DEBOUNCE_MS", " 250 ").unwrap();
        assert_eq!(value, 250);
    }

    #[test]
    fn test_parse_env_invalid_number() {
        let err = parse_env::<u64>("SEARCH_DEBOUNCE_MS", "soon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "SEARCH_DEBOUNCE_MS"));
    }

    #[test]
    fn test_parse_env_url() {
        let url: Url = parse_env("SHOP_URL", "https://scifi.example.com").unwrap();
        assert_eq!(url.host_str(), Some("scifi.example.com"));
        assert!(parse_env::<Url>("SHOP_URL", "not a url").is_err());
    }

    #[test]
    fn test_for_shop_defaults() {
        let config = ThemeConfig::for_shop(Url::parse("https://scifi.example.com").unwrap());
        assert_eq!(config.free_shipping_threshold, Money::from_cents(50_000));
        assert_eq!(config.search.debounce, Duration::from_millis(300));
        assert!(config.search.resource_types.is_empty());
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::MissingEnvVar("SHOP_URL".to_string());
        assert_eq!(err.to_string(), "Missing environment variable: SHOP_URL");
    }
}
