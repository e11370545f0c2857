//! Unified error handling with Sentry integration.
//!
//! Every store operation returns `Result<T, AppError>`. Nothing is fatal: at
//! the dispatch boundary an error becomes a notification built from
//! [`AppError::user_message`], and server-class errors are captured to Sentry
//! by [`AppError::report`].

use thiserror::Error;

use crate::config::ConfigError;
use crate::render::RenderError;
use crate::shopify::AjaxError;
use crate::storage::StorageError;

/// Application-level error type for the theme runtime.
#[derive(Debug, Error)]
pub enum AppError {
    /// Shopify Ajax call failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AjaxError),

    /// A store operation's Ajax call failed. `fallback` is shown when the shop
    /// gave no message of its own.
    #[error("{fallback}: {source}")]
    Action {
        fallback: &'static str,
        source: AjaxError,
    },

    /// Client storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A fragment failed to render.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed command or input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap an Ajax failure with the message to show if the shop sent none.
    #[must_use]
    pub const fn action(fallback: &'static str, source: AjaxError) -> Self {
        Self::Action { fallback, source }
    }

    /// Whether this error points at a defect or outage rather than user input.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Shopify(err) | Self::Action { source: err, .. } => !matches!(
                err,
                AjaxError::Api { status: 400..=499, .. } | AjaxError::NotFound(_)
            ),
            Self::Storage(_) | Self::Render(_) | Self::Config(_) | Self::Internal(_) => true,
            Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Short message safe to show the shopper.
    ///
    /// Shop-provided messages (e.g. "All 3 Plasma Jacket are in your cart.")
    /// pass through; internal details never do.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Shopify(err) => match err {
                AjaxError::RateLimited(_) => {
                    "Too many requests, please wait a moment and try again".to_string()
                }
                AjaxError::NotFound(_) => "That item is no longer available".to_string(),
                other => other.shop_message().map_or_else(
                    || "Could not reach the store, please try again".to_string(),
                    ToString::to_string,
                ),
            },
            Self::Action { fallback, source } => source
                .shop_message()
                .map_or_else(|| (*fallback).to_string(), ToString::to_string),
            Self::Storage(_) => "Could not save your changes".to_string(),
            Self::Render(_) | Self::Config(_) | Self::Internal(_) => {
                "Something went wrong".to_string()
            }
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(what) => what.clone(),
        }
    }

    /// Log the error and capture server-class errors to Sentry.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::warn!(error = %self, "Operation rejected");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("variant_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
