//! Command dispatch table.
//!
//! Interactive elements carry a `data-action` identifier plus `data-*`
//! attributes. A [`Command`] is that pair: the parsed [`Action`] and the
//! attributes as a [`Payload`]. [`crate::ThemeApp::dispatch`] routes each
//! action to one store operation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::error::AppError;

/// Every action a theme element can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CartToggle,
    CartOpen,
    CartClose,
    CartAdd,
    QuantityPlus,
    QuantityMinus,
    QuantitySet,
    CartRemove,
    CartClear,
    CartDiscount,
    WishlistToggle,
    WishlistRemove,
    WishlistAddAll,
    WishlistClear,
    WishlistShare,
    SearchQuery,
    SearchSubmit,
    SuggestionNext,
    SuggestionPrevious,
    VariantSelect,
    ShippingSelect,
    PaymentSelect,
}

impl Action {
    pub const ALL: [Self; 22] = [
        Self::CartToggle,
        Self::CartOpen,
        Self::CartClose,
        Self::CartAdd,
        Self::QuantityPlus,
        Self::QuantityMinus,
        Self::QuantitySet,
        Self::CartRemove,
        Self::CartClear,
        Self::CartDiscount,
        Self::WishlistToggle,
        Self::WishlistRemove,
        Self::WishlistAddAll,
        Self::WishlistClear,
        Self::WishlistShare,
        Self::SearchQuery,
        Self::SearchSubmit,
        Self::SuggestionNext,
        Self::SuggestionPrevious,
        Self::VariantSelect,
        Self::ShippingSelect,
        Self::PaymentSelect,
    ];

    /// The `data-action` identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CartToggle => "cart-toggle",
            Self::CartOpen => "cart-open",
            Self::CartClose => "cart-close",
            Self::CartAdd => "cart-add",
            Self::QuantityPlus => "quantity-plus",
            Self::QuantityMinus => "quantity-minus",
            Self::QuantitySet => "quantity-set",
            Self::CartRemove => "cart-remove",
            Self::CartClear => "cart-clear",
            Self::CartDiscount => "cart-discount",
            Self::WishlistToggle => "wishlist-toggle",
            Self::WishlistRemove => "wishlist-remove",
            Self::WishlistAddAll => "wishlist-add-all",
            Self::WishlistClear => "wishlist-clear",
            Self::WishlistShare => "wishlist-share",
            Self::SearchQuery => "search-query",
            Self::SearchSubmit => "search-submit",
            Self::SuggestionNext => "suggestion-next",
            Self::SuggestionPrevious => "suggestion-previous",
            Self::VariantSelect => "variant-select",
            Self::ShippingSelect => "shipping-select",
            Self::PaymentSelect => "payment-select",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown action: {s}")))
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        id.parse().map_err(serde::de::Error::custom)
    }
}

/// The `data-*` attributes of the triggering element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, String>);

impl Payload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// # Errors
    ///
    /// Returns `BadRequest` if the attribute is missing.
    pub fn require(&self, name: &str) -> Result<&str, AppError> {
        self.get(name)
            .ok_or_else(|| AppError::BadRequest(format!("Missing {name}")))
    }

    /// Parse an optional attribute.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the attribute is present but malformed.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, AppError> {
        self.get(name)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("Invalid {name}: {raw}")))
            })
            .transpose()
    }

    /// Parse a required attribute.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the attribute is missing or malformed.
    pub fn parse_required<T: FromStr>(&self, name: &str) -> Result<T, AppError> {
        self.parse(name)?
            .ok_or_else(|| AppError::BadRequest(format!("Missing {name}")))
    }

    /// Line item properties, given as `property.<name>` attributes.
    #[must_use]
    pub fn properties(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix("property.")
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect()
    }
}

/// One triggered action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Command {
    pub action: Action,
    #[serde(default)]
    pub payload: Payload,
}

impl Command {
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            payload: Payload::new(),
        }
    }

    /// Builder-style payload attribute.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload = self.payload.with(name, value);
        self
    }

    /// Parse an action identifier and build a command.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an unknown identifier.
    pub fn parse(action: &str, payload: Payload) -> Result<Self, AppError> {
        Ok(Self {
            action: action.parse()?,
            payload,
        })
    }
}

/// What happened to a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    /// The target store was busy; the command was dropped.
    Dropped,
    /// The command failed; `message` was posted as an error notice.
    Failed { message: String },
    /// Follow this link.
    Navigate(Url),
    /// Share payload for the wishlist.
    Share { url: Url, text: String },
}

impl DispatchOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_roundtrips_its_identifier() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = "cart-explode".parse::<Action>().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.user_message(), "Unknown action: cart-explode");
    }

    #[test]
    fn test_payload_parsing() {
        let payload = Payload::new()
            .with("variant", "39897499729985")
            .with("quantity", " 3 ")
            .with("property.Engraving", "Ad Astra");

        assert_eq!(payload.parse_required::<i64>("variant").unwrap(), 39_897_499_729_985);
        assert_eq!(payload.parse::<u32>("quantity").unwrap(), Some(3));
        assert_eq!(payload.parse::<u32>("missing").unwrap(), None);
        assert!(payload.parse_required::<u32>("missing").is_err());
        assert!(Payload::new().with("quantity", "lots").parse::<u32>("quantity").is_err());
        assert_eq!(
            payload.properties().get("Engraving").map(String::as_str),
            Some("Ad Astra")
        );
    }

    #[test]
    fn test_command_deserializes_from_json() {
        let command: Command = serde_json::from_str(
            r#"{"action": "quantity-set", "payload": {"key": "a", "quantity": "4"}}"#,
        )
        .unwrap();
        assert_eq!(command.action, Action::QuantitySet);
        assert_eq!(command.payload.get("key"), Some("a"));

        assert!(serde_json::from_str::<Command>(r#"{"action": "nope"}"#).is_err());
    }
}
