//! Core types for the Sci-Fi theme.
//!
//! This module provides type-safe wrappers for the storefront domain.

pub mod cart;
pub mod id;
pub mod money;
pub mod product;
pub mod search;
pub mod wishlist;

pub use cart::{CartLine, CartState, FreeShippingProgress};
pub use id::*;
pub use money::{CurrencyCode, Money, ParseMoneyError};
pub use product::{
    Availability, InventoryManagement, InventoryPolicy, Product, ProductOption, Variant,
    DEFAULT_QUANTITY_CAP, LOW_STOCK_THRESHOLD,
};
pub use search::{SearchHistoryEntry, Suggestion, SuggestionCacheEntry, SuggestionKind};
pub use wishlist::{ProductRef, WishlistEntry};
