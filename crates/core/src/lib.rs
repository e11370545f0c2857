//! Sci-Fi Theme Core - Shared domain types.
//!
//! This crate provides the types shared by every part of the theme runtime:
//! - `storefront` - Stores, Ajax API client, rendering and command dispatch
//! - `cli` - Command-line front end driving the stores against a live shop
//!
//! # Architecture
//!
//! The core crate contains only types and pure derivations - no I/O, no
//! storage access, no HTTP clients. Cart totals, variant matching, availability
//! labels and quantity caps are computed here so every consumer agrees on them.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, cart, product/variant, wishlist and search types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
