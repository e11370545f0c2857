//! Sci-Fi theme storefront runtime.
//!
//! The interactive layer of the theme as a library: a client for the shop's
//! Ajax endpoints, client-side storage, the cart/variant/wishlist/search
//! stores, HTML fragment rendering and a command dispatch table tying them
//! together.
//!
//! # Architecture
//!
//! - [`ThemeApp`] owns every store and is the only thing a front end needs
//! - Stores talk to the shop through [`shopify::StorefrontApi`], so tests run
//!   against [`shopify::InMemoryShop`]
//! - Stores talk to each other through the typed [`events::EventBus`]
//! - Every failure ends as an [`error::AppError`], turned into a notice at the
//!   dispatch boundary

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod notifications;
pub mod render;
pub mod services;
pub mod shopify;
pub mod storage;
pub mod timing;

pub use app::ThemeApp;
pub use config::ThemeConfig;
pub use dispatch::{Action, Command, DispatchOutcome, Payload};
pub use error::{AppError, Result};
