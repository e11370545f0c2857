//! Stores and services behind the theme's interactive regions.
//!
//! # Services
//!
//! - `cart` - Mirror of the shop's cart with single-flight mutations
//! - `variant` - Option selection to variant resolution
//! - `quantity` - Bounded quantity input and inventory notices
//! - `wishlist` - Persisted product snapshots
//! - `search` - Cached, debounced search suggestions with history fallback
//! - `checkout` - Payment/shipping preferences and the order total

pub mod cart;
pub mod checkout;
pub mod quantity;
pub mod search;
pub mod single_flight;
pub mod variant;
pub mod wishlist;

pub use cart::CartStore;
pub use checkout::{CheckoutPreferences, OrderTotal, ShippingPreferences};
pub use quantity::{InventoryNotice, QuantitySelector};
pub use search::{SearchSuggest, SuggestOutcome, SuggestionCursor};
pub use single_flight::{BusyFlag, Mutation};
pub use variant::{ButtonState, VariantResolver, VariantView};
pub use wishlist::{AddAllSummary, WishlistStore};
