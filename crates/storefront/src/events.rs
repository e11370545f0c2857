//! # Theme Event Bus
//!
//! Typed publish/subscribe channel between the stores.
//!
//! | Event | Producer | Consumers |
//! |---|---|---|
//! | `VariantChanged` | variant resolver | quantity selector, price/availability views |
//! | `QuantityChanged` | quantity selector | total-price listeners |
//! | `CartUpdated` | cart store | count badges, order total |
//! | `WishlistUpdated` | wishlist store | trigger badges |
//! | `ShippingMethodSelected` | checkout preferences | order total |
//! | `PaymentMethodSelected` | checkout preferences | order total |
//!
//! Publishing is fire-and-forget: with no subscribers the event is simply
//! dropped. A subscriber that falls more than the channel capacity behind
//! skips the events it missed.

use scifi_theme_core::{Money, ProductId, Variant};
use tokio::sync::broadcast;
use tracing::debug;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Events exchanged between stores.
#[derive(Debug, Clone, PartialEq)]
pub enum ThemeEvent {
    /// A complete option selection resolved to a variant.
    VariantChanged { product_id: ProductId, variant: Variant },
    /// The quantity selector's value changed.
    QuantityChanged { value: u32 },
    /// The cart was reloaded from the shop.
    CartUpdated { item_count: u32, total_price: Money },
    /// The wishlist changed.
    WishlistUpdated { count: usize },
    /// A shipping method was chosen.
    ShippingMethodSelected {
        id: String,
        price: Money,
        delivery_days: Option<u32>,
    },
    /// A payment method was chosen.
    PaymentMethodSelected { id: String },
}

/// Discriminant of a [`ThemeEvent`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    VariantChanged,
    QuantityChanged,
    CartUpdated,
    WishlistUpdated,
    ShippingMethodSelected,
    PaymentMethodSelected,
}

impl ThemeEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::VariantChanged { .. } => EventKind::VariantChanged,
            Self::QuantityChanged { .. } => EventKind::QuantityChanged,
            Self::CartUpdated { .. } => EventKind::CartUpdated,
            Self::WishlistUpdated { .. } => EventKind::WishlistUpdated,
            Self::ShippingMethodSelected { .. } => EventKind::ShippingMethodSelected,
            Self::PaymentMethodSelected { .. } => EventKind::PaymentMethodSelected,
        }
    }
}

/// Multi-producer, multi-consumer event bus over `tokio::sync::broadcast`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ThemeEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event; returns how many subscribers received it.
    pub fn publish(&self, event: ThemeEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(?kind, receivers, "Event published");
                receivers
            }
            Err(_) => {
                debug!(?kind, "Event dropped (no subscribers)");
                0
            }
        }
    }

    /// Subscribe to every event.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            kinds: None,
        }
    }

    /// Subscribe to the listed kinds only.
    #[must_use]
    pub fn subscribe_to(&self, kinds: &[EventKind]) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            kinds: Some(kinds.to_vec()),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of an [`EventBus`].
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ThemeEvent>,
    kinds: Option<Vec<EventKind>>,
}

impl Subscription {
    fn matches(&self, event: &ThemeEvent) -> bool {
        self.kinds
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&event.kind()))
    }

    /// Wait for the next matching event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<ThemeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some events dropped");
                }
            }
        }
    }

    /// Next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ThemeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// Every matching event already queued, oldest first.
    pub fn drain(&mut self) -> Vec<ThemeEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
