//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! scifi-cli cart show
//! scifi-cli cart add 39897499729985 --quantity 2
//! scifi-cli cart update 39897499729985:5d3c1b 3
//! scifi-cli cart remove 39897499729985:5d3c1b
//! scifi-cli cart clear
//! scifi-cli cart discount NEBULA10
//! ```

use scifi_theme_storefront::{Action, Command, ThemeApp};

use super::{CommandError, dispatch};

/// Log the cart contents.
pub fn show(app: &ThemeApp) {
    let cart = app.cart().state();
    if cart.is_empty() {
        tracing::info!("Cart is empty");
        return;
    }

    for line in cart.items() {
        tracing::info!(
            "{} x {}{} @ ${} [{}]",
            line.quantity,
            line.product_title,
            line.variant_title
                .as_deref()
                .map(|title| format!(" ({title})"))
                .unwrap_or_default(),
            line.final_price,
            line.key,
        );
    }

    let shipping = cart.free_shipping(app.config().free_shipping_threshold);
    tracing::info!("Items: {}", cart.item_count());
    tracing::info!("Subtotal: ${}", cart.total_price());
    if shipping.is_free() {
        tracing::info!("Free shipping unlocked");
    } else {
        tracing::info!(
            "Add ${} more for free shipping ({:.0}%)",
            shipping.remaining,
            shipping.percent
        );
    }
}

pub async fn add(app: &ThemeApp, variant: i64, quantity: u32) -> Result<(), CommandError> {
    let command = Command::new(Action::CartAdd)
        .with("variant", variant.to_string())
        .with("quantity", quantity.to_string());
    dispatch(app, command).await?;
    show(app);
    Ok(())
}

pub async fn update(app: &ThemeApp, key: &str, quantity: i64) -> Result<(), CommandError> {
    let command = Command::new(Action::QuantitySet)
        .with("key", key)
        .with("quantity", quantity.to_string());
    dispatch(app, command).await?;
    show(app);
    Ok(())
}

pub async fn remove(app: &ThemeApp, key: &str) -> Result<(), CommandError> {
    dispatch(app, Command::new(Action::CartRemove).with("key", key)).await?;
    show(app);
    Ok(())
}

pub async fn clear(app: &ThemeApp) -> Result<(), CommandError> {
    dispatch(app, Command::new(Action::CartClear)).await?;
    tracing::info!("Cart cleared");
    Ok(())
}

pub async fn discount(app: &ThemeApp, code: &str) -> Result<(), CommandError> {
    dispatch(app, Command::new(Action::CartDiscount).with("code", code)).await?;
    show(app);
    Ok(())
}
