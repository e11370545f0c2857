//! Wishlist commands.
//!
//! The wishlist lives under `THEME_STORAGE_DIR`, so it survives between runs.

use scifi_theme_core::ProductRef;
use scifi_theme_storefront::{Action, Command, DispatchOutcome, ThemeApp};

use super::{CommandError, dispatch};

/// Log the wishlisted products.
pub fn list(app: &ThemeApp) {
    let entries = app.wishlist().entries();
    if entries.is_empty() {
        tracing::info!("Wishlist is empty");
        return;
    }

    for entry in entries {
        let status = if entry.is_purchasable() { "" } else { " (sold out)" };
        tracing::info!(
            "{} - {} ${}{} [id {}]",
            entry.handle,
            entry.title,
            entry.price,
            status,
            entry.id
        );
    }
}

pub async fn add(app: &ThemeApp, handle: &str) -> Result<(), CommandError> {
    let product = app.product(handle).await?;
    if app.wishlist().contains(product.id) {
        tracing::info!("{} is already in the wishlist", product.title);
        return Ok(());
    }

    let reference = ProductRef::new(product.id, handle);
    let command = Command::new(Action::WishlistToggle)
        .with("product-id", reference.id.to_string())
        .with("handle", reference.handle);
    dispatch(app, command).await?;
    list(app);
    Ok(())
}

pub async fn remove(app: &ThemeApp, id: i64) -> Result<(), CommandError> {
    let command = Command::new(Action::WishlistRemove).with("product-id", id.to_string());
    dispatch(app, command).await?;
    list(app);
    Ok(())
}

pub async fn add_all(app: &ThemeApp) -> Result<(), CommandError> {
    dispatch(app, Command::new(Action::WishlistAddAll)).await?;
    for notice in app.notifications().active() {
        tracing::info!("{}", notice.message);
    }
    Ok(())
}

pub async fn share(app: &ThemeApp) -> Result<(), CommandError> {
    match dispatch(app, Command::new(Action::WishlistShare)).await? {
        DispatchOutcome::Share { url, text } => {
            tracing::info!("{text}");
            tracing::info!("{url}");
        }
        _ => tracing::info!("Wishlist is empty, nothing to share"),
    }
    Ok(())
}
