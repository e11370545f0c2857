//! Variant resolution command.

use scifi_theme_storefront::{Action, Command, ThemeApp};

use super::{CommandError, dispatch};

/// Select `options` in order on `handle` and log the resulting variant.
pub async fn resolve(app: &ThemeApp, handle: &str, options: &[String]) -> Result<(), CommandError> {
    app.open_product(handle, None).await?;

    for (index, value) in options.iter().enumerate() {
        let command = Command::new(Action::VariantSelect)
            .with("option", index.to_string())
            .with("value", value.as_str());
        dispatch(app, command).await?;
    }

    let Some(view) = app.variant_view() else {
        return Ok(());
    };
    match view.variant_id {
        Some(id) => tracing::info!("Variant {id}"),
        None => tracing::info!("No variant matches that selection"),
    }
    tracing::info!("Price: {}", view.price);
    if let Some(compare) = view.compare_at_price {
        tracing::info!("Was: {compare}");
    }
    tracing::info!("Availability: {}", view.availability);
    tracing::info!("SKU: {}", view.sku);
    tracing::info!("Button: {}", view.button.label());
    tracing::info!("Max quantity: {}", app.quantity_max());
    Ok(())
}
