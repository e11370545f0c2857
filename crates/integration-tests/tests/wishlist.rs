//! Wishlist behavior and its hand-off to the cart.

#![allow(clippy::unwrap_used)]

use scifi_theme_core::{ProductId, ProductRef, VariantId};
use scifi_theme_integration_tests::{TestShop, simple_product};
use scifi_theme_storefront::services::AddAllSummary;
use scifi_theme_storefront::storage::{ClientStorage, keys};
use scifi_theme_storefront::{Action, Command, DispatchOutcome};

fn catalog() -> Vec<scifi_theme_core::Product> {
    vec![
        simple_product(1, "ion-blaster", 11, 4500),
        simple_product(2, "warp-core", 22, 12_000),
        simple_product(3, "star-map", 33, 1500),
    ]
}

fn toggle(id: i64, handle: &str) -> Command {
    Command::new(Action::WishlistToggle)
        .with("product-id", id.to_string())
        .with("handle", handle)
}

#[tokio::test]
async fn test_add_is_idempotent() {
    let test = TestShop::new(catalog());
    let p1 = ProductRef::new(ProductId::new(1), "ion-blaster");

    assert!(test.app.wishlist().add(&p1).await.unwrap());
    assert!(!test.app.wishlist().add(&p1).await.unwrap());

    assert_eq!(test.app.wishlist().len(), 1);
    assert!(test.notices().contains(&"Already in your wishlist".to_string()));

    let stored: Vec<serde_json::Value> =
        serde_json::from_str(&test.storage.get(keys::WISHLIST).unwrap().unwrap()).unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_wishlist_survives_reload() {
    let test = TestShop::new(catalog());
    test.app.dispatch(toggle(1, "ion-blaster")).await;
    test.app.dispatch(toggle(3, "star-map")).await;

    let reloaded = test.reload();

    assert_eq!(reloaded.wishlist().len(), 2);
    assert!(reloaded.wishlist().contains(ProductId::new(3)));
    assert!(reloaded.wishlist().panel_html().contains("Star Map"));
}

#[tokio::test]
async fn test_toggle_twice_removes() {
    let test = TestShop::new(catalog());

    test.app.dispatch(toggle(2, "warp-core")).await;
    test.app.dispatch(toggle(2, "warp-core")).await;

    assert!(test.app.wishlist().is_empty());
}

#[tokio::test]
async fn test_add_all_continues_past_failure() {
    let test = TestShop::new(catalog());
    test.app.init().await;
    for product in catalog() {
        let reference = ProductRef::new(product.id, product.handle);
        test.app.wishlist().add(&reference).await.unwrap();
    }
    test.shop.fail_variant(VariantId::new(22));

    let summary = test
        .app
        .wishlist()
        .add_all_to_cart(test.app.cart())
        .await
        .unwrap();

    assert_eq!(
        summary,
        AddAllSummary {
            added: 2,
            attempted: 3
        }
    );
    let cart = test.app.cart().state();
    let mut variants: Vec<_> = cart.items().iter().map(|line| line.variant_id).collect();
    variants.sort();
    assert_eq!(variants, vec![VariantId::new(11), VariantId::new(33)]);
    assert!(test.app.cart().is_open());
    assert!(test.notices().contains(&"2 of 3 added to cart".to_string()));
}

#[tokio::test]
async fn test_add_all_with_every_add_failing() {
    let test = TestShop::new(catalog());
    test.app.dispatch(toggle(1, "ion-blaster")).await;
    test.shop.fail_variant(VariantId::new(11));

    let outcome = test.app.dispatch(Command::new(Action::WishlistAddAll)).await;

    assert_eq!(outcome, DispatchOutcome::Applied);
    assert!(test.app.cart().state().is_empty());
    assert!(
        test.notices()
            .contains(&"Could not add wishlist items to the cart".to_string())
    );
}

#[tokio::test]
async fn test_share_link_lists_products() {
    let test = TestShop::new(catalog());
    test.app.dispatch(toggle(1, "ion-blaster")).await;
    test.app.dispatch(toggle(3, "star-map")).await;

    let outcome = test.app.dispatch(Command::new(Action::WishlistShare)).await;

    let DispatchOutcome::Share { url, text } = &outcome else {
        panic!("expected a share outcome, got {outcome:?}");
    };
    assert_eq!(url.path(), "/wishlist");
    let products: Vec<_> = url
        .query_pairs()
        .filter(|(name, _)| name == "products")
        .map(|(_, value)| value.into_owned())
        .collect();
    let [listed] = products.as_slice() else {
        panic!("expected one products parameter, got {products:?}");
    };
    assert!(listed.contains('1') && listed.contains('3'));
    assert!(text.contains("2 products"));
    assert!(text.contains("$60.00"));
}
