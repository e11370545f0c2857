//! Ajax wire type to domain type conversions.

use std::sync::LazyLock;

use regex::Regex;
use scifi_theme_core::{
    CartLine, CartState, InventoryManagement, InventoryPolicy, LineKey, Money, Product, ProductId,
    ProductOption, Suggestion, SuggestionKind, Variant, VariantId,
};
use tracing::warn;

use crate::shopify::SuggestResults;
use crate::shopify::types::{
    AjaxCart, AjaxCartLine, AjaxImage, AjaxProduct, AjaxVariant, SuggestArticle,
    SuggestCollection, SuggestPage, SuggestPayload, SuggestProduct, WirePrice,
};

/// Page summaries are cut to this many characters.
const PAGE_SUMMARY_CHARS: usize = 100;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static pattern is valid"));

// =============================================================================
// Cart
// =============================================================================

/// Convert an Ajax cart. Totals are recomputed from the lines.
pub fn convert_cart(cart: AjaxCart) -> CartState {
    let state = CartState::from_lines(cart.items.into_iter().map(convert_cart_line).collect());

    if let Some(reported) = cart.item_count
        && reported != state.item_count()
    {
        warn!(
            reported,
            computed = state.item_count(),
            "Shop item_count disagrees with line quantities"
        );
    }

    state
}

pub fn convert_cart_line(line: AjaxCartLine) -> CartLine {
    let final_price = line.final_price.unwrap_or(line.price);
    let original_price = line.original_price.unwrap_or(line.price);

    CartLine {
        key: LineKey::new(line.key),
        variant_id: VariantId::new(line.variant_id),
        product_id: ProductId::new(line.product_id),
        quantity: line.quantity,
        final_price: Money::from_cents(final_price),
        original_price: Money::from_cents(original_price),
        product_title: line.product_title.or(line.title).unwrap_or_default(),
        variant_title: line.variant_title.filter(|t| !t.is_empty()),
        image: line.image,
        url: line.url,
        inventory_quantity: line.inventory_quantity,
        properties: line
            .properties
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, value)| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some((name, s)),
                other => Some((name, other.to_string())),
            })
            .collect(),
    }
}

// =============================================================================
// Product
// =============================================================================

pub fn convert_product(product: AjaxProduct) -> Product {
    Product {
        id: ProductId::new(product.id),
        handle: product.handle,
        title: product.title,
        vendor: product.vendor.filter(|v| !v.is_empty()),
        product_type: product.product_type.filter(|t| !t.is_empty()),
        price: Money::from_cents(product.price),
        compare_at_price: product.compare_at_price.map(Money::from_cents),
        available: product.available,
        featured_image: product.featured_image,
        options: product
            .options
            .into_iter()
            .map(|o| ProductOption {
                name: o.name,
                values: o.values,
            })
            .collect(),
        variants: product.variants.into_iter().map(convert_variant).collect(),
    }
}

fn convert_variant(variant: AjaxVariant) -> Variant {
    let inventory_management = match variant.inventory_management.as_deref() {
        Some(service) if !service.is_empty() => InventoryManagement::Tracked,
        _ => InventoryManagement::None,
    };
    let inventory_policy = match variant.inventory_policy.as_deref() {
        Some("continue") => InventoryPolicy::Continue,
        _ => InventoryPolicy::Deny,
    };

    Variant {
        id: VariantId::new(variant.id),
        title: variant.title,
        options: variant.options,
        price: Money::from_cents(variant.price),
        compare_at_price: variant.compare_at_price.map(Money::from_cents),
        available: variant.available,
        inventory_management,
        inventory_policy,
        inventory_quantity: variant.inventory_quantity.unwrap_or(0),
        sku: variant.sku.filter(|s| !s.is_empty()),
        featured_image: image_url(variant.featured_image.as_ref()),
    }
}

// =============================================================================
// Search Suggest
// =============================================================================

pub fn convert_suggest(payload: SuggestPayload) -> SuggestResults {
    let results = payload.resources.results;
    SuggestResults {
        products: results.products.into_iter().map(convert_suggest_product).collect(),
        articles: results.articles.into_iter().map(convert_suggest_article).collect(),
        pages: results.pages.into_iter().map(convert_suggest_page).collect(),
        collections: results
            .collections
            .into_iter()
            .map(convert_suggest_collection)
            .collect(),
    }
}

fn convert_suggest_product(product: SuggestProduct) -> Suggestion {
    Suggestion {
        image: image_url(product.featured_image.as_ref()),
        price: product.price.and_then(convert_price),
        category: product.product_type.filter(|t| !t.is_empty()),
        ..Suggestion::new(SuggestionKind::Product, product.title, product.url)
    }
}

fn convert_suggest_article(article: SuggestArticle) -> Suggestion {
    Suggestion {
        image: image_url(article.image.as_ref()),
        summary: article.summary.map(|s| strip_tags(&s)).filter(|s| !s.is_empty()),
        ..Suggestion::new(SuggestionKind::Article, article.title, article.url)
    }
}

fn convert_suggest_page(page: SuggestPage) -> Suggestion {
    Suggestion {
        summary: page
            .body_html
            .map(|body| truncate_chars(&strip_tags(&body), PAGE_SUMMARY_CHARS))
            .filter(|s| !s.is_empty()),
        ..Suggestion::new(SuggestionKind::Page, page.title, page.url)
    }
}

fn convert_suggest_collection(collection: SuggestCollection) -> Suggestion {
    Suggestion {
        image: image_url(collection.featured_image.as_ref()),
        product_count: collection.products_count,
        ..Suggestion::new(SuggestionKind::Collection, collection.title, collection.url)
    }
}

/// Suggest prices arrive either as a decimal string (`"19.99"`) or as cents.
fn convert_price(price: WirePrice) -> Option<Money> {
    match price {
        WirePrice::Cents(cents) => Some(Money::from_cents(cents)),
        WirePrice::Decimal(raw) => match Money::parse_decimal(&raw) {
            Ok(money) => Some(money),
            Err(e) => {
                warn!(price = %raw, error = %e, "Unparseable suggestion price");
                None
            }
        },
    }
}

fn image_url(image: Option<&AjaxImage>) -> Option<String> {
    image.and_then(AjaxImage::url).map(ToString::to_string)
}

/// Remove HTML tags and trim surrounding whitespace.
fn strip_tags(html: &str) -> String {
    HTML_TAG.replace_all(html, "").trim().to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
