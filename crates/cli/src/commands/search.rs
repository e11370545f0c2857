//! Search suggestion command.

use scifi_theme_storefront::ThemeApp;
use scifi_theme_storefront::services::SuggestOutcome;

/// Log the suggestions for `term`.
pub async fn suggest(app: &ThemeApp, term: &str) {
    let outcome = app.search().query(term).await;

    let suggestions = match &outcome {
        SuggestOutcome::TooShort => {
            tracing::info!("Type at least two characters");
            return;
        }
        SuggestOutcome::Busy | SuggestOutcome::Superseded => return,
        SuggestOutcome::History(list) => {
            tracing::warn!("Shop unreachable, showing recent searches");
            list
        }
        SuggestOutcome::Cached(list) | SuggestOutcome::Fetched(list) => list,
    };

    if suggestions.is_empty() {
        tracing::info!("No suggestions for \"{term}\"");
    }
    for suggestion in suggestions {
        match suggestion.price {
            Some(price) => tracing::info!(
                "[{}] {} ${} {}",
                suggestion.kind.label(),
                suggestion.title,
                price,
                suggestion.url
            ),
            None => tracing::info!(
                "[{}] {} {}",
                suggestion.kind.label(),
                suggestion.title,
                suggestion.url
            ),
        }
    }
}
