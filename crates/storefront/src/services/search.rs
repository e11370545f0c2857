//! Search-as-you-type suggestions.
//!
//! Lookup order for a query of at least [`MIN_QUERY_LEN`] characters:
//!
//! 1. The persisted suggestion cache, keyed by the exact query. Entries older
//!    than [`CACHE_TTL`] are evicted on access and never served.
//! 2. The shop's suggest endpoint. Results are flattened (products, articles,
//!    pages, collections), truncated to [`MAX_SUGGESTIONS`] and cached.
//! 3. On a failed fetch, recent searches containing the query.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use askama::Template;
use chrono::Utc;
use scifi_theme_core::{SearchHistoryEntry, Suggestion, SuggestionCacheEntry, SuggestionKind};
use tracing::{debug, instrument, warn};

use crate::config::SearchConfig;
use crate::error::add_breadcrumb;
use crate::render::{RenderError, SuggestionListTemplate};
use crate::shopify::{StorefrontApi, SuggestQuery, SuggestResults};
use crate::storage::{ClientStorage, keys, load_json, save_json};
use crate::timing::Debouncer;

use super::single_flight::BusyFlag;

/// Shorter queries are ignored.
pub const MIN_QUERY_LEN: usize = 2;

/// Age after which a cached result is discarded.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Suggestions shown at most.
pub const MAX_SUGGESTIONS: usize = 8;

/// `resources[limit]` sent to the shop.
pub const REQUEST_LIMIT: u32 = 10;

/// History matches shown when the shop cannot be reached.
pub const HISTORY_FALLBACK_LIMIT: usize = 5;

/// Remembered search terms.
pub const HISTORY_CAPACITY: usize = 20;

type SuggestionCache = HashMap<String, SuggestionCacheEntry>;

/// Where a query's suggestions came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestOutcome {
    /// Query too short; the list was cleared.
    TooShort,
    Cached(Vec<Suggestion>),
    Fetched(Vec<Suggestion>),
    /// The fetch failed; matching recent searches are shown instead.
    History(Vec<Suggestion>),
    /// A fetch was already in flight; this query was dropped.
    Busy,
    /// A newer debounced query arrived during the wait.
    Superseded,
}

impl SuggestOutcome {
    /// Suggestions now on display, if this query changed them.
    #[must_use]
    pub fn suggestions(&self) -> Option<&[Suggestion]> {
        match self {
            Self::Cached(list) | Self::Fetched(list) | Self::History(list) => Some(list),
            Self::TooShort | Self::Busy | Self::Superseded => None,
        }
    }
}

/// Circular keyboard selection over a list of `len` items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuggestionCursor {
    len: usize,
    index: Option<usize>,
}

#[allow(clippy::should_implement_trait)]
impl SuggestionCursor {
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self { len, index: None }
    }

    /// Move down, wrapping from the last item to the first.
    pub fn next(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.index = Some(self.index.map_or(0, |i| (i + 1) % self.len));
        self.index
    }

    /// Move up, wrapping from the first item to the last.
    pub fn previous(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.index = Some(match self.index {
            Some(0) | None => self.len - 1,
            Some(i) => i - 1,
        });
        self.index
    }

    #[must_use]
    pub const fn selected(&self) -> Option<usize> {
        self.index
    }

    pub const fn reset(&mut self) {
        self.index = None;
    }
}

#[derive(Default)]
struct Display {
    query: String,
    suggestions: Vec<Suggestion>,
    cursor: SuggestionCursor,
    html: String,
}

/// Suggestion lookup for the search box.
pub struct SearchSuggest {
    api: Arc<dyn StorefrontApi>,
    storage: Arc<dyn ClientStorage>,
    resource_types: String,
    debouncer: Debouncer,
    busy: BusyFlag,
    display: Mutex<Display>,
    history_write: Mutex<()>,
}

impl SearchSuggest {
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        storage: Arc<dyn ClientStorage>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            api,
            storage,
            resource_types: config.resource_types.clone(),
            debouncer: Debouncer::new(config.debounce),
            busy: BusyFlag::new(),
            display: Mutex::new(Display::default()),
            history_write: Mutex::new(()),
        }
    }

    /// Look up suggestions for `term` now.
    pub async fn query(&self, term: &str) -> SuggestOutcome {
        self.query_at(term, Utc::now().timestamp_millis()).await
    }

    /// Look up suggestions once the debounce window passes without a newer
    /// call.
    pub async fn query_debounced(&self, term: &str) -> SuggestOutcome {
        if !self.debouncer.settle().await {
            debug!(term, "Debounced query superseded");
            return SuggestOutcome::Superseded;
        }
        self.query(term).await
    }

    /// Look up suggestions with the clock reading `now_ms` (epoch millis).
    #[instrument(skip(self, now_ms))]
    pub async fn query_at(&self, term: &str, now_ms: i64) -> SuggestOutcome {
        let term = term.trim();
        if term.chars().count() < MIN_QUERY_LEN {
            self.show(term, Vec::new());
            return SuggestOutcome::TooShort;
        }

        let Some(_guard) = self.busy.try_acquire() else {
            debug!("Suggest fetch in flight, query dropped");
            return SuggestOutcome::Busy;
        };

        if let Some(cached) = self.cached(term, now_ms) {
            debug!(count = cached.len(), "Suggestion cache hit");
            self.show(term, cached.clone());
            return SuggestOutcome::Cached(cached);
        }

        let request = SuggestQuery {
            q: term.to_string(),
            resource_types: self.resource_types.clone(),
            limit: REQUEST_LIMIT,
        };
        match self.api.search_suggest(&request).await {
            Ok(results) => {
                let suggestions = flatten(results);
                self.store_cached(term, &suggestions, now_ms);
                self.show(term, suggestions.clone());
                SuggestOutcome::Fetched(suggestions)
            }
            Err(e) => {
                warn!(error = %e, "Suggest fetch failed, falling back to history");
                let suggestions = self.history_matches(term);
                self.show(term, suggestions.clone());
                SuggestOutcome::History(suggestions)
            }
        }
    }

    /// Remember a submitted search, newest first.
    pub fn record_search(&self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }

        let _lock = self.history_write.lock().unwrap_or_else(PoisonError::into_inner);
        let mut history = self.history();
        history.retain(|entry| entry.term != term);
        history.insert(
            0,
            SearchHistoryEntry {
                term: term.to_string(),
                timestamp: Utc::now().timestamp_millis(),
            },
        );
        history.truncate(HISTORY_CAPACITY);

        add_breadcrumb("search", "Search submitted", Some(&[("term", term)]));
        if let Err(e) = save_json(self.storage.as_ref(), keys::SEARCH_HISTORY, &history) {
            warn!(error = %e, "Failed to save search history");
        }
    }

    /// Recent searches, newest first.
    #[must_use]
    pub fn history(&self) -> Vec<SearchHistoryEntry> {
        load_json(self.storage.as_ref(), keys::SEARCH_HISTORY)
    }

    /// Suggestions on display.
    #[must_use]
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.display().suggestions.clone()
    }

    /// Rendered suggestion list.
    #[must_use]
    pub fn suggestions_html(&self) -> String {
        self.display().html.clone()
    }

    /// Move the keyboard selection down.
    pub fn select_next(&self) -> Option<Suggestion> {
        self.move_cursor(SuggestionCursor::next)
    }

    /// Move the keyboard selection up.
    pub fn select_previous(&self) -> Option<Suggestion> {
        self.move_cursor(SuggestionCursor::previous)
    }

    /// The suggestion under the keyboard selection.
    #[must_use]
    pub fn selected(&self) -> Option<Suggestion> {
        let display = self.display();
        display
            .cursor
            .selected()
            .and_then(|index| display.suggestions.get(index))
            .cloned()
    }

    fn move_cursor(&self, step: fn(&mut SuggestionCursor) -> Option<usize>) -> Option<Suggestion> {
        let mut display = self.display();
        let index = step(&mut display.cursor)?;
        let selected = display.suggestions.get(index).cloned();
        if let Err(e) = render(&mut display) {
            warn!(error = %e, "Failed to render suggestions");
        }
        selected
    }

    fn cached(&self, term: &str, now_ms: i64) -> Option<Vec<Suggestion>> {
        let mut cache: SuggestionCache = load_json(self.storage.as_ref(), keys::SEARCH_SUGGESTIONS_CACHE);
        let entry = cache.get(term)?;
        if !entry.is_expired(now_ms, ttl_millis()) {
            return Some(entry.suggestions.clone());
        }

        debug!(term, "Evicting stale suggestions");
        cache.remove(term);
        if let Err(e) = save_json(self.storage.as_ref(), keys::SEARCH_SUGGESTIONS_CACHE, &cache) {
            warn!(error = %e, "Failed to save suggestion cache");
        }
        None
    }

    fn store_cached(&self, term: &str, suggestions: &[Suggestion], now_ms: i64) {
        let mut cache: SuggestionCache = load_json(self.storage.as_ref(), keys::SEARCH_SUGGESTIONS_CACHE);
        cache.insert(
            term.to_string(),
            SuggestionCacheEntry {
                suggestions: suggestions.to_vec(),
                timestamp: now_ms,
            },
        );
        if let Err(e) = save_json(self.storage.as_ref(), keys::SEARCH_SUGGESTIONS_CACHE, &cache) {
            warn!(error = %e, "Failed to save suggestion cache");
        }
    }

    fn history_matches(&self, term: &str) -> Vec<Suggestion> {
        let needle = term.to_lowercase();
        self.history()
            .into_iter()
            .filter(|entry| entry.term.to_lowercase().contains(&needle))
            .take(HISTORY_FALLBACK_LIMIT)
            .map(|entry| {
                let url = format!("/search?q={}", urlencoding::encode(&entry.term));
                Suggestion::new(SuggestionKind::History, entry.term, url)
            })
            .collect()
    }

    fn show(&self, term: &str, suggestions: Vec<Suggestion>) {
        let mut display = self.display();
        display.query = term.to_string();
        display.cursor = SuggestionCursor::new(suggestions.len());
        display.suggestions = suggestions;
        if let Err(e) = render(&mut display) {
            warn!(error = %e, "Failed to render suggestions");
        }
    }

    fn display(&self) -> MutexGuard<'_, Display> {
        self.display.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn render(display: &mut Display) -> Result<(), RenderError> {
    display.html = if display.query.is_empty() {
        String::new()
    } else {
        SuggestionListTemplate::new(
            &display.query,
            &display.suggestions,
            display.cursor.selected(),
        )
        .render()?
    };
    Ok(())
}

/// Flatten categorized results in display order, keeping the first
/// [`MAX_SUGGESTIONS`].
fn flatten(results: SuggestResults) -> Vec<Suggestion> {
    results
        .products
        .into_iter()
        .chain(results.articles)
        .chain(results.pages)
        .chain(results.collections)
        .take(MAX_SUGGESTIONS)
        .collect()
}

fn ttl_millis() -> i64 {
    i64::try_from(CACHE_TTL.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::InMemoryShop;
    use crate::storage::MemoryStorage;

    const NOW: i64 = 1_700_000_000_000;

    fn suggest(shop: &InMemoryShop, storage: &Arc<MemoryStorage>) -> SearchSuggest {
        SearchSuggest::new(
            Arc::new(shop.clone()),
            storage.clone(),
            &SearchConfig {
                debounce: Duration::from_millis(300),
                resource_types: String::new(),
            },
        )
    }

    fn titled(kind: SuggestionKind, prefix: &str, n: usize) -> Vec<Suggestion> {
        (0..n)
            .map(|i| Suggestion::new(kind, format!("{prefix} {i}"), format!("/{prefix}/{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_short_query_is_ignored() {
        let shop = InMemoryShop::new();
        let search = suggest(&shop, &Arc::new(MemoryStorage::new()));
        assert_eq!(search.query_at(" a ", NOW).await, SuggestOutcome::TooShort);
        assert_eq!(shop.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_flattens_in_order_and_truncates() {
        let shop = InMemoryShop::new();
        shop.set_suggestions(
            "nebula",
            SuggestResults {
                products: titled(SuggestionKind::Product, "product", 3),
                articles: titled(SuggestionKind::Article, "article", 3),
                pages: titled(SuggestionKind::Page, "page", 3),
                collections: titled(SuggestionKind::Collection, "collection", 3),
            },
        );
        let search = suggest(&shop, &Arc::new(MemoryStorage::new()));

        let SuggestOutcome::Fetched(list) = search.query_at("nebula", NOW).await else {
            panic!("expected a fetch");
        };
        assert_eq!(list.len(), MAX_SUGGESTIONS);
        assert_eq!(list[0].kind, SuggestionKind::Product);
        assert_eq!(list[3].kind, SuggestionKind::Article);
        assert_eq!(list[7].kind, SuggestionKind::Page);
        assert!(search.suggestions_html().contains("product 0"));
    }

    #[tokio::test]
    async fn test_cache_ttl_boundary() {
        let shop = InMemoryShop::new();
        let storage = Arc::new(MemoryStorage::new());
        let search = suggest(&shop, &storage);

        assert!(matches!(search.query_at("void", NOW).await, SuggestOutcome::Fetched(_)));
        assert_eq!(shop.suggest_count(), 1);

        let at_ttl = NOW + ttl_millis();
        assert!(matches!(search.query_at("void", at_ttl).await, SuggestOutcome::Cached(_)));
        assert_eq!(shop.suggest_count(), 1);

        // One millisecond past the TTL the entry is evicted and refetched.
        assert!(matches!(
            search.query_at("void", at_ttl + 1).await,
            SuggestOutcome::Fetched(_)
        ));
        assert_eq!(shop.suggest_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_entry_eviction_is_persisted() {
        let shop = InMemoryShop::new();
        shop.set_offline(true);
        let storage = Arc::new(MemoryStorage::new());
        let mut cache = SuggestionCache::new();
        cache.insert(
            "void".to_string(),
            SuggestionCacheEntry {
                suggestions: titled(SuggestionKind::Page, "page", 1),
                timestamp: NOW - ttl_millis() - 1,
            },
        );
        save_json(storage.as_ref(), keys::SEARCH_SUGGESTIONS_CACHE, &cache).unwrap();

        let search = suggest(&shop, &storage);
        assert_eq!(search.query_at("void", NOW).await, SuggestOutcome::History(Vec::new()));

        let cache: SuggestionCache = load_json(storage.as_ref(), keys::SEARCH_SUGGESTIONS_CACHE);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_history_fallback() {
        let shop = InMemoryShop::new();
        let search = suggest(&shop, &Arc::new(MemoryStorage::new()));
        for term in ["Star map", "STARship", "moon boots", "star 1", "star 2", "star 3", "star 4"] {
            search.record_search(term);
        }
        shop.set_offline(true);

        let SuggestOutcome::History(list) = search.query_at("star", NOW).await else {
            panic!("expected history fallback");
        };
        assert_eq!(list.len(), HISTORY_FALLBACK_LIMIT);
        assert_eq!(list[0].title, "star 4");
        assert!(list.iter().all(|s| s.kind == SuggestionKind::History));
        assert_eq!(list[0].url, "/search?q=star%204");
    }

    #[test]
    fn test_record_search_dedupes_and_caps() {
        let search = suggest(&InMemoryShop::new(), &Arc::new(MemoryStorage::new()));
        for i in 0..25 {
            search.record_search(&format!("term {i}"));
        }
        search.record_search("term 10");
        search.record_search("   ");

        let history = search.history();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history[0].term, "term 10");
        assert_eq!(history.iter().filter(|e| e.term == "term 10").count(), 1);
    }

    #[test]
    fn test_cursor_wraps_both_ways() {
        let mut cursor = SuggestionCursor::new(3);
        assert_eq!(cursor.previous(), Some(2));
        assert_eq!(cursor.next(), Some(0));
        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.next(), Some(2));
        assert_eq!(cursor.next(), Some(0));
        cursor.reset();
        assert_eq!(cursor.selected(), None);

        let mut empty = SuggestionCursor::new(0);
        assert_eq!(empty.next(), None);
        assert_eq!(empty.previous(), None);
    }

    #[tokio::test]
    async fn test_keyboard_selection_over_results() {
        let shop = InMemoryShop::new();
        shop.set_suggestions(
            "orbit",
            SuggestResults {
                products: titled(SuggestionKind::Product, "orbit", 2),
                ..SuggestResults::default()
            },
        );
        let search = suggest(&shop, &Arc::new(MemoryStorage::new()));
        search.query_at("orbit", NOW).await;

        assert_eq!(search.select_previous().unwrap().title, "orbit 1");
        assert_eq!(search.select_next().unwrap().title, "orbit 0");
        assert_eq!(search.selected().unwrap().title, "orbit 0");
        assert!(search.suggestions_html().contains("is-selected"));
    }

    #[tokio::test]
    async fn test_concurrent_query_dropped() {
        let shop = InMemoryShop::new();
        shop.set_latency(Duration::from_millis(50));
        let search = suggest(&shop, &Arc::new(MemoryStorage::new()));

        let (first, second) = tokio::join!(
            search.query_at("comet", NOW),
            search.query_at("comets", NOW)
        );
        assert!(matches!(first, SuggestOutcome::Fetched(_)));
        assert_eq!(second, SuggestOutcome::Busy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_only_last_runs() {
        let shop = InMemoryShop::new();
        let search = suggest(&shop, &Arc::new(MemoryStorage::new()));

        let (first, second) = tokio::join!(search.query_debounced("ga"), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            search.query_debounced("gal").await
        });
        assert_eq!(first, SuggestOutcome::Superseded);
        assert!(matches!(second, SuggestOutcome::Fetched(_)));
        assert_eq!(shop.suggest_count(), 1);
    }
}
