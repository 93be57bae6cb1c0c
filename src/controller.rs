//! Client-side search state: query, country, filters, suggestions and the
//! latest result set, plus the request bookkeeping that keeps a slow response
//! from overwriting a newer one.

use crate::backend::SearchBackend;
use crate::error::UnfluffedError;
use crate::model::{
    AdvancedSearchRequest, AdvancedSearchResponse, BasicSearchRequest, BasicSearchResponse,
    Category, CountryCode, FilterSet, Product, SearchResultState, MAX_SUGGESTIONS,
};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Queries shorter than this never hit the suggestion endpoint.
pub const MIN_SUGGESTION_CHARS: usize = 2;

#[derive(Debug, Clone)]
pub enum SearchRequest {
    Basic(BasicSearchRequest),
    Advanced(AdvancedSearchRequest),
}

#[derive(Debug, Clone)]
pub enum SearchResponse {
    Basic(BasicSearchResponse),
    Advanced(AdvancedSearchResponse),
}

/// A dispatched search, tagged with the generation that produced it.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    generation: u64,
    pub request: SearchRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank query; nothing was sent.
    Skipped,
    Completed,
    /// The error message is also available from [`SearchController::error`].
    Failed(String),
    /// A newer search was issued before this one finished.
    Stale,
}

#[derive(Debug)]
struct PendingSuggestion {
    text: String,
    due: Instant,
}

/// Resets `is_loading` even if the in-flight future is dropped.
struct LoadingGuard<'a>(&'a mut bool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

pub struct SearchController<B> {
    backend: B,
    query: String,
    country: CountryCode,
    filters: FilterSet,
    advanced: bool,
    categories: Option<Vec<Category>>,
    state: SearchResultState,
    error: Option<String>,
    suggestions_visible: bool,
    pending_suggestion: Option<PendingSuggestion>,
    debounce: Duration,
    generation: u64,
}

impl<B: SearchBackend> SearchController<B> {
    pub fn new(backend: B, debounce: Duration) -> Self {
        Self {
            backend,
            query: String::new(),
            country: CountryCode::default(),
            filters: FilterSet::default(),
            advanced: false,
            categories: None,
            state: SearchResultState::default(),
            error: None,
            suggestions_visible: false,
            pending_suggestion: None,
            debounce,
            generation: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn country(&self) -> CountryCode {
        self.country
    }

    pub fn set_country(&mut self, country: CountryCode) {
        self.country = country;
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn advanced(&self) -> bool {
        self.advanced
    }

    pub fn set_advanced(&mut self, advanced: bool) {
        self.advanced = advanced;
    }

    pub fn state(&self) -> &SearchResultState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn suggestions_visible(&self) -> bool {
        self.suggestions_visible
    }

    pub fn has_pending_suggestion(&self) -> bool {
        self.pending_suggestion.is_some()
    }

    /// Update the query text. Long enough queries schedule a debounced
    /// suggestion lookup; shorter ones clear and hide the suggestion panel.
    pub fn set_query(&mut self, text: &str) {
        self.query = text.to_string();
        let trimmed = text.trim();
        if trimmed.chars().count() >= MIN_SUGGESTION_CHARS {
            self.pending_suggestion = Some(PendingSuggestion {
                text: trimmed.to_string(),
                due: Instant::now() + self.debounce,
            });
        } else {
            self.pending_suggestion = None;
            self.state.suggestions.clear();
            self.suggestions_visible = false;
        }
    }

    /// Wait out the debounce window for the most recent keystroke, then run at
    /// most one suggestion lookup. Returns whether a lookup was made.
    ///
    /// Cancel-safe while waiting: a dropped call leaves the lookup scheduled.
    pub async fn flush_suggestions(&mut self) -> bool {
        let (text, due) = match &self.pending_suggestion {
            Some(pending) => (pending.text.clone(), pending.due),
            None => return false,
        };
        tokio::time::sleep_until(due).await;
        self.pending_suggestion = None;
        self.fetch_suggestions(&text).await;
        true
    }

    /// Suggestion failures are logged and otherwise ignored.
    pub async fn fetch_suggestions(&mut self, text: &str) {
        tracing::debug!("Fetching suggestions for '{}'", text);
        match self.backend.suggestions(text).await {
            Ok(mut suggestions) => {
                suggestions.truncate(MAX_SUGGESTIONS);
                self.suggestions_visible = !suggestions.is_empty();
                self.state.suggestions = suggestions;
            }
            Err(e) => {
                tracing::warn!("Suggestion lookup failed: {}", e);
                self.suggestions_visible = false;
            }
        }
    }

    /// Treat a chosen suggestion as an implicit submit.
    pub async fn select_suggestion(&mut self, text: &str) -> SearchOutcome {
        self.query = text.to_string();
        self.suggestions_visible = false;
        self.pending_suggestion = None;
        self.search(self.advanced).await
    }

    /// Merge one filter field. Never triggers a search.
    pub fn set_filter(&mut self, name: &str, value: &str) -> Result<(), UnfluffedError> {
        if name == "category" {
            let value = value.trim();
            if let Some(categories) = &self.categories {
                if !value.is_empty() && !categories.iter().any(|c| c.identifier == value) {
                    return Err(UnfluffedError::InvalidFilter(format!(
                        "unknown category '{}'",
                        value
                    )));
                }
            }
        }
        self.filters.set(name, value)
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterSet::default();
    }

    pub fn has_active_filters(&self) -> bool {
        self.filters.is_active()
    }

    pub fn categories(&self) -> &[Category] {
        self.categories.as_deref().unwrap_or_default()
    }

    /// Fetch categories once per session; later calls reuse the first result.
    pub async fn load_categories(&mut self) -> Result<&[Category], UnfluffedError> {
        if self.categories.is_none() {
            let categories = self.backend.categories().await?;
            tracing::debug!("Loaded {} categories", categories.len());
            self.categories = Some(categories);
        }
        Ok(self.categories())
    }

    /// Start a search from the current query, country and filters.
    ///
    /// Returns `Ok(None)` for a blank query (state untouched) and an error when
    /// advanced filters are inconsistent; in that case nothing is sent and the
    /// result set is reset.
    pub fn begin_search(
        &mut self,
        use_advanced: bool,
    ) -> Result<Option<SearchTicket>, UnfluffedError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let request = if use_advanced {
            if let Err(e) = self.filters.validate() {
                self.generation += 1;
                self.advanced = use_advanced;
                self.state.used_advanced_search = use_advanced;
                self.fail(&e);
                return Err(e);
            }
            SearchRequest::Advanced(AdvancedSearchRequest::new(query, self.country, &self.filters))
        } else {
            SearchRequest::Basic(BasicSearchRequest {
                query: query.to_string(),
                country: self.country,
            })
        };

        self.generation += 1;
        self.advanced = use_advanced;
        self.pending_suggestion = None;
        self.suggestions_visible = false;
        self.error = None;
        self.state.is_loading = true;
        self.state.used_advanced_search = use_advanced;

        Ok(Some(SearchTicket {
            generation: self.generation,
            request,
        }))
    }

    /// Apply a finished search if it is still the latest one.
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        result: Result<SearchResponse, UnfluffedError>,
    ) -> SearchOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                "Discarding stale search response (generation {}, latest {})",
                ticket.generation,
                self.generation
            );
            return SearchOutcome::Stale;
        }

        self.state.is_loading = false;
        match result {
            Ok(SearchResponse::Basic(response)) => {
                let products = unique_by_asin(response.products);
                self.state.total_count = products.len() as u64;
                self.state.products = products;
                self.state.suggestions.clear();
                SearchOutcome::Completed
            }
            Ok(SearchResponse::Advanced(response)) => {
                let mut suggestions = response.suggestions;
                suggestions.truncate(MAX_SUGGESTIONS);
                self.state.total_count = response
                    .total_count
                    .unwrap_or(response.products.len() as u64);
                self.state.products = unique_by_asin(response.products);
                self.state.suggestions = suggestions;
                SearchOutcome::Completed
            }
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                self.fail(&e);
                SearchOutcome::Failed(e.to_string())
            }
        }
    }

    /// Run a full search round trip against the backend.
    pub async fn search(&mut self, use_advanced: bool) -> SearchOutcome {
        let ticket = match self.begin_search(use_advanced) {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return SearchOutcome::Skipped,
            Err(e) => return SearchOutcome::Failed(e.to_string()),
        };

        let result = {
            let _loading = LoadingGuard(&mut self.state.is_loading);
            match &ticket.request {
                SearchRequest::Basic(request) => self
                    .backend
                    .basic_search(request)
                    .await
                    .map(SearchResponse::Basic),
                SearchRequest::Advanced(request) => self
                    .backend
                    .advanced_search(request)
                    .await
                    .map(SearchResponse::Advanced),
            }
        };

        self.complete_search(ticket, result)
    }

    fn fail(&mut self, error: &UnfluffedError) {
        self.state.products.clear();
        self.state.total_count = 0;
        self.state.suggestions.clear();
        self.state.is_loading = false;
        self.error = Some(error.to_string());
    }
}

/// Keep the first product for each ASIN, preserving the backend's order.
fn unique_by_asin(products: Vec<Product>) -> Vec<Product> {
    let total = products.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<Product> = products
        .into_iter()
        .filter(|product| seen.insert(product.asin.clone()))
        .collect();
    if unique.len() < total {
        tracing::debug!("Dropped {} duplicate products", total - unique.len());
    }
    unique
}
