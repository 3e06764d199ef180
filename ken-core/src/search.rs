//! Debounced, cancellable ticker search.
//!
//! Each keystroke supersedes the previous search: its token is cancelled, so a
//! request still sleeping in the debounce window or waiting on the network
//! returns `Ok(None)` and never touches the result list. Results also carry the
//! generation they were issued for, and [`SearchState::apply`] drops stale ones.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::types::SearchResult;

/// Search box state owned by the home screen.
#[derive(Debug, Default)]
pub struct SearchState {
    query: String,
    results: Vec<SearchResult>,
    loading: bool,
    generation: u64,
    error: Option<String>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the query and returns the generation a new search must carry.
    ///
    /// A blank query clears results immediately and leaves nothing loading.
    pub fn set_query(&mut self, query: impl Into<String>) -> u64 {
        self.query = query.into();
        self.generation += 1;
        self.error = None;
        if self.query.trim().is_empty() {
            self.results.clear();
            self.loading = false;
        } else {
            self.loading = true;
        }
        self.generation
    }

    /// Applies a finished search. Returns `false` when `generation` is stale.
    pub fn apply(&mut self, generation: u64, outcome: Result<Vec<SearchResult>, String>) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale search");
            return false;
        }
        self.loading = false;
        match outcome {
            Ok(results) => self.results = results,
            Err(e) => self.error = Some(e),
        }
        true
    }
}

/// Hands out one cancellation token per search, cancelling the previous one.
#[derive(Debug, Default)]
pub struct Searcher {
    current: Option<CancellationToken>,
}

impl Searcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the in-flight search, if any, and returns a token for the next.
    pub fn supersede(&mut self) -> CancellationToken {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        token
    }

    /// Cancels the in-flight search without starting another.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
    }
}

/// Waits `delay`, then searches for `query`.
///
/// Returns `Ok(None)` if `token` is cancelled before the response arrives, and
/// `Ok(Some(vec![]))` without a request for a blank query.
pub async fn debounced_search(
    api: &ApiClient,
    query: &str,
    token: &CancellationToken,
    delay: Duration,
) -> Result<Option<Vec<SearchResult>>, ApiError> {
    if query.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }
    tokio::select! {
        _ = token.cancelled() => return Ok(None),
        _ = tokio::time::sleep(delay) => {}
    }
    tokio::select! {
        _ = token.cancelled() => {
            debug!(query, "search aborted");
            Ok(None)
        }
        result = api.search_listed(query) => result.map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(symbol: &str) -> SearchResult {
        SearchResult {
            symbol: symbol.into(),
            name: format!("{symbol} Inc."),
        }
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut state = SearchState::new();
        let first = state.set_query("AA");
        let second = state.set_query("AAPL");
        assert!(!state.apply(first, Ok(vec![hit("AA")])));
        assert!(state.results().is_empty());
        assert!(state.is_loading());
        assert!(state.apply(second, Ok(vec![hit("AAPL")])));
        assert_eq!(state.results(), &[hit("AAPL")]);
        assert!(!state.is_loading());
    }

    #[test]
    fn blank_query_clears_results() {
        let mut state = SearchState::new();
        let g = state.set_query("MS");
        state.apply(g, Ok(vec![hit("MSFT")]));
        state.set_query("  ");
        assert!(state.results().is_empty());
        assert!(!state.is_loading());
    }

    #[test]
    fn supersede_cancels_previous_token() {
        let mut searcher = Searcher::new();
        let a = searcher.supersede();
        let b = searcher.supersede();
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        searcher.cancel();
        assert!(b.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_during_debounce_returns_none() {
        let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let out = debounced_search(&api, "AAPL", &token, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn blank_query_short_circuits() {
        let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let token = CancellationToken::new();
        let out = debounced_search(&api, " ", &token, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, Some(Vec::new()));
    }
}
