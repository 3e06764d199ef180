//! Search supersession against a slow backend.

use std::time::Duration;

use ken_core::api::ApiClient;
use ken_core::search::{debounced_search, SearchState, Searcher};
use ken_core::types::SearchResult;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn aborted_search_leaves_results_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search_listed"))
        .and(query_param("query", "APP"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 200, "response": [{ "symbol": "APPN", "name": "Appian" }] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut state = SearchState::new();
    let previous = vec![SearchResult {
        symbol: "AAPL".into(),
        name: "Apple Inc.".into(),
    }];
    let g = state.set_query("AAPL");
    state.apply(g, Ok(previous.clone()));

    let mut searcher = Searcher::new();
    let generation = state.set_query("APP");
    let token = searcher.supersede();
    let handle = {
        let api = api.clone();
        tokio::spawn(async move {
            debounced_search(&api, "APP", &token, Duration::from_millis(10)).await
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    state.set_query("APPL");
    let _next = searcher.supersede();

    let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(outcome.is_none());
    assert!(!state.apply(generation, Ok(Vec::new())));
    assert_eq!(state.results(), previous.as_slice());
}

#[tokio::test]
async fn latest_query_result_is_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search_listed"))
        .and(query_param("query", "MSFT"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 200, "response": [{ "symbol": "MSFT", "name": "Microsoft" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut state = SearchState::new();
    let mut searcher = Searcher::new();

    // Two keystrokes inside the debounce window: only the second issues a request.
    let stale_token = searcher.supersede();
    let stale = debounced_search(&api, "MS", &stale_token, Duration::from_millis(50));
    let generation = state.set_query("MSFT");
    let token = searcher.supersede();
    let (stale, fresh) = tokio::join!(
        stale,
        debounced_search(&api, "MSFT", &token, Duration::from_millis(50))
    );

    assert!(stale.unwrap().is_none());
    let results = fresh.unwrap().unwrap();
    assert!(state.apply(generation, Ok(results)));
    assert_eq!(state.results()[0].symbol, "MSFT");
}
