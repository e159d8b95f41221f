// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/news (response contract incl. stats)
// - GET /api/news total-failure 500 shape
// - POST /api/summarize (happy path + 400)
// - CORS headers on simple and preflight requests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use news_aggregator::api::{create_router, AppState};
use news_aggregator::cache::{CacheConfig, NewsCache};
use news_aggregator::ingest::sources::FeedRegistry;
use news_aggregator::ingest::types::{FeedClient, FeedSource, FetchError};
use news_aggregator::pipeline::Pipeline;
use news_aggregator::summarizer::Summarizer;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Stub feed: serves a two-item RSS body dated "now", or dies on demand.
struct StubFeed {
    panicking: bool,
}

#[async_trait]
impl FeedClient for StubFeed {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        if self.panicking {
            panic!("stub feed down");
        }
        let now = Utc::now().to_rfc2822();
        Ok(format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>S</title>
<item><title>Apple unveils new iPhone with AI chip</title><link>https://stub.example/tech</link><pubDate>{now}</pubDate><description>The company announced the device today.</description></item>
<item><title>Local bakery wins award</title><link>https://stub.example/bakery</link><pubDate>{now}</pubDate><description>Judges confirmed the result.</description></item>
</channel></rss>"#
        ))
    }
}

/// Build the same Router the binary uses, backed by the stub feed.
fn test_router(panicking: bool) -> Router {
    let registry = FeedRegistry::new(vec![FeedSource {
        name: "Stub".into(),
        url: "https://stub.example/rss".into(),
    }]);
    let client: Arc<dyn FeedClient> = Arc::new(StubFeed { panicking });
    let pipeline = Pipeline::new(registry, client, chrono::Duration::days(7));
    let cache = Arc::new(NewsCache::new(
        pipeline,
        CacheConfig {
            ttl: Duration::from_secs(30),
            idle_reset: Duration::from_secs(3600),
        },
    ));
    create_router(AppState {
        cache,
        summarizer: Summarizer::new(),
    })
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(false);

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn api_news_returns_expected_contract() {
    let app = test_router(false);

    let req = Request::builder()
        .method("GET")
        .uri("/api/news")
        .body(Body::empty())
        .expect("build GET /api/news");

    let resp = app.oneshot(req).await.expect("oneshot /api/news");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;

    let news = v.get("news").and_then(Json::as_array).expect("news array");
    assert_eq!(news.len(), 2);
    for article in news {
        for field in [
            "title",
            "link",
            "source",
            "pubDate",
            "summary",
            "aiSummary",
            "category",
        ] {
            assert!(article.get(field).is_some(), "missing article field {field}");
        }
        assert_eq!(article["source"], "Stub");
        // pubDate is an ISO-8601 string.
        let pub_date = article["pubDate"].as_str().expect("pubDate string");
        assert!(
            chrono::DateTime::parse_from_rfc3339(pub_date).is_ok(),
            "pubDate not ISO-8601: {pub_date}"
        );
    }

    let stats = v.get("stats").expect("stats object");
    for field in [
        "totalSources",
        "successfulSources",
        "failedSources",
        "totalArticles",
        "categoryStats",
        "timestamp",
    ] {
        assert!(stats.get(field).is_some(), "missing stats field {field}");
    }
    assert_eq!(stats["totalSources"], 1);
    assert_eq!(stats["successfulSources"], 1);
    assert_eq!(stats["failedSources"], 0);
    assert_eq!(stats["totalArticles"], 2);
    // The tech headline clears the categorizer threshold; the bakery one
    // falls back to General.
    assert_eq!(stats["categoryStats"]["Technology"], 1);
    assert_eq!(stats["categoryStats"]["General"], 1);
}

#[tokio::test]
async fn api_news_total_failure_without_prior_result_is_500() {
    let app = test_router(true);

    let req = Request::builder()
        .method("GET")
        .uri("/api/news")
        .body(Body::empty())
        .expect("build GET /api/news");

    let resp = app.oneshot(req).await.expect("oneshot /api/news");
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let v = read_json(resp).await;
    assert!(v.get("error").is_some(), "missing 'error'");
    assert!(v.get("message").is_some(), "missing 'message'");
}

#[tokio::test]
async fn api_summarize_returns_summary_and_lengths() {
    let app = test_router(false);

    let payload = json!({
        "title": "Breaking: Company announced a new product today",
        "text": "It is blue. The product was developed over three years by a large team of scientists."
    });
    let req = Request::builder()
        .method("POST")
        .uri("/api/summarize")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /api/summarize");

    let resp = app.oneshot(req).await.expect("oneshot /api/summarize");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    let summary = v["summary"].as_str().expect("summary string");
    assert!(!summary.is_empty());
    assert!(summary.contains("announced") || summary.contains("developed"));
    assert!(v["originalLength"].as_u64().unwrap() > 0);
    assert_eq!(
        v["summaryLength"].as_u64().unwrap() as usize,
        summary.chars().count()
    );
}

#[tokio::test]
async fn api_summarize_title_only_is_accepted() {
    let app = test_router(false);

    let payload = json!({ "title": "Scientists discovered a new species in the deep sea" });
    let req = Request::builder()
        .method("POST")
        .uri("/api/summarize")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request");

    let resp = app.oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_summarize_without_input_is_400() {
    let app = test_router(false);

    let req = Request::builder()
        .method("POST")
        .uri("/api/summarize")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .expect("build request");

    let resp = app.oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let v = read_json(resp).await;
    assert!(v.get("error").is_some());
}

#[tokio::test]
async fn cors_allows_any_origin_on_simple_requests() {
    let app = test_router(false);

    let req = Request::builder()
        .method("GET")
        .uri("/api/news")
        .header("origin", "https://reader.example")
        .body(Body::empty())
        .expect("build request");

    let resp = app.oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|h| h.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn cors_preflight_succeeds_with_empty_body() {
    let app = test_router(false);

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/news")
        .header("origin", "https://reader.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .expect("build request");

    let resp = app.oneshot(req).await.expect("oneshot");
    assert!(
        resp.status() == StatusCode::OK || resp.status() == StatusCode::NO_CONTENT,
        "preflight should be 200/204, got {}",
        resp.status()
    );
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|h| h.to_str().ok()),
        Some("*")
    );

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    assert!(bytes.is_empty(), "preflight body must be empty");
}
