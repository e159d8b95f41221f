// src/api.rs
//! HTTP surface: the cached news read endpoint, the standalone summarize
//! endpoint, health, and permissive CORS for browser consumers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::cache::NewsCache;
use crate::categorizer::Category;
use crate::pipeline::{AggregationResult, Article};
use crate::summarizer::{Summarizer, DEFAULT_MAX_LEN};

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<NewsCache>,
    pub summarizer: Summarizer,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(news))
        .route("/api/summarize", post(summarize))
        .layer(cors)
        .with_state(state)
}

// --- response DTOs (external contract; field names are part of it) ---

#[derive(serde::Serialize)]
struct NewsResponse {
    news: Vec<ArticleOut>,
    stats: StatsOut,
}

#[derive(serde::Serialize)]
struct ArticleOut {
    title: String,
    link: String,
    source: String,
    #[serde(rename = "pubDate")]
    pub_date: DateTime<Utc>,
    /// Cleaned feed snippet.
    summary: String,
    /// Generated extractive synopsis.
    #[serde(rename = "aiSummary")]
    ai_summary: String,
    category: Category,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOut {
    total_sources: usize,
    successful_sources: usize,
    failed_sources: usize,
    total_articles: usize,
    category_stats: BTreeMap<&'static str, usize>,
    timestamp: DateTime<Utc>,
}

impl From<&Article> for ArticleOut {
    fn from(a: &Article) -> Self {
        Self {
            title: a.title.clone(),
            link: a.link.clone(),
            source: a.source_name.clone(),
            pub_date: a.published_at,
            summary: a.raw_summary.clone(),
            ai_summary: a.summary.clone(),
            category: a.category,
        }
    }
}

impl From<&AggregationResult> for NewsResponse {
    fn from(result: &AggregationResult) -> Self {
        let category_stats = result
            .stats
            .category_counts
            .iter()
            .map(|(cat, count)| (cat.as_str(), *count))
            .collect();
        Self {
            news: result.articles.iter().map(ArticleOut::from).collect(),
            stats: StatsOut {
                total_sources: result.stats.total_sources,
                successful_sources: result.stats.successful_sources,
                failed_sources: result.stats.failed_sources,
                total_articles: result.stats.total_articles,
                category_stats,
                timestamp: result.stats.generated_at,
            },
        }
    }
}

struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.error,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

async fn news(State(state): State<AppState>) -> Result<Json<NewsResponse>, ApiError> {
    let result = state.cache.get().await.map_err(|err| {
        error!(error = %err, "news read failed with nothing cached");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "news_unavailable",
            message: err.to_string(),
        }
    })?;
    Ok(Json(NewsResponse::from(&*result)))
}

#[derive(serde::Deserialize)]
struct SummarizeReq {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(serde::Serialize)]
struct SummarizeResp {
    summary: String,
    #[serde(rename = "originalLength")]
    original_length: usize,
    #[serde(rename = "summaryLength")]
    summary_length: usize,
}

/// Stateless convenience wrapper around the summarizer; no caching, no
/// aggregation involvement.
async fn summarize(
    State(state): State<AppState>,
    Json(body): Json<SummarizeReq>,
) -> Result<Json<SummarizeResp>, ApiError> {
    let title = body.title.unwrap_or_default();
    let text = body.text.unwrap_or_default();
    if title.trim().is_empty() && text.trim().is_empty() {
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            error: "missing_input",
            message: "either title or text is required".to_string(),
        });
    }

    let full_text = if title.trim().is_empty() {
        text
    } else {
        format!("{title}. {text}")
    };

    let summary = state.summarizer.summarize_two(&full_text, DEFAULT_MAX_LEN);
    Ok(Json(SummarizeResp {
        original_length: full_text.chars().count(),
        summary_length: summary.chars().count(),
        summary,
    }))
}
