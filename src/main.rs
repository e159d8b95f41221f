//! News Aggregation Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the feed registry, the aggregation
//! pipeline, the news cache, and the metrics exporter.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_aggregator::api::{self, AppState};
use news_aggregator::cache::{self, CacheConfig, NewsCache};
use news_aggregator::ingest::fetch::Fetcher;
use news_aggregator::ingest::sources::FeedRegistry;
use news_aggregator::ingest::types::FeedClient;
use news_aggregator::metrics::Metrics;
use news_aggregator::pipeline::{Pipeline, DEFAULT_RECENCY_DAYS};
use news_aggregator::summarizer::Summarizer;

/// Period of the cache idle sweep; housekeeping, not serving logic.
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let bind_addr =
        std::env::var("NEWS_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let cache_ttl = Duration::from_secs(env_u64("NEWS_CACHE_TTL_SECS", 45));
    let idle_reset = Duration::from_secs(env_u64("NEWS_IDLE_RESET_SECS", 3600));
    let recency_days = env_u64("NEWS_RECENCY_DAYS", DEFAULT_RECENCY_DAYS as u64) as i64;
    let fetch_timeout = Duration::from_secs(env_u64("NEWS_FETCH_TIMEOUT_SECS", 10));

    let registry = FeedRegistry::load_default().context("loading feed registry")?;
    info!(sources = registry.len(), "feed registry loaded");

    let metrics = Metrics::init(cache_ttl.as_secs(), registry.len());

    let client: Arc<dyn FeedClient> = Arc::new(Fetcher::new(fetch_timeout));
    let pipeline = Pipeline::new(registry, client, chrono::Duration::days(recency_days));
    let news_cache = Arc::new(NewsCache::new(
        pipeline,
        CacheConfig {
            ttl: cache_ttl,
            idle_reset,
        },
    ));
    cache::spawn_idle_sweeper(Arc::clone(&news_cache), SWEEP_PERIOD);

    let state = AppState {
        cache: news_cache,
        summarizer: Summarizer::new(),
    };
    let app = api::create_router(state).merge(metrics.router());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!(addr = %bind_addr, "news aggregator listening");

    axum::serve(listener, app.into_make_service())
        .await
        .context("serving http")?;
    Ok(())
}
