// src/pipeline.rs
//! The aggregation pass: fan out fetch+parse across the registry, annotate
//! surviving entries into articles, dedup, recency-filter, sort, and tally
//! stats. One pass produces one immutable `AggregationResult`; the cache
//! layer owns when passes happen.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use metrics::{counter, gauge};
use tracing::{info, warn};

use crate::categorizer::{categorize, Category};
use crate::ingest::sources::FeedRegistry;
use crate::ingest::types::{FeedClient, FeedSource, RawEntry, SourceError};
use crate::ingest::{clean_text, ensure_metrics_described, parse};
use crate::summarizer::{Summarizer, DEFAULT_MAX_LEN};

pub const DEFAULT_RECENCY_DAYS: i64 = 7;

/// One entry after validation, summarization, and categorization. Never
/// mutated after the pass that built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    /// Cleaned feed snippet (markup stripped).
    pub raw_summary: String,
    /// Generated extractive synopsis.
    pub summary: String,
    pub category: Category,
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub total_sources: usize,
    pub successful_sources: usize,
    pub failed_sources: usize,
    pub total_articles: usize,
    pub category_counts: HashMap<Category, usize>,
    pub generated_at: DateTime<Utc>,
}

/// Output of one pass. Owned by the cache behind an `Arc`; replaced
/// wholesale, never patched, so readers cannot observe a half-built set.
#[derive(Debug, Clone)]
pub struct AggregationResult {
    pub articles: Vec<Article>,
    pub stats: Stats,
}

pub struct Pipeline {
    registry: FeedRegistry,
    client: Arc<dyn FeedClient>,
    summarizer: Summarizer,
    recency_window: Duration,
}

impl Pipeline {
    pub fn new(registry: FeedRegistry, client: Arc<dyn FeedClient>, recency_window: Duration) -> Self {
        Self {
            registry,
            client,
            summarizer: Summarizer::new(),
            recency_window,
        }
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    /// Run one aggregation pass. Per-source failures are recorded and
    /// excluded, never propagated; an all-failed pass still yields a valid
    /// (empty) result. `Err` here means the pass itself broke (a source
    /// task died), which aborts only this refresh attempt.
    pub async fn run(&self) -> Result<AggregationResult> {
        ensure_metrics_described();
        let now = Utc::now();

        let outcomes = self.collect_sources(now.timestamp()).await?;

        let mut successful_sources = 0usize;
        let mut merged: Vec<(String, RawEntry)> = Vec::new();
        for (source, result) in outcomes {
            match result {
                Ok(entries) => {
                    successful_sources += 1;
                    for entry in entries {
                        merged.push((source.name.clone(), entry));
                    }
                }
                Err(err) => {
                    warn!(source = %source.name, error = %err, "source excluded from this pass");
                    counter!("feed_source_failures_total").increment(1);
                }
            }
        }

        let articles = self.annotate_and_finalize(merged, now);

        let mut category_counts: HashMap<Category, usize> = HashMap::new();
        for article in &articles {
            *category_counts.entry(article.category).or_insert(0) += 1;
        }

        let total_sources = self.registry.len();
        let stats = Stats {
            total_sources,
            successful_sources,
            failed_sources: total_sources - successful_sources,
            total_articles: articles.len(),
            category_counts,
            generated_at: now,
        };

        counter!("pipeline_runs_total").increment(1);
        gauge!("pipeline_last_run_ts").set(now.timestamp() as f64);
        info!(
            articles = stats.total_articles,
            successful = stats.successful_sources,
            failed = stats.failed_sources,
            "aggregation pass complete"
        );

        Ok(AggregationResult { articles, stats })
    }

    /// Fan out one task per source, each with its own deadline inside the
    /// fetcher, and settle all of them; a failed source becomes a per-source
    /// error, never an early return.
    async fn collect_sources(
        &self,
        now_unix: i64,
    ) -> Result<Vec<(FeedSource, std::result::Result<Vec<RawEntry>, SourceError>)>> {
        let tasks: Vec<_> = self
            .registry
            .sources()
            .iter()
            .cloned()
            .map(|source| {
                let client = Arc::clone(&self.client);
                tokio::spawn(async move {
                    let result = fetch_and_parse(client.as_ref(), &source.url, now_unix).await;
                    (source, result)
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(tasks.len());
        for joined in join_all(tasks).await {
            outcomes.push(joined.context("joining feed source task")?);
        }
        Ok(outcomes)
    }

    /// Annotate, dedup on (title, source), drop stale articles, sort.
    /// Merge order follows registry declaration order, which makes the
    /// final order deterministic for a given input set.
    fn annotate_and_finalize(
        &self,
        merged: Vec<(String, RawEntry)>,
        now: DateTime<Utc>,
    ) -> Vec<Article> {
        let cutoff = now - self.recency_window;

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut articles = Vec::with_capacity(merged.len());
        for (source_name, entry) in merged {
            // First occurrence wins; the same logical article reappearing
            // across passes of the same source collapses here. Identical
            // titles from different outlets stay distinct.
            if !seen.insert((entry.title.clone(), source_name.clone())) {
                continue;
            }

            let published_at = DateTime::from_timestamp(entry.published_at, 0)
                .unwrap_or(now);
            if published_at < cutoff {
                continue;
            }

            let raw_summary = clean_text(&entry.raw_summary);
            let combined = format!("{}. {}", entry.title, raw_summary);
            let summary = self.summarizer.summarize(&combined, DEFAULT_MAX_LEN);
            let category = categorize(&combined);

            articles.push(Article {
                title: entry.title,
                link: entry.link,
                source_name,
                published_at,
                raw_summary,
                summary,
                category,
            });
        }

        // Stable: equal timestamps keep merge order.
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles
    }
}

async fn fetch_and_parse(
    client: &dyn FeedClient,
    url: &str,
    now_unix: i64,
) -> std::result::Result<Vec<RawEntry>, SourceError> {
    let body = client.fetch(url).await?;
    let entries = parse::parse_feed(&body, now_unix)?;
    Ok(entries)
}
