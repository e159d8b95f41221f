// src/cache.rs
//! Single-flight TTL cache over the aggregation result. The cache exists to
//! collapse bursts of near-simultaneous reads into one upstream refresh, not
//! to provide long-term storage; the TTL is tens of seconds.
//!
//! State machine: Empty -> RefreshInFlight on first read; Fresh serves
//! directly; Stale starts a refresh unless one is already running, in which
//! case readers get the previous result immediately (stale-while-revalidate)
//! and only first-ever readers wait. The result is replaced atomically
//! behind an `Arc`, so a reader mid-read never observes a torn set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use metrics::counter;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::pipeline::{AggregationResult, Pipeline};

pub const DEFAULT_TTL: Duration = Duration::from_secs(45);
pub const DEFAULT_IDLE_RESET: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Freshness bound for serving without a refresh.
    pub ttl: Duration,
    /// Idle bound after which the housekeeping sweep drops the entry
    /// entirely. Much larger than the TTL; bounds memory, not freshness.
    pub idle_reset: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            idle_reset: DEFAULT_IDLE_RESET,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("news refresh failed and no prior result exists: {0}")]
    RefreshFailed(String),
}

pub struct NewsCache {
    pipeline: Pipeline,
    inner: Mutex<Inner>,
    refreshed: Notify,
    ttl: Duration,
    idle_reset: Duration,
}

#[derive(Default)]
struct Inner {
    result: Option<Arc<AggregationResult>>,
    last_refreshed: Option<Instant>,
    last_read: Option<Instant>,
    refresh_in_flight: bool,
}

impl NewsCache {
    pub fn new(pipeline: Pipeline, config: CacheConfig) -> Self {
        Self {
            pipeline,
            inner: Mutex::new(Inner::default()),
            refreshed: Notify::new(),
            ttl: config.ttl,
            idle_reset: config.idle_reset,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Serve the cached result, refreshing it first when stale. At most one
    /// refresh runs at a time; concurrent readers either get the previous
    /// result immediately or (with nothing to serve yet) wait for the
    /// in-flight run.
    pub async fn get(self: &Arc<Self>) -> Result<Arc<AggregationResult>, CacheError> {
        loop {
            let mut inner = self.inner.lock().await;
            inner.last_read = Some(Instant::now());

            let fresh = inner.last_refreshed.is_some_and(|t| t.elapsed() < self.ttl);
            if fresh {
                if let Some(result) = inner.result.clone() {
                    counter!("cache_served_total").increment(1);
                    return Ok(result);
                }
            }

            if inner.refresh_in_flight {
                if let Some(result) = inner.result.clone() {
                    // Stale-while-revalidate: don't block on the running
                    // refresh when there is something to serve.
                    counter!("cache_served_total").increment(1);
                    return Ok(result);
                }
                // First-ever readers have nothing to fall back on; register
                // for the wakeup before releasing the lock so the notify
                // cannot slip past us.
                let notified = self.refreshed.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                drop(inner);
                notified.await;
                continue;
            }

            inner.refresh_in_flight = true;
            let previous = inner.result.clone();
            drop(inner);

            counter!("cache_refresh_total").increment(1);
            return self.refresh(previous).await;
        }
    }

    async fn refresh(
        self: &Arc<Self>,
        previous: Option<Arc<AggregationResult>>,
    ) -> Result<Arc<AggregationResult>, CacheError> {
        // Detached task: a reader disconnecting mid-refresh must not cancel
        // the run, and the flag is always cleared by the task itself.
        let cache = Arc::clone(self);
        let run: JoinHandle<Result<Arc<AggregationResult>, String>> =
            tokio::spawn(async move { cache.run_and_install().await });

        let outcome = match run.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(join_err.to_string()),
        };

        match outcome {
            Ok(result) => Ok(result),
            // Degrade to the previous result; the failure is already logged.
            Err(reason) => match previous {
                Some(result) => Ok(result),
                None => Err(CacheError::RefreshFailed(reason)),
            },
        }
    }

    async fn run_and_install(self: Arc<Self>) -> Result<Arc<AggregationResult>, String> {
        let outcome = std::panic::AssertUnwindSafe(self.pipeline.run())
            .catch_unwind()
            .await;

        let mut inner = self.inner.lock().await;
        inner.refresh_in_flight = false;

        let served = match outcome {
            Ok(Ok(fresh)) => {
                let keep_previous = fresh.articles.is_empty()
                    && inner
                        .result
                        .as_ref()
                        .is_some_and(|prev| !prev.articles.is_empty());
                if keep_previous {
                    warn!("refresh produced no articles; keeping previous result");
                } else {
                    inner.result = Some(Arc::new(fresh));
                }
                // The TTL clock resets either way, so a dead upstream does
                // not turn every read into a refresh attempt.
                inner.last_refreshed = Some(Instant::now());
                inner
                    .result
                    .clone()
                    .ok_or_else(|| "refresh installed no result".to_string())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "aggregation pass failed; previous result remains servable");
                Err(err.to_string())
            }
            Err(_panic) => {
                warn!("aggregation pass panicked; previous result remains servable");
                Err("aggregation pass panicked".to_string())
            }
        };

        drop(inner);
        self.refreshed.notify_waiters();
        served
    }

    /// Housekeeping: drop the entry once no read has occurred for the idle
    /// bound. Separate from the read path; driven by `spawn_idle_sweeper`.
    pub async fn sweep_idle(&self) {
        let mut inner = self.inner.lock().await;
        if inner.refresh_in_flight || inner.result.is_none() {
            return;
        }
        let idle = inner
            .last_read
            .map(|t| t.elapsed() >= self.idle_reset)
            .unwrap_or(true);
        if idle {
            info!("news cache idle past bound; dropping cached result");
            inner.result = None;
            inner.last_refreshed = None;
        }
    }
}

/// Spawn the periodic idle sweep for a cache handle.
pub fn spawn_idle_sweeper(cache: Arc<NewsCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            cache.sweep_idle().await;
        }
    })
}
