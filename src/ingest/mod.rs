// src/ingest/mod.rs
pub mod fetch;
pub mod parse;
pub mod sources;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_entries_total", "Entries parsed from feeds.");
        describe_counter!(
            "feed_source_failures_total",
            "Sources excluded from a pass due to fetch/parse errors."
        );
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!("pipeline_runs_total", "Completed aggregation passes.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the aggregation pipeline last ran."
        );
        describe_counter!("cache_served_total", "Reads served from the news cache.");
        describe_counter!("cache_refresh_total", "Cache refreshes triggered.");
    });
}

/// Normalize feed text: decode HTML entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, "");

    // 3) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}
