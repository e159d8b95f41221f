// src/ingest/parse.rs
//! Feed bytes -> normalized raw entries. Understands RSS 2.0 and Atom.
//! Per-source errors here are non-fatal to the aggregation pass; the source
//! is simply excluded and counted as failed.

use chrono::DateTime;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{ParseError, RawEntry};

/// Cap per source: the most recent N entries after sorting by publish time.
/// Bounds memory and annotation cost when a feed returns an unusually
/// large backlog.
pub const MAX_ENTRIES_PER_SOURCE: usize = 50;

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}

/// Atom text constructs may carry a `type` attribute; only the text matters.
#[derive(Debug, Default, Deserialize)]
struct AtomText {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse feed XML into raw entries. `now_unix` is substituted for missing
/// or unparseable publish dates (documented policy: such entries stay
/// inside the recency window at the cost of slight sort distortion).
pub fn parse_feed(xml: &str, now_unix: i64) -> Result<Vec<RawEntry>, ParseError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let mut entries = if xml_clean.contains("<rss") || xml_clean.contains("<channel") {
        let rss: Rss =
            from_str(&xml_clean).map_err(|e| ParseError::Malformed(e.to_string()))?;
        rss_entries(rss, now_unix)
    } else if xml_clean.contains("<feed") {
        let feed: AtomFeed =
            from_str(&xml_clean).map_err(|e| ParseError::Malformed(e.to_string()))?;
        atom_entries(feed, now_unix)
    } else {
        return Err(ParseError::UnrecognizedFormat);
    };

    if entries.is_empty() {
        return Err(ParseError::NoEntries);
    }

    // Keep only the most recent entries; stable sort preserves feed order
    // for equal timestamps.
    entries.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    entries.truncate(MAX_ENTRIES_PER_SOURCE);

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_entries_total").increment(entries.len() as u64);

    Ok(entries)
}

fn rss_entries(rss: Rss, now_unix: i64) -> Vec<RawEntry> {
    let mut out = Vec::with_capacity(rss.channel.items.len());
    for it in rss.channel.items {
        // Title and link are mandatory; entries lacking either are dropped.
        let title = match nonempty(it.title) {
            Some(t) => t,
            None => continue,
        };
        let link = match nonempty(it.link) {
            Some(l) => l,
            None => continue,
        };
        out.push(RawEntry {
            title,
            link,
            published_at: it
                .pub_date
                .as_deref()
                .and_then(parse_feed_date_to_unix)
                .unwrap_or(now_unix),
            raw_summary: it.description.unwrap_or_default(),
        });
    }
    out
}

fn atom_entries(feed: AtomFeed, now_unix: i64) -> Vec<RawEntry> {
    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let title = match nonempty(entry.title.and_then(|t| t.value)) {
            Some(t) => t,
            None => continue,
        };
        let link = match alternate_link(&entry.links) {
            Some(l) => l,
            None => continue,
        };
        let raw_summary = entry
            .summary
            .and_then(|t| t.value)
            .or_else(|| entry.content.and_then(|t| t.value))
            .unwrap_or_default();
        out.push(RawEntry {
            title,
            link,
            published_at: entry
                .published
                .as_deref()
                .or(entry.updated.as_deref())
                .and_then(parse_feed_date_to_unix)
                .unwrap_or(now_unix),
            raw_summary,
        });
    }
    out
}

/// Pick the article link: `rel="alternate"` (or no rel) wins, else the
/// first link with an href.
fn alternate_link(links: &[AtomLink]) -> Option<String> {
    links
        .iter()
        .find(|l| {
            l.href.is_some() && matches!(l.rel.as_deref(), None | Some("alternate"))
        })
        .or_else(|| links.iter().find(|l| l.href.is_some()))
        .and_then(|l| l.href.clone())
}

fn nonempty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Feeds in the wild use RFC 2822 (`pubDate`, including the obsolete `GMT`
/// zone) or RFC 3339 (Atom); accept both.
fn parse_feed_date_to_unix(ts: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(ts)
        .or_else(|_| DateTime::parse_from_rfc3339(ts))
        .ok()
        .map(|dt| dt.timestamp())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
