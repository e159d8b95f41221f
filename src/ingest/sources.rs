// src/ingest/sources.rs
//! Feed source registry: built-in defaults plus an optional override file.
//! Registry declaration order is meaningful; it is the merge order of the
//! aggregation pass and therefore the tie-break order for equal timestamps.

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::FeedSource;

pub const ENV_FEEDS_PATH: &str = "NEWS_FEEDS_PATH";

#[derive(Debug, Clone)]
pub struct FeedRegistry {
    sources: Vec<FeedSource>,
}

impl FeedRegistry {
    /// Build a registry, trimming whitespace, dropping entries with an empty
    /// name or URL, and deduplicating by URL (first declaration wins).
    pub fn new(sources: Vec<FeedSource>) -> Self {
        let mut seen = HashSet::new();
        let mut clean = Vec::with_capacity(sources.len());
        for s in sources {
            let name = s.name.trim().to_string();
            let url = s.url.trim().to_string();
            if name.is_empty() || url.is_empty() {
                continue;
            }
            if seen.insert(url.clone()) {
                clean.push(FeedSource { name, url });
            }
        }
        Self { sources: clean }
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The built-in registry used when no override file is present.
    pub fn builtin() -> Self {
        let defaults = [
            ("BBC News", "https://feeds.bbci.co.uk/news/rss.xml"),
            ("The Guardian", "https://www.theguardian.com/world/rss"),
            ("CNN", "http://rss.cnn.com/rss/edition.rss"),
            ("Reuters", "https://feeds.reuters.com/reuters/topNews"),
            ("Associated Press", "https://feeds.apnews.com/rss/apf-topnews"),
            ("The Verge", "https://www.theverge.com/rss/index.xml"),
            ("Bloomberg", "https://feeds.bloomberg.com/markets/news.rss"),
            ("TechCrunch", "https://techcrunch.com/feed/"),
            ("Wired", "https://www.wired.com/feed/rss"),
            ("Google News", "https://news.google.com/rss"),
        ];
        Self::new(
            defaults
                .into_iter()
                .map(|(name, url)| FeedSource {
                    name: name.to_string(),
                    url: url.to_string(),
                })
                .collect(),
        )
    }

    /// Load a registry from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed registry from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_registry(&content, ext.as_str())
    }

    /// Load using env var + fallbacks:
    /// 1) $NEWS_FEEDS_PATH
    /// 2) config/feeds.toml
    /// 3) config/feeds.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_FEEDS_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("NEWS_FEEDS_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/feeds.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/feeds.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::builtin())
    }
}

fn parse_registry(s: &str, hint_ext: &str) -> Result<FeedRegistry> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[[feeds]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    // Try JSON array of {name, url}
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    // Fallback: also try TOML if not attempted
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feed registry format"))
}

fn parse_toml(s: &str) -> Result<FeedRegistry> {
    #[derive(serde::Deserialize)]
    struct TomlRegistry {
        feeds: Vec<FeedSource>,
    }
    let v: TomlRegistry = toml::from_str(s)?;
    Ok(FeedRegistry::new(v.feeds))
}

fn parse_json(s: &str) -> Result<FeedRegistry> {
    let v: Vec<FeedSource> = serde_json::from_str(s)?;
    Ok(FeedRegistry::new(v))
}
