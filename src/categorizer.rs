// src/categorizer.rs
//! Keyword-overlap topic classifier. Lower-cased substring containment
//! against per-category keyword lists; the highest hit count wins, ties go
//! to the earlier-declared category, and anything under the confidence
//! threshold lands in General. Total over all inputs: always exactly one
//! label out.
//!
//! Matching is raw containment, not word-boundary tokenized, so substrings
//! can over-match ("war" inside "award"). That behavior is part of the
//! stats contract; see DESIGN.md before changing it.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Per-category keyword lists, versioned data separate from the algorithm.
static CATEGORY_KEYWORDS: Lazy<HashMap<String, Vec<String>>> = Lazy::new(|| {
    let raw = include_str!("../category_keywords.json");
    serde_json::from_str::<HashMap<String, Vec<String>>>(raw).expect("valid category keyword map")
});

/// A category needs at least this many keyword hits to beat the General
/// fallback; one stray hit is not enough to classify.
const MIN_KEYWORD_HITS: usize = 2;

/// Topic labels. Declaration order is the tie-break order: when two
/// categories tie on hit count, the earlier one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Technology,
    Business,
    World,
    Politics,
    Science,
    Health,
    Sports,
    Entertainment,
    General,
}

impl Category {
    /// The eight scored categories; General is the fallback and never scored.
    pub const SCORED: [Category; 8] = [
        Category::Technology,
        Category::Business,
        Category::World,
        Category::Politics,
        Category::Science,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
    ];

    pub const ALL: [Category; 9] = [
        Category::Technology,
        Category::Business,
        Category::World,
        Category::Politics,
        Category::Science,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Business => "Business",
            Category::World => "World",
            Category::Politics => "Politics",
            Category::Science => "Science",
            Category::Health => "Health",
            Category::Sports => "Sports",
            Category::Entertainment => "Entertainment",
            Category::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assign exactly one topic label to the given title + summary text.
pub fn categorize(text: &str) -> Category {
    let lower = text.to_lowercase();

    let mut best = Category::General;
    let mut best_hits = 0usize;
    for cat in Category::SCORED {
        let hits = CATEGORY_KEYWORDS
            .get(cat.as_str())
            .map(|kws| kws.iter().filter(|kw| lower.contains(kw.as_str())).count())
            .unwrap_or(0);
        if hits > best_hits {
            best_hits = hits;
            best = cat;
        }
    }

    if best_hits >= MIN_KEYWORD_HITS {
        best
    } else {
        Category::General
    }
}
