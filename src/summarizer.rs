// src/summarizer.rs
//! Extractive summarizer: pick the highest-signal sentence(s) out of a
//! title + snippet block. Deterministic by construction; identical input
//! always yields byte-identical output. No external calls, no randomness.

use once_cell::sync::Lazy;

use crate::ingest::clean_text;

/// Domain-signal terms (announcement/discovery/report verbs and nouns).
/// Versioned data, kept out of the algorithm so it can be tuned on its own.
static SIGNAL_KEYWORDS: Lazy<Vec<String>> = Lazy::new(|| {
    let raw = include_str!("../summary_keywords.json");
    serde_json::from_str::<Vec<String>>(raw).expect("valid summary keyword list")
});

pub const DEFAULT_MAX_LEN: usize = 150;

/// Inputs longer than this are cut before sentence scoring.
const INPUT_CAP_CHARS: usize = 1000;
/// Fragments at or below this length (list bullets, captions) are discarded.
const MIN_SENTENCE_CHARS: usize = 10;
/// The "readable band": neither a fragment nor a run-on.
const READABLE_MIN_CHARS: usize = 50;
const READABLE_MAX_CHARS: usize = 200;

const KEYWORD_SCORE: i32 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct Summarizer;

impl Summarizer {
    pub fn new() -> Self {
        Self
    }

    /// Single-sentence synopsis: the top-scoring sentence, ties broken by
    /// original order (first occurrence wins).
    pub fn summarize(&self, text: &str, max_len: usize) -> String {
        let clean = prepared_text(text);
        let sentences = split_sentences(&clean);
        if sentences.is_empty() {
            return truncate_raw(&clean, max_len);
        }

        let scores = score_all(&sentences);
        let mut best = 0usize;
        for (i, &s) in scores.iter().enumerate() {
            if s > scores[best] {
                best = i;
            }
        }
        truncate_with_ellipsis(sentences[best], max_len)
    }

    /// Two-sentence synopsis: the top two distinct sentences by score
    /// (ties by original order), re-joined in original order with ". "
    /// and a trailing period.
    pub fn summarize_two(&self, text: &str, max_len: usize) -> String {
        let clean = prepared_text(text);
        let sentences = split_sentences(&clean);
        if sentences.is_empty() {
            return truncate_raw(&clean, max_len);
        }

        let scores = score_all(&sentences);
        let mut order: Vec<usize> = (0..sentences.len()).collect();
        order.sort_by(|&a, &b| scores[b].cmp(&scores[a]).then(a.cmp(&b)));

        let mut picked: Vec<usize> = order.into_iter().take(2).collect();
        picked.sort_unstable();

        let joined = picked
            .iter()
            .map(|&i| sentences[i])
            .collect::<Vec<_>>()
            .join(". ")
            + ".";
        truncate_with_ellipsis(&joined, max_len)
    }
}

/// Strip markup, then cap the input so scoring stays cheap on huge bodies.
fn prepared_text(text: &str) -> String {
    let clean = clean_text(text);
    if clean.chars().count() > INPUT_CAP_CHARS {
        clean.chars().take(INPUT_CAP_CHARS).collect()
    } else {
        clean
    }
}

/// Split on sentence-terminal punctuation; discard short fragments.
fn split_sentences(clean: &str) -> Vec<&str> {
    clean
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

fn score_all(sentences: &[&str]) -> Vec<i32> {
    sentences
        .iter()
        .enumerate()
        .map(|(i, s)| score_sentence(s, i == 0))
        .collect()
}

fn score_sentence(sentence: &str, is_first: bool) -> i32 {
    let lower = sentence.to_lowercase();
    let mut score = 0;

    for kw in SIGNAL_KEYWORDS.iter() {
        if lower.contains(kw.as_str()) {
            score += KEYWORD_SCORE;
        }
    }

    let len = sentence.chars().count();
    if len > READABLE_MIN_CHARS && len < READABLE_MAX_CHARS {
        score += 1;
    }
    if is_first {
        score += 1;
    }
    score
}

fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

/// Fallback when no sentence survives: raw truncation of the cleaned text.
fn truncate_raw(clean: &str, max_len: usize) -> String {
    if clean.chars().count() > max_len {
        let cut: String = clean.chars().take(max_len).collect();
        format!("{cut}...")
    } else {
        clean.to_string()
    }
}
