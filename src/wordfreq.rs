//! Word frequencies over negative review text.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// English stop words, plus words that say nothing about a restaurant review.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "cannot", "com", "could", "couldn", "did", "didn", "do", "does",
    "doesn", "doing", "don", "down", "during", "each", "else", "ever", "few", "for", "from",
    "further", "get", "had", "hadn", "has", "hasn", "have", "haven", "having", "he", "hed", "hell",
    "her", "here", "heres", "hers", "herself", "hes", "him", "himself", "his", "how", "hows",
    "however", "http", "id", "if", "ill", "im", "in", "into", "is", "isn", "it", "its", "itself",
    "ive", "just", "k", "let", "lets", "like", "me", "more", "most", "mustn", "my", "myself", "no",
    "nor", "not", "of", "off", "on", "once", "only", "or", "other", "otherwise", "ought", "our",
    "ours", "ourselves", "out", "over", "own", "r", "same", "shall", "shan", "she", "shed",
    "shell", "shes", "should", "shouldn", "since", "so", "some", "such", "than", "that", "thats",
    "the", "their", "theirs", "them", "themselves", "then", "there", "theres", "therefore",
    "these", "they", "theyd", "theyll", "theyre", "theyve", "this", "those", "through", "to",
    "too", "under", "until", "up", "very", "was", "wasn", "we", "wed", "well", "were", "weren",
    "weve", "what", "whats", "when", "whens", "where", "wheres", "which", "while", "who", "whom",
    "whos", "why", "whys", "with", "won", "would", "wouldn", "www", "you", "youd", "youll",
    "your", "youre", "yours", "yourself", "yourselves", "youve", "restaurant", "place", "food",
];

pub const MAX_WORDS: usize = 100;
pub const MAX_FONT_PX: f64 = 90.0;
pub const MIN_FONT_PX: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordWeight {
    pub word: String,
    pub count: usize,
    pub font_px: f64,
}

fn non_letters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-ZÀ-ÿ\s]").expect("static regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Lower-cases, drops everything but letters and whitespace, and collapses
/// whitespace runs to one space.
pub fn normalize<'a, I>(texts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = texts.into_iter().collect::<Vec<_>>().join(" ").to_lowercase();
    let letters = non_letters().replace_all(&joined, "");
    whitespace().replace_all(&letters, " ").trim().to_string()
}

/// Raw counts of words with at least two letters that are not stop words.
pub fn count_words(normalized: &str) -> BTreeMap<String, usize> {
    let stop: HashSet<&str> = STOPWORDS.iter().copied().collect();
    let mut counts = BTreeMap::new();
    for word in normalized.split(' ') {
        if word.chars().count() < 2 || stop.contains(word) {
            continue;
        }
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Folds `words` into `word` when both forms occur.
pub fn fold_plurals(counts: BTreeMap<String, usize>) -> BTreeMap<String, usize> {
    let mut folded = counts.clone();
    for (word, n) in &counts {
        if word.ends_with("ss") || word.chars().count() < 3 {
            continue;
        }
        if let Some(singular) = word.strip_suffix('s') {
            if counts.contains_key(singular) {
                folded.remove(word);
                *folded.entry(singular.to_string()).or_insert(0) += n;
            }
        }
    }
    folded
}

/// The `limit` most frequent words, most frequent first, ties alphabetical,
/// with font sizes proportional to count.
pub fn top_words(counts: &BTreeMap<String, usize>, limit: usize) -> Vec<WordWeight> {
    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(limit);
    let max = ranked.first().map(|(_, n)| **n).unwrap_or(1).max(1) as f64;
    ranked
        .into_iter()
        .map(|(word, n)| WordWeight {
            word: word.clone(),
            count: *n,
            font_px: (MIN_FONT_PX + (MAX_FONT_PX - MIN_FONT_PX) * (*n as f64 / max)).round(),
        })
        .collect()
}

pub fn word_cloud<'a, I>(texts: I) -> Vec<WordWeight>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized = normalize(texts);
    top_words(&fold_plurals(count_words(&normalized)), MAX_WORDS)
}
