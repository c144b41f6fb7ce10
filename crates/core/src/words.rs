//! Word-frequency statistics over review text.
//!
//! A word is a maximal run of alphanumeric characters and apostrophes,
//! lowercased, with leading and trailing apostrophes stripped. The
//! `PostgreSQL` store mirrors these rules in SQL so both stores agree.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How often a word occurs across all review texts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

impl WordCount {
    #[must_use]
    pub fn new(word: impl Into<String>, count: u64) -> Self {
        Self {
            word: word.into(),
            count,
        }
    }
}

/// Split review text into normalized words.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Count every distinct word across `texts`. The result is unordered.
pub fn count_words<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<WordCount> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for text in texts {
        for word in tokenize(text) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect()
}

/// Order by count descending, then word ascending.
fn by_rank(a: &WordCount, b: &WordCount) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word))
}

/// Sort counts into rank order and keep at most `limit` entries.
#[must_use]
pub fn top_words(mut counts: Vec<WordCount>, limit: usize) -> Vec<WordCount> {
    counts.sort_unstable_by(by_rank);
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits_on_punctuation() {
        let words: Vec<String> = tokenize("Great product, GREAT price!").collect();
        assert_eq!(words, vec!["great", "product", "great", "price"]);
    }

    #[test]
    fn test_tokenize_keeps_inner_apostrophes() {
        let words: Vec<String> = tokenize("I don't like 'quoted' words").collect();
        assert_eq!(words, vec!["i", "don't", "like", "quoted", "words"]);
    }

    #[test]
    fn test_tokenize_drops_empty_tokens() {
        assert_eq!(tokenize("  ... ''  --").count(), 0);
        assert_eq!(tokenize("").count(), 0);
    }

    #[test]
    fn test_tokenize_handles_html_breaks() {
        let words: Vec<String> = tokenize("tasty<br /><br />snack").collect();
        assert_eq!(words, vec!["tasty", "br", "br", "snack"]);
    }

    #[test]
    fn test_count_words_across_texts() {
        let counts = top_words(count_words(["great product", "great service"]), 10);

        assert_eq!(counts.first(), Some(&WordCount::new("great", 2)));
        assert!(counts.contains(&WordCount::new("product", 1)));
        assert!(counts.contains(&WordCount::new("service", 1)));
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_top_words_orders_by_count_then_word() {
        let counts = vec![
            WordCount::new("zeta", 2),
            WordCount::new("alpha", 1),
            WordCount::new("beta", 2),
            WordCount::new("gamma", 5),
        ];

        let ranked = top_words(counts, 10);
        let words: Vec<&str> = ranked.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["gamma", "beta", "zeta", "alpha"]);
    }

    #[test]
    fn test_top_words_truncates() {
        let counts = count_words(["a b c d e f"]);
        assert_eq!(top_words(counts.clone(), 0).len(), 0);
        assert_eq!(top_words(counts.clone(), 4).len(), 4);
        assert_eq!(top_words(counts, 100).len(), 6);
    }
}
