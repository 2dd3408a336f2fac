//! Raw n-gram statistics collected before compaction.

use std::borrow::Borrow;

use hashbrown::HashMap;
use smol_str::SmolStr;

use crate::tokenizer::{normalize_word, Tokenize};
use crate::types::Count;

/// Occurrence counts of normalized 1-, 2- and 3-grams.
#[derive(Debug, Clone, Default)]
pub struct NgramCounts {
    pub(crate) unigrams: HashMap<SmolStr, Count>,
    pub(crate) bigrams: HashMap<[SmolStr; 2], Count>,
    pub(crate) trigrams: HashMap<[SmolStr; 3], Count>,
}

#[inline(always)]
fn bump<K: std::hash::Hash + Eq>(map: &mut HashMap<K, Count>, key: K, count: Count) {
    let entry = map.entry(key).or_insert(0);
    *entry = entry.saturating_add(count);
}

impl NgramCounts {
    /// Empty statistics.
    pub fn new() -> NgramCounts {
        NgramCounts::default()
    }

    /// Counts every 1-, 2- and 3-gram of one sentence.
    pub fn add_sentence<S: Borrow<str>>(&mut self, words: &[S]) {
        let words = words
            .iter()
            .map(|w| normalize_word(Borrow::<str>::borrow(w)))
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>();

        for (i, word) in words.iter().enumerate() {
            bump(&mut self.unigrams, word.clone(), 1);

            if i >= 1 {
                bump(&mut self.bigrams, [words[i - 1].clone(), word.clone()], 1);
            }

            if i >= 2 {
                bump(
                    &mut self.trigrams,
                    [words[i - 2].clone(), words[i - 1].clone(), word.clone()],
                    1,
                );
            }
        }
    }

    /// Splits `text` into sentences and counts each one.
    pub fn add_text(&mut self, text: &str) {
        for sentence in text.sentences() {
            let words = sentence.lexical_words();
            if !words.is_empty() {
                self.add_sentence(&words);
            }
        }
    }

    /// Adds a pre-computed count for a 1 to 3 word n-gram. Other lengths are
    /// ignored.
    pub fn add_ngram<S: Borrow<str>>(&mut self, words: &[S], count: Count) {
        let mut words = words.iter().map(|w| normalize_word(Borrow::<str>::borrow(w)));

        match (words.next(), words.next(), words.next(), words.next()) {
            (Some(a), None, None, None) => bump(&mut self.unigrams, a, count),
            (Some(a), Some(b), None, None) => bump(&mut self.bigrams, [a, b], count),
            (Some(a), Some(b), Some(c), None) => bump(&mut self.trigrams, [a, b, c], count),
            _ => log::debug!("ignoring n-gram of unsupported length"),
        }
    }

    /// Count of a normalized word.
    pub fn unigram(&self, word: &str) -> Count {
        self.unigrams.get(word).copied().unwrap_or(0)
    }

    /// Count of a normalized word pair.
    pub fn bigram(&self, a: &str, b: &str) -> Count {
        self.bigrams
            .get(&[SmolStr::new(a), SmolStr::new(b)])
            .copied()
            .unwrap_or(0)
    }

    /// Count of a normalized word triple.
    pub fn trigram(&self, a: &str, b: &str, c: &str) -> Count {
        self.trigrams
            .get(&[SmolStr::new(a), SmolStr::new(b), SmolStr::new(c)])
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct n-grams of all orders.
    pub fn len(&self) -> usize {
        self.unigrams.len() + self.bigrams.len() + self.trigrams.len()
    }

    /// Whether nothing has been counted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_counts() {
        let mut counts = NgramCounts::new();
        counts.add_sentence(&["The", "cat", "sat"]);
        counts.add_sentence(&["the", "cat"]);

        assert_eq!(counts.unigram("the"), 2);
        assert_eq!(counts.bigram("the", "cat"), 2);
        assert_eq!(counts.bigram("cat", "sat"), 1);
        assert_eq!(counts.trigram("the", "cat", "sat"), 1);
        assert_eq!(counts.len(), 3 + 2 + 1);
    }

    #[test]
    fn owned_word_lists() {
        let mut counts = NgramCounts::new();
        counts.add_sentence(&vec![SmolStr::new("Dog"), SmolStr::new("ran")]);
        counts.add_sentence(&vec![String::from("dog"), String::from("sat")]);
        counts.add_ngram(&[SmolStr::new("dog"), SmolStr::new("ran")], 3);

        assert_eq!(counts.unigram("dog"), 2);
        assert_eq!(counts.bigram("dog", "ran"), 4);
        assert_eq!(counts.bigram("dog", "sat"), 1);
    }

    #[test]
    fn text_respects_sentence_bounds() {
        let mut counts = NgramCounts::new();
        counts.add_text("I have a problem. Hello, world!");

        assert_eq!(counts.bigram("problem", "hello"), 0);
        assert_eq!(counts.bigram("hello", "world"), 1);
        assert_eq!(counts.trigram("i", "have", "a"), 1);
    }

    #[test]
    fn injected_counts_saturate() {
        let mut counts = NgramCounts::new();
        counts.add_ngram(&["word"], u64::MAX - 1);
        counts.add_ngram(&["word"], 5);
        counts.add_ngram(&["a", "b", "c", "d"], 1);

        assert_eq!(counts.unigram("word"), u64::MAX);
        assert_eq!(counts.len(), 1);
    }
}
