//! Suggestion for a spelling correction.
use crate::types::{Count, Weight};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::cmp::Ordering::Equal;

/// Suggestion for a spelling correction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Suggestion {
    /// the suggested word-form, normalized
    pub value: SmolStr,
    /// similarity cost of the word-form; lower is closer
    pub weight: Weight,
    /// Damerau-Levenshtein distance from the input
    pub distance: usize,
    /// unigram count of the word-form in the model
    pub frequency: Count,
}

impl Suggestion {
    /// creates a spelling correction suggestion
    pub fn new(value: SmolStr, weight: Weight, distance: usize, frequency: Count) -> Suggestion {
        Suggestion {
            value,
            weight,
            distance,
            frequency,
        }
    }

    /// gets the suggested word-form
    pub fn value(&self) -> &str {
        &self.value
    }

    /// gets the similarity cost of the suggestion
    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// gets the edit distance from the input
    pub fn distance(&self) -> usize {
        self.distance
    }

    /// gets the unigram count of the word-form
    pub fn frequency(&self) -> Count {
        self.frequency
    }
}

impl PartialOrd for Suggestion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lowest weight first, then shortest distance, then most frequent, then
/// lexicographic.
impl Ord for Suggestion {
    fn cmp(&self, other: &Self) -> Ordering {
        let x = self.weight.partial_cmp(&other.weight).unwrap_or(Equal);

        x.then_with(|| self.distance.cmp(&other.distance))
            .then_with(|| other.frequency.cmp(&self.frequency))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialEq for Suggestion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Equal
    }
}

impl Eq for Suggestion {}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str, weight: Weight, distance: usize, frequency: Count) -> Suggestion {
        Suggestion::new(value.into(), weight, distance, frequency)
    }

    #[test]
    fn ordering() {
        let mut list = vec![
            s("bat", 1.0, 1, 5),
            s("cat", 1.0, 1, 50),
            s("at", 1.0, 1, 50),
            s("cart", 0.5, 1, 1),
            s("chat", 1.0, 2, 500),
        ];
        list.sort();

        let values = list.iter().map(Suggestion::value).collect::<Vec<_>>();
        assert_eq!(values, vec!["cart", "at", "cat", "bat", "chat"]);
    }
}
