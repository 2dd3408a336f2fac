//! Vocabulary candidates for a single word.
//!
//! Every vocabulary word is indexed under all strings reachable from it by
//! deleting up to `max_edit_distance` characters. Deleting from the input in
//! the same way and intersecting gives a superset of the words within range,
//! which is then narrowed by the true Damerau-Levenshtein distance.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use smol_str::SmolStr;

use super::keyboard::keyboard_distance;
use super::suggestion::Suggestion;
use super::{SimilarityWeights, SpellerConfig};
use crate::constants::DEFAULT_MAX_EDIT_DISTANCE;
use crate::hash::city_hash64;
use crate::model::LanguageModel;
use crate::tokenizer::{normalize_word, TokenKind};
use crate::types::{Weight, WordId};

/// Words longer than this are neither indexed nor searched; their delete sets
/// grow quadratically.
const MAX_INDEXED_CHARS: usize = 40;

fn delete_keys(word: &str, max_distance: usize) -> HashSet<u64> {
    let mut keys = HashSet::new();
    keys.insert(city_hash64(word.as_bytes()));

    let mut frontier = vec![word.to_string()];
    for _ in 0..max_distance {
        let mut next = vec![];

        for w in frontier.iter() {
            for (i, ch) in w.char_indices() {
                let mut deleted = String::with_capacity(w.len());
                deleted.push_str(&w[..i]);
                deleted.push_str(&w[i + ch.len_utf8()..]);

                if keys.insert(city_hash64(deleted.as_bytes())) {
                    next.push(deleted);
                }
            }
        }

        frontier = next;
    }

    keys
}

/// Vocabulary ids under the city hash of every string reachable from the
/// word by up to `max_distance` deletions. An index built for some distance
/// also answers queries for any smaller one.
#[derive(Debug)]
pub struct DeleteIndex {
    deletes: HashMap<u64, Vec<WordId>>,
    max_distance: usize,
}

impl DeleteIndex {
    /// Indexes every alphabetic word of `vocabulary`; ids are positions in it.
    pub fn build(vocabulary: &[SmolStr], max_distance: usize) -> DeleteIndex {
        let mut deletes: HashMap<u64, Vec<WordId>> = HashMap::new();

        for (id, word) in vocabulary.iter().enumerate() {
            if TokenKind::of(word) != TokenKind::Word || word.chars().count() > MAX_INDEXED_CHARS {
                continue;
            }

            for key in delete_keys(word, max_distance) {
                deletes.entry(key).or_insert_with(Vec::new).push(id as WordId);
            }
        }

        log::debug!(
            "candidate index: {} delete keys over {} words, distance {}",
            deletes.len(),
            vocabulary.len(),
            max_distance
        );

        DeleteIndex {
            deletes,
            max_distance,
        }
    }

    /// Largest edit distance this index can answer.
    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    #[inline]
    fn get(&self, key: u64) -> &[WordId] {
        self.deletes.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Ranked vocabulary candidates for single words.
pub struct CandidateGenerator {
    model: Arc<LanguageModel>,
    index: Arc<DeleteIndex>,
    max_distance: usize,
    max_candidates: usize,
    weights: SimilarityWeights,
}

impl CandidateGenerator {
    /// Uses the model's shared index when `config` stays within the default
    /// edit distance, and builds a private one otherwise.
    pub fn new(model: Arc<LanguageModel>, config: &SpellerConfig) -> CandidateGenerator {
        let max_distance = config.max_edit_distance;
        let index = if max_distance <= DEFAULT_MAX_EDIT_DISTANCE {
            model.delete_index()
        } else {
            Arc::new(DeleteIndex::build(model.vocabulary(), max_distance))
        };

        CandidateGenerator {
            model,
            index,
            max_distance,
            max_candidates: config.max_candidates_per_word.max(1),
            weights: config.similarity,
        }
    }

    pub(crate) fn index(&self) -> &Arc<DeleteIndex> {
        &self.index
    }

    /// Upper bound on the length of [`CandidateGenerator::generate`] results.
    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    fn weigh(&self, input: &str, word: &str, distance: usize, frequency: u64) -> Weight {
        let w = &self.weights;
        let mut weight = w.edit_distance * distance as Weight;

        if w.keyboard_distance != 0.0 {
            weight += w.keyboard_distance * keyboard_distance(input, word, w.adjacent_key_cost);
        }

        if w.frequency != 0.0 && frequency > 0 {
            let total = self.model.total_words().max(frequency) as f64;
            weight += w.frequency * (total / frequency as f64).ln() as Weight;
        }

        weight
    }

    /// Vocabulary words within range of `input`, excluding `input` itself.
    fn neighbours(&self, input: &str) -> Vec<Suggestion> {
        let len = input.chars().count();
        if len == 0 || len > MAX_INDEXED_CHARS {
            return vec![];
        }

        let mut seen = HashSet::new();
        let mut found = vec![];

        for key in delete_keys(input, self.max_distance) {
            for &id in self.index.get(key) {
                if !seen.insert(id) {
                    continue;
                }

                let word = match self.model.word(id) {
                    Some(w) if w != input => w,
                    _ => continue,
                };

                let distance = strsim::damerau_levenshtein(input, word);
                if distance > self.max_distance {
                    continue;
                }

                let frequency = self.model.frequency_of(id);
                found.push(Suggestion::new(
                    SmolStr::new(word),
                    self.weigh(input, word, distance, frequency),
                    distance,
                    frequency,
                ));
            }
        }

        found
    }

    /// Up to `max_candidates` suggestions, best first. A known word always
    /// comes first; other words are only offered for it when `real_word` is
    /// set.
    pub fn generate(&self, word: &str, real_word: bool) -> Vec<Suggestion> {
        let input = normalize_word(word);
        if input.is_empty() {
            return vec![];
        }

        let known = self.model.word_id(&input);
        let mut out = Vec::with_capacity(self.max_candidates);

        if let Some(id) = known {
            out.push(Suggestion::new(input.clone(), 0.0, 0, self.model.frequency_of(id)));
            if !real_word {
                return out;
            }
        }

        if TokenKind::of(&input) != TokenKind::Word {
            return out;
        }

        let mut neighbours = self.neighbours(&input);
        neighbours.sort();
        neighbours.truncate(self.max_candidates - out.len());
        out.extend(neighbours);

        log::trace!("{} candidates for {:?}", out.len(), input);
        out
    }
}
