//! Sentence correction over a shared [`LanguageModel`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use self::candidates::CandidateGenerator;
use self::error::SpellerError;
use self::suggestion::Suggestion;
use self::worker::SentenceWorker;
use crate::constants::{DEFAULT_MAX_CANDIDATES, DEFAULT_MAX_EDIT_DISTANCE};
use crate::model::LanguageModel;
use crate::tokenizer::Tokenize;
use crate::types::{LogProb, Weight};

pub mod candidates;
/// Correction errors.
pub mod error;
pub mod keyboard;
pub mod suggestion;
mod worker;

/// Weights of the similarity terms that make up a suggestion's cost.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    /// per unit of Damerau-Levenshtein distance
    pub edit_distance: Weight,
    /// per unit of keyboard-weighted distance
    pub keyboard_distance: Weight,
    /// substitution cost between neighbouring keys, in keyboard distance units
    pub adjacent_key_cost: Weight,
    /// per nat of the word's unigram surprisal
    pub frequency: Weight,
}

impl SimilarityWeights {
    /// Edit distance dominates; neighbouring keys halve a substitution.
    pub const fn default() -> SimilarityWeights {
        SimilarityWeights {
            edit_distance: 1.0,
            keyboard_distance: 0.5,
            adjacent_key_cost: 0.5,
            frequency: 0.0,
        }
    }
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        SimilarityWeights::default()
    }
}

/// Candidate and lattice settings of a [`Speller`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellerConfig {
    /// Lattice width per word, the word itself included.
    pub max_candidates_per_word: usize,
    /// Largest Damerau-Levenshtein distance of a candidate.
    pub max_edit_distance: usize,
    /// Also consider replacing words that are in the vocabulary.
    pub real_word_correction_enabled: bool,
    /// How candidate weights are computed.
    pub similarity: SimilarityWeights,
    /// Log-probability charged per unit of suggestion weight when a word is
    /// replaced.
    pub edit_penalty: LogProb,
    /// Extra log-probability charged for replacing an in-vocabulary word.
    pub known_word_penalty: LogProb,
}

impl SpellerConfig {
    /// Five candidates within two edits; known words are left alone.
    pub const fn default() -> SpellerConfig {
        SpellerConfig {
            max_candidates_per_word: DEFAULT_MAX_CANDIDATES,
            max_edit_distance: DEFAULT_MAX_EDIT_DISTANCE,
            real_word_correction_enabled: false,
            similarity: SimilarityWeights::default(),
            edit_penalty: 2.0,
            known_word_penalty: 6.0,
        }
    }

    /// Reads a JSON config; missing fields take their defaults.
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<SpellerConfig, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}

impl Default for SpellerConfig {
    fn default() -> Self {
        SpellerConfig::default()
    }
}

/// Sentence corrector over a shared model. Cheap to share between threads;
/// every call works on its own lattice.
pub struct Speller {
    model: Arc<LanguageModel>,
    generator: CandidateGenerator,
    config: SpellerConfig,
}

impl Speller {
    /// Creates a speller. The candidate index is taken from `model` and
    /// shared with every other speller over it.
    pub fn new(model: Arc<LanguageModel>, config: SpellerConfig) -> Arc<Speller> {
        let generator = CandidateGenerator::new(model.clone(), &config);

        Arc::new(Speller {
            model,
            generator,
            config,
        })
    }

    /// The language model scoring the lattices.
    pub fn model(&self) -> &Arc<LanguageModel> {
        &self.model
    }

    /// Settings this speller was created with.
    pub fn config(&self) -> &SpellerConfig {
        &self.config
    }

    pub(crate) fn generator(&self) -> &CandidateGenerator {
        &self.generator
    }

    /// Ranked replacement candidates for a single word.
    pub fn candidates(&self, word: &str) -> Vec<Suggestion> {
        self.generator
            .generate(word, self.config.real_word_correction_enabled)
    }

    /// Corrects each sentence of `text` independently. Everything that is not
    /// a replaced word is copied through unchanged.
    pub fn correct(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());

        for sentence in text.sentences() {
            out.push_str(&SentenceWorker::new(self, sentence).correct());
        }

        out
    }

    /// [`Speller::correct`] over raw bytes, which must be UTF-8.
    pub fn correct_bytes(&self, bytes: &[u8]) -> Result<String, SpellerError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(self.correct(text))
    }

    /// Candidates for the word at `position` (counting words and numbers only)
    /// ranked by the log-probability of the sentence with that candidate
    /// substituted, best first.
    pub fn suggest_in_context(&self, sentence: &str, position: usize) -> Vec<(Suggestion, LogProb)> {
        let mut words = sentence.lexical_words();
        let word = match words.get(position) {
            Some(w) => w.clone(),
            None => return vec![],
        };

        let mut ranked = self
            .generator
            .generate(&word, true)
            .into_iter()
            .map(|suggestion| {
                words[position] = suggestion.value.clone();
                let score = self.model.sentence_score(&words);
                (suggestion, score)
            })
            .collect::<Vec<_>>();

        ranked.sort_by(|(a, x), (b, y)| {
            y.partial_cmp(x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });

        ranked
    }
}
