//! Build and scoring settings.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF, DEFAULT_FALSE_POSITIVE_RATE, DEFAULT_UNKNOWN_WORD_FLOOR, NGRAM_ORDER,
};
use crate::types::KeyVerification;

/// Back-off parameters. They are written into the model header so a reloaded
/// model scores exactly like the one that was saved.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score of a word with no trained statistics at all.
    pub unknown_word_floor_log_probability: f64,
    /// Multiplier applied when a trigram is missing and the bigram is used.
    pub bigram_backoff: f64,
    /// Multiplier applied when a bigram is missing and the unigram is used.
    pub unigram_backoff: f64,
}

impl ScoringConfig {
    /// Stupid-backoff discounts of 0.4 and a floor of -25.
    pub const fn default() -> ScoringConfig {
        ScoringConfig {
            unknown_word_floor_log_probability: DEFAULT_UNKNOWN_WORD_FLOOR,
            bigram_backoff: DEFAULT_BACKOFF,
            unigram_backoff: DEFAULT_BACKOFF,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig::default()
    }
}

/// Settings for compacting raw counts into a [`LanguageModel`](super::LanguageModel).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Target false-positive rate of the membership filter.
    pub bloom_false_positive_rate: f64,
    /// Must be 3.
    pub ngram_order: u8,
    /// How slots are confirmed after the filter.
    pub verification: KeyVerification,
    /// Back-off parameters stored with the model.
    pub scoring: ScoringConfig,
}

impl ModelConfig {
    /// Trigrams, full-key verification and a 0.1% filter.
    pub const fn default() -> ModelConfig {
        ModelConfig {
            bloom_false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            ngram_order: NGRAM_ORDER,
            verification: KeyVerification::FullKey,
            scoring: ScoringConfig::default(),
        }
    }

    /// Reads a JSON config; missing fields take their defaults.
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<ModelConfig, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::default()
    }
}
