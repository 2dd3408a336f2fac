//! Trigram language model over a minimal perfect hash.
//!
//! Every trained 1-, 2- and 3-gram is hashed to a 64-bit key. A single perfect
//! hash maps the keys to dense slots, and the packed counts live in a flat
//! array indexed by slot. A bloom filter rejects most unknown keys before the
//! slot is looked at, and the configured [`KeyVerification`] decides how a slot
//! is confirmed.

use std::borrow::Borrow;
use std::fmt;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hashbrown::HashMap;
use itertools::Itertools;
use smol_str::SmolStr;

use crate::constants::{CHECKSUM_SIZE, DEFAULT_MAX_EDIT_DISTANCE, NGRAM_ORDER};
use crate::hash::{city_hash64, hash_key, ngram_key};
use crate::speller::candidates::DeleteIndex;
use crate::tokenizer::{normalize_word, TokenKind};
use crate::types::{Count, KeyVerification, LogProb, NgramKey, SlotIndex, WordId};
use crate::vfs::{self, Filesystem};

mod bloom;
mod codec;
mod config;
mod counts;
/// Build and load errors.
pub mod error;
mod header;
mod packing;
mod perfect_hash;

pub use self::bloom::BloomFilter;
pub use self::config::{ModelConfig, ScoringConfig};
pub use self::counts::NgramCounts;
use self::error::{BuildError, ModelError};
pub use self::header::ModelHeader;
pub use self::packing::{pack_count, unpack_count};
pub use self::perfect_hash::PerfectHash;

const FINGERPRINT_SEED: u64 = 0xf1_6e_12;

#[inline(always)]
fn fingerprint(key: NgramKey) -> u16 {
    (hash_key(key, FINGERPRINT_SEED) >> 48) as u16
}

#[derive(Clone)]
enum SlotVerification {
    FilterOnly,
    Fingerprint(Vec<u16>),
    FullKey(Vec<NgramKey>),
}

impl SlotVerification {
    fn mode(&self) -> KeyVerification {
        match self {
            SlotVerification::FilterOnly => KeyVerification::FilterOnly,
            SlotVerification::Fingerprint(_) => KeyVerification::Fingerprint,
            SlotVerification::FullKey(_) => KeyVerification::FullKey,
        }
    }

    #[inline(always)]
    fn confirms(&self, slot: SlotIndex, key: NgramKey) -> bool {
        match self {
            SlotVerification::FilterOnly => true,
            SlotVerification::Fingerprint(prints) => prints[slot] == fingerprint(key),
            SlotVerification::FullKey(keys) => keys[slot] == key,
        }
    }
}

/// Immutable n-gram store. Share it behind an [`Arc`]; every query is a pure
/// read.
#[derive(Clone)]
pub struct LanguageModel {
    vocabulary: Vec<SmolStr>,
    word_ids: HashMap<SmolStr, WordId>,
    alphabet: Vec<char>,
    hash: PerfectHash,
    filter: BloomFilter,
    counts: Vec<u16>,
    verification: SlotVerification,
    scoring: ScoringConfig,
    totals: [Count; 3],
    /// Built on first use by a candidate generator.
    delete_index: OnceLock<Arc<DeleteIndex>>,
}

impl fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageModel")
            .field("vocabulary", &self.vocabulary.len())
            .field("ngrams", &self.hash.len())
            .field("verification", &self.verification.mode())
            .field("scoring", &self.scoring)
            .field("totals", &self.totals)
            .finish()
    }
}

impl LanguageModel {
    /// Compacts raw counts into a queryable model.
    pub fn build(counts: &NgramCounts, config: &ModelConfig) -> Result<LanguageModel, ModelError> {
        if config.ngram_order != NGRAM_ORDER {
            return Err(BuildError::UnsupportedOrder(config.ngram_order).into());
        }

        let vocabulary = counts
            .unigrams
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(word, _)| word.clone())
            .sorted()
            .collect::<Vec<_>>();

        if vocabulary.is_empty() {
            return Err(BuildError::EmptyKeySet.into());
        }
        if vocabulary.len() > WordId::MAX as usize {
            return Err(BuildError::TooManyWords(vocabulary.len()).into());
        }
        if let Some(word) = vocabulary.iter().find(|w| w.len() > u16::MAX as usize) {
            return Err(BuildError::WordTooLong(word.len()).into());
        }

        let word_ids = index_vocabulary(&vocabulary);
        let id = |w: &SmolStr| word_ids.get(w).copied();

        let mut entries: Vec<(NgramKey, Count)> = Vec::with_capacity(counts.len());
        let mut totals = [0 as Count; 3];
        let mut skipped = 0usize;

        for (word, &count) in counts.unigrams.iter().filter(|(_, c)| **c > 0) {
            if let Some(a) = id(word) {
                entries.push((ngram_key(&[a]), count));
                totals[0] = totals[0].saturating_add(count);
            }
        }

        for ([w1, w2], &count) in counts.bigrams.iter().filter(|(_, c)| **c > 0) {
            match (id(w1), id(w2)) {
                (Some(a), Some(b)) => {
                    entries.push((ngram_key(&[a, b]), count));
                    totals[1] = totals[1].saturating_add(count);
                }
                _ => skipped += 1,
            }
        }

        for ([w1, w2, w3], &count) in counts.trigrams.iter().filter(|(_, c)| **c > 0) {
            match (id(w1), id(w2), id(w3)) {
                (Some(a), Some(b), Some(c)) => {
                    entries.push((ngram_key(&[a, b, c]), count));
                    totals[2] = totals[2].saturating_add(count);
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("skipped {} n-grams containing words without unigram counts", skipped);
        }

        let keys = entries.iter().map(|(key, _)| *key).collect::<Vec<_>>();
        let filter = BloomFilter::build(&keys, config.bloom_false_positive_rate, keys.len())?;
        let hash = PerfectHash::build(&keys)?;

        let mut packed = vec![0u16; keys.len()];
        let mut stored_keys = match config.verification {
            KeyVerification::FilterOnly => vec![],
            _ => vec![0 as NgramKey; keys.len()],
        };

        for &(key, count) in entries.iter() {
            let slot = hash.lookup(key);
            packed[slot] = pack_count(count);
            if let Some(stored) = stored_keys.get_mut(slot) {
                *stored = key;
            }
        }

        let verification = match config.verification {
            KeyVerification::FilterOnly => SlotVerification::FilterOnly,
            KeyVerification::Fingerprint => {
                SlotVerification::Fingerprint(stored_keys.iter().map(|k| fingerprint(*k)).collect())
            }
            KeyVerification::FullKey => SlotVerification::FullKey(stored_keys),
        };

        log::debug!(
            "built model: {} words, {} n-grams, {} tokens",
            vocabulary.len(),
            keys.len(),
            totals[0]
        );

        Ok(LanguageModel::from_parts(
            vocabulary,
            hash,
            filter,
            packed,
            verification,
            config.scoring,
            totals,
        ))
    }

    fn from_parts(
        vocabulary: Vec<SmolStr>,
        hash: PerfectHash,
        filter: BloomFilter,
        counts: Vec<u16>,
        verification: SlotVerification,
        scoring: ScoringConfig,
        totals: [Count; 3],
    ) -> LanguageModel {
        let word_ids = index_vocabulary(&vocabulary);
        let alphabet = vocabulary
            .iter()
            .filter(|w| TokenKind::of(w) == TokenKind::Word)
            .flat_map(|w| w.chars())
            .sorted()
            .dedup()
            .collect();

        LanguageModel {
            vocabulary,
            word_ids,
            alphabet,
            hash,
            filter,
            counts,
            verification,
            scoring,
            totals,
            delete_index: OnceLock::new(),
        }
    }

    /// Replaces the back-off parameters used by [`LanguageModel::score`].
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> LanguageModel {
        self.scoring = scoring;
        self
    }

    /// Back-off parameters used for scoring.
    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// How slots are confirmed after the bloom filter.
    pub fn verification(&self) -> KeyVerification {
        self.verification.mode()
    }

    /// Sorted normalized words; a word's id is its index.
    pub fn vocabulary(&self) -> &[SmolStr] {
        &self.vocabulary
    }

    /// Number of distinct words.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Number of distinct trained n-grams of all orders.
    pub fn ngram_count(&self) -> usize {
        self.hash.len()
    }

    /// Number of word tokens the model was trained on.
    pub fn total_words(&self) -> Count {
        self.totals[0]
    }

    /// Sorted characters of all alphabetic vocabulary words.
    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    /// Id of an already normalized word.
    #[inline]
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.word_ids.get(word).copied()
    }

    /// Word with the given id.
    #[inline]
    pub fn word(&self, id: WordId) -> Option<&str> {
        self.vocabulary.get(id as usize).map(SmolStr::as_str)
    }

    /// Key of a word sequence, or `None` when a word is out of vocabulary.
    pub fn key<S: Borrow<str>>(&self, words: &[S]) -> Option<NgramKey> {
        if words.is_empty() || words.len() > NGRAM_ORDER as usize {
            return None;
        }

        let ids = words
            .iter()
            .map(|w| self.word_id(&normalize_word(Borrow::<str>::borrow(w))))
            .collect::<Option<Vec<_>>>()?;
        Some(ngram_key(&ids))
    }

    #[inline]
    fn slot(&self, key: NgramKey) -> Option<SlotIndex> {
        if !self.filter.contains(key) {
            return None;
        }

        let slot = self.hash.lookup(key);
        if self.verification.confirms(slot, key) {
            Some(slot)
        } else {
            None
        }
    }

    /// Whether `key` belongs to a trained n-gram.
    #[inline]
    pub fn trained(&self, key: NgramKey) -> bool {
        self.slot(key).is_some()
    }

    #[inline]
    fn count(&self, ids: &[WordId]) -> Count {
        self.slot(ngram_key(ids))
            .map(|slot| unpack_count(self.counts[slot]))
            .unwrap_or(0)
    }

    /// Unigram count of a normalized word.
    pub fn frequency(&self, word: &str) -> Count {
        self.word_id(word).map(|id| self.frequency_of(id)).unwrap_or(0)
    }

    /// Unigram count of the word with the given id.
    #[inline]
    pub fn frequency_of(&self, id: WordId) -> Count {
        self.count(&[id])
    }

    #[inline(always)]
    fn ratio(&self, ngram: &[WordId], history: &[WordId]) -> Option<f64> {
        let count = self.count(ngram);
        if count == 0 {
            return None;
        }

        let history = self.count(history);
        if history == 0 {
            return None;
        }

        Some((count as f64 / history as f64).min(1.0))
    }

    #[inline(always)]
    fn log(&self, p: f64) -> LogProb {
        p.ln().max(self.scoring.unknown_word_floor_log_probability)
    }

    /// Log-probability of `word` after up to two preceding words, backing off
    /// to shorter histories. Unknown words score the configured floor.
    pub fn score<S: Borrow<str>>(&self, word: &str, context: &[S]) -> LogProb {
        let word = self.word_id(&normalize_word(word));
        let context = context
            .iter()
            .map(|w| self.word_id(&normalize_word(Borrow::<str>::borrow(w))))
            .collect::<Vec<_>>();

        self.score_ids(word, &context)
    }

    /// [`LanguageModel::score`] over word ids; `None` marks an unknown word.
    pub fn score_ids(&self, word: Option<WordId>, context: &[Option<WordId>]) -> LogProb {
        let word = match word {
            Some(w) => w,
            None => return self.scoring.unknown_word_floor_log_probability,
        };

        let context = &context[context.len().saturating_sub(2)..];
        let mut discount = 1.0f64;

        if let [first, second] = context {
            if let (Some(a), Some(b)) = (first, second) {
                if let Some(p) = self.ratio(&[*a, *b, word], &[*a, *b]) {
                    return self.log(discount * p);
                }
            }
            discount *= self.scoring.bigram_backoff;
        }

        if let Some(prev) = context.last() {
            if let Some(b) = prev {
                if let Some(p) = self.ratio(&[*b, word], &[*b]) {
                    return self.log(discount * p);
                }
            }
            discount *= self.scoring.unigram_backoff;
        }

        let count = self.count(&[word]);
        if count > 0 && self.totals[0] > 0 {
            return self.log(discount * (count as f64 / self.totals[0] as f64).min(1.0));
        }

        self.scoring.unknown_word_floor_log_probability
    }

    /// Sum of [`LanguageModel::score`] over a word sequence.
    pub fn sentence_score<S: Borrow<str>>(&self, words: &[S]) -> LogProb {
        let ids = words
            .iter()
            .map(|w| self.word_id(&normalize_word(Borrow::<str>::borrow(w))))
            .collect::<Vec<_>>();

        (0..ids.len())
            .map(|i| self.score_ids(ids[i], &ids[i.saturating_sub(2)..i]))
            .sum()
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        ModelHeader::new(self.verification.mode(), self.scoring, self.totals).write(writer)?;

        writer.write_u32::<LittleEndian>(self.vocabulary.len() as u32)?;
        for word in self.vocabulary.iter() {
            writer.write_u16::<LittleEndian>(word.len() as u16)?;
            writer.write_all(word.as_bytes())?;
        }

        let hash = self.hash.to_bytes();
        writer.write_u64::<LittleEndian>(hash.len() as u64)?;
        writer.write_all(&hash)?;

        let filter = self.filter.to_bytes();
        writer.write_u64::<LittleEndian>(filter.len() as u64)?;
        writer.write_all(&filter)?;

        writer.write_u64::<LittleEndian>(self.counts.len() as u64)?;
        for count in self.counts.iter() {
            writer.write_u16::<LittleEndian>(*count)?;
        }

        match &self.verification {
            SlotVerification::FilterOnly => writer.write_u64::<LittleEndian>(0)?,
            SlotVerification::Fingerprint(prints) => {
                writer.write_u64::<LittleEndian>(prints.len() as u64)?;
                for print in prints.iter() {
                    writer.write_u16::<LittleEndian>(*print)?;
                }
            }
            SlotVerification::FullKey(keys) => {
                writer.write_u64::<LittleEndian>(keys.len() as u64)?;
                for key in keys.iter() {
                    writer.write_u64::<LittleEndian>(*key)?;
                }
            }
        }

        Ok(())
    }

    fn body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_body(&mut buf);
        buf
    }

    /// City hash of the serialized model, as stored at the end of the file.
    pub fn checksum(&self) -> u64 {
        city_hash64(&self.body())
    }

    /// Serialized model: header, sections and trailing checksum.
    pub fn save(&self) -> Vec<u8> {
        let mut buf = self.body();
        let checksum = city_hash64(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Writes [`LanguageModel::save`] output to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ModelError> {
        writer.write_all(&self.save()).map_err(ModelError::Io)
    }

    /// Writes the model next to `path` and renames it into place, so readers
    /// never observe a partial file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(ModelError::Io)?;
        self.write_to(&mut file)?;
        file.as_file().sync_all().map_err(ModelError::Io)?;
        file.persist(path).map_err(|e| ModelError::Io(e.error))?;
        Ok(())
    }

    /// Memory-maps and loads a model file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<LanguageModel, ModelError> {
        Self::open_with(&vfs::Fs, path)
    }

    /// Loads a model file through `fs`.
    pub fn open_with<FS, P>(fs: &FS, path: P) -> Result<LanguageModel, ModelError>
    where
        FS: Filesystem,
        P: AsRef<Path>,
    {
        use crate::vfs::File;

        let file = fs.open(path).map_err(ModelError::Io)?;
        let contents = file.contents().map_err(ModelError::Io)?;
        Self::load(&contents)
    }

    /// Shared candidate index at the default edit distance.
    pub(crate) fn delete_index(&self) -> Arc<DeleteIndex> {
        self.delete_index
            .get_or_init(|| Arc::new(DeleteIndex::build(&self.vocabulary, DEFAULT_MAX_EDIT_DISTANCE)))
            .clone()
    }

    /// Parses a serialized model. Nothing is returned unless every section
    /// validates.
    pub fn load(bytes: &[u8]) -> Result<LanguageModel, ModelError> {
        ModelHeader::check_preamble(bytes)?;
        if bytes.len() < ModelHeader::SIZE + CHECKSUM_SIZE {
            return Err(ModelError::corrupt("truncated model"));
        }

        let (body, tail) = bytes.split_at(bytes.len() - CHECKSUM_SIZE);
        let mut stored = [0u8; CHECKSUM_SIZE];
        stored.copy_from_slice(tail);
        if city_hash64(body) != u64::from_le_bytes(stored) {
            return Err(ModelError::corrupt("checksum mismatch"));
        }

        let mut rdr = Cursor::new(body);
        let header = ModelHeader::read(&mut rdr)?;

        let section = "vocabulary";
        let word_count = rdr
            .read_u32::<LittleEndian>()
            .map_err(ModelError::truncated(section))?;
        let word_count = codec::ensure_available(&rdr, u64::from(word_count), 2, section)?;
        if word_count == 0 {
            return Err(ModelError::corrupt("empty vocabulary"));
        }

        let mut vocabulary: Vec<SmolStr> = Vec::with_capacity(word_count);
        for _ in 0..word_count {
            let len = rdr
                .read_u16::<LittleEndian>()
                .map_err(ModelError::truncated(section))?;
            let len = codec::ensure_available(&rdr, u64::from(len), 1, section)?;
            let start = rdr.position() as usize;
            let word = std::str::from_utf8(&body[start..start + len])
                .map_err(|_| ModelError::corrupt("vocabulary word is not UTF-8"))?;
            rdr.set_position((start + len) as u64);

            if let Some(last) = vocabulary.last() {
                if last.as_str() >= word {
                    return Err(ModelError::corrupt("vocabulary is not sorted"));
                }
            }
            vocabulary.push(SmolStr::new(word));
        }

        let hash = PerfectHash::from_bytes(codec::read_section(&mut rdr, "perfect hash")?)?;
        let filter = BloomFilter::from_bytes(codec::read_section(&mut rdr, "bloom filter")?)?;

        let counts = codec::read_u16_vec(&mut rdr, "counts")?;
        if counts.len() != hash.len() {
            return Err(ModelError::corrupt(format!(
                "{} counts for {} keys",
                counts.len(),
                hash.len()
            )));
        }

        let verification = match header.verification {
            KeyVerification::FilterOnly => {
                let n = rdr
                    .read_u64::<LittleEndian>()
                    .map_err(ModelError::truncated("verification"))?;
                if n != 0 {
                    return Err(ModelError::corrupt("unexpected verification data"));
                }
                SlotVerification::FilterOnly
            }
            KeyVerification::Fingerprint => {
                SlotVerification::Fingerprint(codec::read_u16_vec(&mut rdr, "verification")?)
            }
            KeyVerification::FullKey => {
                SlotVerification::FullKey(codec::read_u64_vec(&mut rdr, "verification")?)
            }
        };

        let stored = match &verification {
            SlotVerification::FilterOnly => hash.len(),
            SlotVerification::Fingerprint(prints) => prints.len(),
            SlotVerification::FullKey(keys) => keys.len(),
        };
        if stored != hash.len() {
            return Err(ModelError::corrupt(format!(
                "{} verification entries for {} keys",
                stored,
                hash.len()
            )));
        }

        if codec::remaining(&rdr) != 0 {
            return Err(ModelError::corrupt("trailing bytes after model"));
        }

        let model = LanguageModel::from_parts(
            vocabulary,
            hash,
            filter,
            counts,
            verification,
            header.scoring,
            header.totals,
        );

        if let Some(id) = (0..model.vocabulary.len() as WordId).find(|id| !model.trained(ngram_key(&[*id]))) {
            return Err(ModelError::corrupt(format!(
                "vocabulary word {:?} has no unigram entry",
                model.vocabulary[id as usize]
            )));
        }

        log::debug!("loaded {:?}", model);
        Ok(model)
    }
}

fn index_vocabulary(vocabulary: &[SmolStr]) -> HashMap<SmolStr, WordId> {
    vocabulary
        .iter()
        .enumerate()
        .map(|(i, w)| (w.clone(), i as WordId))
        .collect()
}

/// Collects counts from a corpus and compacts them into a shared model.
pub fn train<I, S>(corpus: I, config: &ModelConfig) -> Result<Arc<LanguageModel>, ModelError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts = NgramCounts::new();
    for text in corpus {
        counts.add_text(text.as_ref());
    }

    LanguageModel::build(&counts, config).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FORMAT_VERSION;
    use crate::tokenizer::Tokenize;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn corpus() -> Vec<String> {
        let mut corpus = vec![];
        for _ in 0..20 {
            corpus.push("the cat sat on the mat.".to_string());
        }
        for _ in 0..10 {
            corpus.push("a cat sat.".to_string());
        }
        for _ in 0..5 {
            corpus.push("the dog ran.".to_string());
        }
        corpus
    }

    fn model_with(verification: KeyVerification) -> LanguageModel {
        let mut counts = NgramCounts::new();
        for text in corpus() {
            counts.add_text(&text);
        }

        let config = ModelConfig {
            verification,
            ..ModelConfig::default()
        };
        LanguageModel::build(&counts, &config).unwrap()
    }

    fn model() -> LanguageModel {
        model_with(KeyVerification::FullKey)
    }

    #[test]
    fn vocabulary_and_totals() {
        init();
        let model = model();

        assert_eq!(
            model.vocabulary(),
            &["a", "cat", "dog", "mat", "on", "ran", "sat", "the"]
        );
        assert_eq!(model.total_words(), 20 * 6 + 10 * 3 + 5 * 3);
        assert_eq!(model.frequency("cat"), 30);
        assert_eq!(model.frequency("unicorn"), 0);
        assert_eq!(model.alphabet().first(), Some(&'a'));
        assert!(model.alphabet().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn trained_keys() {
        for verification in [KeyVerification::FullKey, KeyVerification::Fingerprint] {
            let model = model_with(verification);

            assert!(model.trained(model.key(&["the", "cat", "sat"]).unwrap()));
            assert!(model.trained(model.key(&["cat", "sat"]).unwrap()));
            assert!(model.trained(model.key(&["dog"]).unwrap()));
            assert!(!model.trained(model.key(&["dog", "sat"]).unwrap()));
            assert!(!model.trained(model.key(&["mat", "the", "dog"]).unwrap()));
            assert!(model.key(&["unicorn"]).is_none());
        }
    }

    #[test]
    fn trigram_score() {
        let model = model();
        // the cat sat: 20 of 20 "the cat" continue with "sat"
        assert_eq!(model.score("sat", &["the", "cat"]), 0.0);
        // cat sat on: 20 of 30
        let expected = (20.0f64 / 30.0).ln();
        assert!((model.score("on", &["cat", "sat"]) - expected).abs() < 1e-12);
    }

    #[test]
    fn backoff_to_bigram() {
        let model = model();

        // "dog cat" never occurs, so neither does "dog cat sat"
        assert!(!model.trained(model.key(&["dog", "cat", "sat"]).unwrap()));
        assert!(model.trained(model.key(&["cat", "sat"]).unwrap()));

        let expected = (0.4f64 * (30.0 / 30.0)).ln();
        assert!((model.score("sat", &["dog", "cat"]) - expected).abs() < 1e-12);
        assert!(model.score("sat", &["dog", "cat"]) > model.scoring().unknown_word_floor_log_probability);
    }

    #[test]
    fn backoff_to_unigram() {
        let model = model();
        let total = model.total_words() as f64;

        let expected = (0.4f64 * 0.4 * (5.0 / total)).ln();
        assert!((model.score("dog", &["cat", "sat"]) - expected).abs() < 1e-12);

        let expected = (0.4f64 * (5.0 / total)).ln();
        assert!((model.score("dog", &["sat"]) - expected).abs() < 1e-12);

        let expected = (5.0f64 / total).ln();
        assert!((model.score::<&str>("dog", &[]) - expected).abs() < 1e-12);
    }

    #[test]
    fn unknown_words_score_the_floor() {
        let model = model();
        let floor = model.scoring().unknown_word_floor_log_probability;

        assert_eq!(model.score("unicorn", &["the"]), floor);
        // unknown context words only shorten the history
        let expected = (0.4f64 * 0.4 * (30.0 / model.total_words() as f64)).ln();
        assert!((model.score("cat", &["unicorn", "zebra"]) - expected).abs() < 1e-12);
    }

    #[test]
    fn sentence_score_sums_words() {
        let model = model();
        let words = ["the", "cat", "sat"];
        let expected = model.score::<&str>("the", &[])
            + model.score("cat", &["the"])
            + model.score("sat", &["the", "cat"]);

        assert_eq!(model.sentence_score(&words), expected);
        assert_eq!(model.sentence_score(&"The cat sat".lexical_words()), expected);
        assert!(model.sentence_score(&["the", "cat", "sat"]) > model.sentence_score(&["the", "sat", "cat"]));
    }

    #[test]
    fn save_load_scores_identically() {
        init();
        for verification in [
            KeyVerification::FullKey,
            KeyVerification::Fingerprint,
            KeyVerification::FilterOnly,
        ] {
            let model = model_with(verification);
            let restored = LanguageModel::load(&model.save()).unwrap();

            assert_eq!(restored.verification(), verification);
            assert_eq!(restored.vocabulary(), model.vocabulary());
            assert_eq!(restored.checksum(), model.checksum());

            let words = model.vocabulary().to_vec();
            for a in words.iter() {
                for b in words.iter() {
                    for c in words.iter() {
                        assert_eq!(
                            model.score(c, &[a.as_str(), b.as_str()]),
                            restored.score(c, &[a.as_str(), b.as_str()])
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");

        let model = model();
        model.save_to_path(&path).unwrap();
        let restored = LanguageModel::open(&path).unwrap();

        assert_eq!(restored.score("sat", &["a", "cat"]), model.score("sat", &["a", "cat"]));
        assert!(LanguageModel::open(dir.path().join("missing.bin")).is_err());
    }

    #[test]
    fn scoring_survives_reload() {
        let scoring = ScoringConfig {
            unknown_word_floor_log_probability: -30.0,
            bigram_backoff: 0.1,
            unigram_backoff: 0.2,
        };
        let model = model().with_scoring(scoring);
        let restored = LanguageModel::load(&model.save()).unwrap();

        assert_eq!(restored.scoring(), &scoring);
        assert_eq!(restored.score("unicorn", &["the"]), -30.0);
    }

    #[test]
    fn corrupt_input_is_rejected() {
        let bytes = model().save();

        assert!(matches!(LanguageModel::load(&[]), Err(ModelError::Corrupt(_))));
        assert!(matches!(
            LanguageModel::load(&bytes[..bytes.len() / 2]),
            Err(ModelError::Corrupt(_))
        ));

        let mut magic = bytes.clone();
        magic[1] = b'?';
        assert!(matches!(LanguageModel::load(&magic), Err(ModelError::Corrupt(_))));

        let mut flipped = bytes.clone();
        let mid = flipped.len() / 2;
        flipped[mid] ^= 0x40;
        match LanguageModel::load(&flipped) {
            Err(ModelError::Corrupt(msg)) => assert_eq!(msg, "checksum mismatch"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn size_mismatch_with_valid_checksum() {
        let model = model();
        let mut body = model.body();

        // drop the last verification key and fix up the declared length
        body.truncate(body.len() - 8);
        let len_pos = body.len() - model.ngram_count() * 8 + 8 - 8;
        let declared = (model.ngram_count() - 1) as u64;
        body[len_pos..len_pos + 8].copy_from_slice(&declared.to_le_bytes());
        let checksum = city_hash64(&body);
        body.extend_from_slice(&checksum.to_le_bytes());

        match LanguageModel::load(&body) {
            Err(ModelError::Corrupt(msg)) => assert!(msg.contains("verification"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn future_version_is_unsupported() {
        let mut bytes = model().save();
        bytes[8..12].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());

        match LanguageModel::load(&bytes) {
            Err(ModelError::UnsupportedVersion { found, supported }) => {
                assert_eq!(found, FORMAT_VERSION + 1);
                assert_eq!(supported, FORMAT_VERSION);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn build_errors() {
        assert!(matches!(
            LanguageModel::build(&NgramCounts::new(), &ModelConfig::default()),
            Err(ModelError::Build(BuildError::EmptyKeySet))
        ));

        let mut counts = NgramCounts::new();
        counts.add_sentence(&["word"]);

        let config = ModelConfig {
            ngram_order: 2,
            ..ModelConfig::default()
        };
        assert!(matches!(
            LanguageModel::build(&counts, &config),
            Err(ModelError::Build(BuildError::UnsupportedOrder(2)))
        ));

        let config = ModelConfig {
            bloom_false_positive_rate: 1.5,
            ..ModelConfig::default()
        };
        assert!(matches!(
            LanguageModel::build(&counts, &config),
            Err(ModelError::Build(BuildError::InvalidFalsePositiveRate(_)))
        ));
    }

    #[test]
    fn injected_ngrams_need_known_words() {
        let mut counts = NgramCounts::new();
        counts.add_ngram(&["good"], 10);
        counts.add_ngram(&["day"], 8);
        counts.add_ngram(&["good", "day"], 6);
        counts.add_ngram(&["good", "night"], 2);

        let model = LanguageModel::build(&counts, &ModelConfig::default()).unwrap();
        assert_eq!(model.ngram_count(), 3);
        assert!((model.score("day", &["good"]) - (0.6f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn train_from_corpus() {
        let model = train(corpus(), &ModelConfig::default()).unwrap();
        assert_eq!(model.vocabulary_size(), 8);
        assert_eq!(model.score("sat", &["the", "cat"]), 0.0);
    }
}
