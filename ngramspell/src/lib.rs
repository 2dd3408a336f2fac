/*! Context-aware spelling correction with a compact trigram language model.

Raw 1-, 2- and 3-gram counts are compacted into an immutable
[`LanguageModel`]: a minimal perfect hash addresses a dense array of
packed counts, and a bloom filter rejects unknown n-grams before they reach
it. Correction generates vocabulary candidates for each word and picks the
combination that makes the whole sentence most probable.

# Usage examples

```
use ngramspell::model::ModelConfig;

let corpus = vec!["I have a problem.", "I have a cat.", "the cat sat on the mat."];
let model = ngramspell::train(corpus, &ModelConfig::default()).unwrap();

assert_eq!(ngramspell::correct("I hvae a problm", &model), "I have a problem");
assert_eq!(ngramspell::candidates("teh", &model)[0].value(), "the");
```

The candidate index is built once per model, on first use, and shared by
every [`Speller`] over that model. A [`Speller`] itself is cheap and can be
shared across threads.

[`LanguageModel`]: crate::model::LanguageModel
[`Speller`]: crate::speller::Speller
*/

#![warn(missing_docs)]

use std::path::Path;
use std::sync::Arc;

pub mod hash;
pub mod model;
pub mod speller;
pub mod tokenizer;
pub mod types;
pub mod vfs;

pub(crate) mod constants;

pub use crate::model::train;

use crate::model::error::ModelError;
use crate::model::LanguageModel;
use crate::speller::suggestion::Suggestion;
use crate::speller::{Speller, SpellerConfig};

/// Memory-maps and validates a model file.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Arc<LanguageModel>, ModelError> {
    LanguageModel::open(path).map(Arc::new)
}

/// Corrects `sentence` with default settings. The model's candidate index
/// is built by the first call and reused afterwards.
pub fn correct(sentence: &str, model: &Arc<LanguageModel>) -> String {
    Speller::new(model.clone(), SpellerConfig::default()).correct(sentence)
}

/// Ranked candidates for a single word with default settings.
pub fn candidates(word: &str, model: &Arc<LanguageModel>) -> Vec<Suggestion> {
    Speller::new(model.clone(), SpellerConfig::default()).candidates(word)
}
