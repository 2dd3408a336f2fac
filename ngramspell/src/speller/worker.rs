//! Per-sentence correction lattice.

use smol_str::SmolStr;

use super::Speller;
use crate::tokenizer::{Token, Tokenize};
use crate::types::{LogProb, WordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Tokenizing,
    CandidateExpansion,
    Scoring,
    Selection,
    Reconstruction,
    Done,
}

#[derive(Debug, Clone)]
struct Choice {
    id: Option<WordId>,
    /// Normalized replacement; `None` keeps the surface form.
    replacement: Option<SmolStr>,
    penalty: LogProb,
}

impl Choice {
    fn keep(id: Option<WordId>) -> Choice {
        Choice {
            id,
            replacement: None,
            penalty: 0.0,
        }
    }
}

#[derive(Debug)]
struct Position {
    token: usize,
    choices: Vec<Choice>,
}

/// Viterbi search over the candidates of one sentence. A state at position
/// `i` is the pair (choice at `i`, choice at `i - 1`), so each transition sees
/// a full trigram context.
pub(crate) struct SentenceWorker<'a> {
    speller: &'a Speller,
    sentence: &'a str,
    stage: Stage,
    tokens: Vec<Token<'a>>,
    positions: Vec<Position>,
    /// Best score per state, `scores[i][a * prev + b]`.
    scores: Vec<Vec<LogProb>>,
    /// Choice at `i - 2` on the best path into each state.
    backpointers: Vec<Vec<usize>>,
    path: Vec<usize>,
    output: String,
}

impl<'a> SentenceWorker<'a> {
    pub(crate) fn new(speller: &'a Speller, sentence: &'a str) -> SentenceWorker<'a> {
        SentenceWorker {
            speller,
            sentence,
            stage: Stage::Tokenizing,
            tokens: vec![],
            positions: vec![],
            scores: vec![],
            backpointers: vec![],
            path: vec![],
            output: String::with_capacity(sentence.len()),
        }
    }

    pub(crate) fn correct(mut self) -> String {
        while self.stage != Stage::Done {
            self.stage = self.step();
        }

        self.output
    }

    fn step(&mut self) -> Stage {
        match self.stage {
            Stage::Tokenizing => {
                self.tokens = self.sentence.tokens().collect();
                Stage::CandidateExpansion
            }
            Stage::CandidateExpansion => {
                self.expand();
                if self.positions.is_empty() {
                    Stage::Reconstruction
                } else {
                    Stage::Scoring
                }
            }
            Stage::Scoring => {
                self.score();
                Stage::Selection
            }
            Stage::Selection => {
                self.select();
                Stage::Reconstruction
            }
            Stage::Reconstruction => {
                self.reconstruct();
                Stage::Done
            }
            Stage::Done => Stage::Done,
        }
    }

    fn expand(&mut self) {
        let speller = self.speller;
        let model = speller.model();
        let config = speller.config();
        let generator = speller.generator();
        let limit = generator.max_candidates();

        for (index, token) in self.tokens.iter().enumerate() {
            if !token.is_lexical() {
                continue;
            }

            let known = model.word_id(&token.normalized);
            if token.is_fixed() {
                self.positions.push(Position {
                    token: index,
                    choices: vec![Choice::keep(known)],
                });
                continue;
            }

            let suggestions = generator.generate(&token.normalized, config.real_word_correction_enabled);

            let mut choices = Vec::with_capacity(limit);
            if known.is_none() {
                choices.push(Choice::keep(None));
            }

            for suggestion in suggestions.into_iter() {
                if choices.len() >= limit {
                    break;
                }

                if suggestion.value == token.normalized {
                    choices.push(Choice::keep(known));
                    continue;
                }

                let mut penalty = config.edit_penalty * LogProb::from(suggestion.weight);
                if known.is_some() {
                    penalty += config.known_word_penalty;
                }

                choices.push(Choice {
                    id: model.word_id(&suggestion.value),
                    replacement: Some(suggestion.value),
                    penalty,
                });
            }

            if choices.is_empty() {
                choices.push(Choice::keep(known));
            }

            self.positions.push(Position {
                token: index,
                choices,
            });
        }

        log::trace!(
            "lattice: {} positions, {} choices",
            self.positions.len(),
            self.positions.iter().map(|p| p.choices.len()).sum::<usize>()
        );
    }

    #[inline(always)]
    fn width(&self, position: usize) -> usize {
        self.positions[position].choices.len()
    }

    fn score(&mut self) {
        let speller = self.speller;
        let model = speller.model();

        for i in 0..self.positions.len() {
            let prev = if i >= 1 { self.width(i - 1) } else { 1 };
            let prev_prev = if i >= 2 { self.width(i - 2) } else { 1 };

            let mut scores = vec![LogProb::NEG_INFINITY; self.width(i) * prev];
            let mut back = vec![0usize; self.width(i) * prev];

            for (a, choice) in self.positions[i].choices.iter().enumerate() {
                for b in 0..prev {
                    let state = a * prev + b;

                    for c in 0..prev_prev {
                        let mut context = [None; 2];
                        let context = match i {
                            0 => &context[..0],
                            1 => {
                                context[0] = self.positions[0].choices[b].id;
                                &context[..1]
                            }
                            _ => {
                                context[0] = self.positions[i - 2].choices[c].id;
                                context[1] = self.positions[i - 1].choices[b].id;
                                &context[..2]
                            }
                        };

                        let prior = if i == 0 {
                            0.0
                        } else {
                            self.scores[i - 1][b * prev_prev + c]
                        };

                        let total = prior + model.score_ids(choice.id, context) - choice.penalty;
                        if total > scores[state] {
                            scores[state] = total;
                            back[state] = c;
                        }
                    }
                }
            }

            self.scores.push(scores);
            self.backpointers.push(back);
        }
    }

    fn select(&mut self) {
        let n = self.positions.len();
        let prev = if n >= 2 { self.width(n - 2) } else { 1 };

        let mut best = 0;
        for (state, score) in self.scores[n - 1].iter().enumerate() {
            if *score > self.scores[n - 1][best] {
                best = state;
            }
        }

        self.path = vec![0; n];
        let (mut a, mut b) = (best / prev, best % prev);
        self.path[n - 1] = a;

        for i in (1..n).rev() {
            self.path[i - 1] = b;
            if i >= 2 {
                let c = self.backpointers[i][a * self.width(i - 1) + b];
                a = b;
                b = c;
            }
        }

        log::trace!("best path {:?} scores {}", self.path, self.scores[n - 1][best]);
    }

    fn reconstruct(&mut self) {
        let mut replacements = vec![None; self.tokens.len()];
        for (position, &choice) in self.positions.iter().zip(self.path.iter()) {
            replacements[position.token] = position.choices[choice].replacement.as_ref();
        }

        for (token, replacement) in self.tokens.iter().zip(replacements.into_iter()) {
            match replacement {
                Some(word) => self.output.push_str(&token.case.apply(word)),
                None => self.output.push_str(token.text),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{train, ModelConfig};
    use crate::speller::SpellerConfig;

    fn speller() -> std::sync::Arc<Speller> {
        let model = train(
            vec!["the cat sat on the mat.", "a dog sat on the log."],
            &ModelConfig::default(),
        )
        .unwrap();
        Speller::new(model, SpellerConfig::default())
    }

    #[test]
    fn stages_run_in_order() {
        let speller = speller();
        let mut worker = SentenceWorker::new(&speller, "teh cat");
        let mut seen = vec![worker.stage];

        while worker.stage != Stage::Done {
            worker.stage = worker.step();
            seen.push(worker.stage);
        }

        assert_eq!(
            seen,
            vec![
                Stage::Tokenizing,
                Stage::CandidateExpansion,
                Stage::Scoring,
                Stage::Selection,
                Stage::Reconstruction,
                Stage::Done,
            ]
        );
        assert_eq!(worker.output, "the cat");
    }

    #[test]
    fn lattice_is_bounded() {
        let speller = speller();
        let mut worker = SentenceWorker::new(&speller, "teh cat sot on teh mat");
        worker.tokens = worker.sentence.tokens().collect();
        worker.expand();

        let k = speller.config().max_candidates_per_word;
        assert_eq!(worker.positions.len(), 6);
        for position in worker.positions.iter() {
            assert!(!position.choices.is_empty());
            assert!(position.choices.len() <= k);
        }

        worker.score();
        for (i, scores) in worker.scores.iter().enumerate() {
            assert!(scores.len() <= k * k, "position {}", i);
        }
    }

    #[test]
    fn long_sentences() {
        let speller = speller();
        let sentence = "the cat sat on the mat teh dog sat on teh log ".repeat(20);
        let corrected = speller.correct(&sentence);

        assert_eq!(corrected, sentence.replace("teh", "the"));
    }

    #[test]
    fn whitespace_only_sentence() {
        let speller = speller();
        assert_eq!(SentenceWorker::new(&speller, "  \t").correct(), "  \t");
    }
}
