//! Splitting text into sentences and tokens.
//!
//! Every byte of the input belongs to exactly one token, so concatenating the
//! token texts gives back the input unchanged.

use std::iter::Peekable;

use smol_str::SmolStr;
use unic_segment::WordBoundIndices;
use unic_ucd_category::GeneralCategory;
use unicode_normalization::UnicodeNormalization;

use self::case_handling::CaseMutation;

pub mod case_handling;

const SENTENCE_TERMINALS: &[char] = &['.', '!', '?', '…', '。', '！', '？'];

/// What a token is, as far as correction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Contains a letter and no digit.
    Word,
    /// Contains a digit.
    Number,
    /// Punctuation only.
    Punctuation,
    /// Whitespace only.
    Whitespace,
    /// Symbols, emoji and anything else.
    Other,
}

impl TokenKind {
    /// Classifies a segment by the general categories of its characters.
    pub fn of(s: &str) -> TokenKind {
        let mut letter = false;
        let mut punctuation = false;
        let mut whitespace = true;

        for ch in s.chars() {
            let category = GeneralCategory::of(ch);
            if category.is_number() {
                return TokenKind::Number;
            }
            letter |= category.is_letter();
            punctuation |= category.is_punctuation();
            whitespace &= ch.is_whitespace();
        }

        if letter {
            TokenKind::Word
        } else if whitespace {
            TokenKind::Whitespace
        } else if punctuation {
            TokenKind::Punctuation
        } else {
            TokenKind::Other
        }
    }
}

/// A segment of the input with its normalized form.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    /// Surface form, exactly as in the input.
    pub text: &'a str,
    /// Classification of the surface form.
    pub kind: TokenKind,
    /// NFC, lowercased form; empty unless the token is a word or number.
    pub normalized: SmolStr,
    /// Casing of the surface form.
    pub case: CaseMutation,
}

impl<'a> Token<'a> {
    /// Classifies and normalizes one segment.
    pub fn new(text: &'a str) -> Token<'a> {
        let kind = TokenKind::of(text);
        let (normalized, case) = match kind {
            TokenKind::Word | TokenKind::Number => (normalize_word(text), CaseMutation::of(text)),
            _ => (SmolStr::default(), CaseMutation::None),
        };

        Token {
            text,
            kind,
            normalized,
            case,
        }
    }

    /// Words and numbers take part in language model context.
    #[inline]
    pub fn is_lexical(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::Number)
    }

    /// Tokens that are never replaced.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.kind != TokenKind::Word
    }
}

/// Canonical form of a word used for counting and lookup.
pub fn normalize_word(word: &str) -> SmolStr {
    word.nfc().flat_map(char::to_lowercase).collect()
}

/// Iterator over the tokens of a text, see [`Tokenize::tokens`].
pub struct Tokens<'a> {
    inner: WordBoundIndices<'a>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    #[inline]
    fn next(&mut self) -> Option<Token<'a>> {
        self.inner.next().map(|(_, s)| Token::new(s))
    }
}

/// Sentence slices covering the whole input.
pub struct Sentences<'a> {
    text: &'a str,
    bounds: Peekable<WordBoundIndices<'a>>,
    start: usize,
}

#[inline]
fn ends_sentence(segment: &str) -> bool {
    segment.contains('\n') || segment.chars().all(|c| SENTENCE_TERMINALS.contains(&c))
}

impl<'a> Iterator for Sentences<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.start >= self.text.len() {
            return None;
        }

        let start = self.start;
        while let Some((i, segment)) = self.bounds.next() {
            if !ends_sentence(segment) {
                continue;
            }

            // "?!" and "..." come out of the segmenter one character at a time
            let mut end = i + segment.len();
            if !segment.contains('\n') {
                while let Some(&(j, next)) = self.bounds.peek() {
                    if !ends_sentence(next) {
                        break;
                    }
                    end = j + next.len();
                    self.bounds.next();
                    if next.contains('\n') {
                        break;
                    }
                }
            }

            self.start = end;
            return Some(&self.text[start..end]);
        }

        self.start = self.text.len();
        Some(&self.text[start..])
    }
}

/// Segmentation of text into tokens and sentences.
pub trait Tokenize {
    /// Word-boundary segments, covering the whole input.
    fn tokens(&self) -> Tokens<'_>;
    /// Sentences ending after a run of terminal punctuation or at a line
    /// break, covering the whole input.
    fn sentences(&self) -> Sentences<'_>;
    /// Normalized words and numbers, in order.
    fn lexical_words(&self) -> Vec<SmolStr>;
}

impl Tokenize for str {
    fn tokens(&self) -> Tokens<'_> {
        Tokens {
            inner: WordBoundIndices::new(self),
        }
    }

    fn sentences(&self) -> Sentences<'_> {
        Sentences {
            text: self,
            bounds: WordBoundIndices::new(self).peekable(),
            start: 0,
        }
    }

    fn lexical_words(&self) -> Vec<SmolStr> {
        self.tokens()
            .filter(Token::is_lexical)
            .map(|t| t.normalized)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_cover_input() {
        let msg = "this is an ordinary sentence! \"This was quoted,\", an emoji: (😄), and\t a tab.\n Some extreme unicode; bismala: (﷽).";
        let joined = msg.tokens().map(|t| t.text).collect::<String>();
        assert_eq!(joined, msg);
    }

    #[test]
    fn token_kinds() {
        let kinds = "Helo, world! 42 😄"
            .tokens()
            .map(|t| (t.text, t.kind))
            .collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec![
                ("Helo", TokenKind::Word),
                (",", TokenKind::Punctuation),
                (" ", TokenKind::Whitespace),
                ("world", TokenKind::Word),
                ("!", TokenKind::Punctuation),
                (" ", TokenKind::Whitespace),
                ("42", TokenKind::Number),
                (" ", TokenKind::Whitespace),
                ("😄", TokenKind::Other),
            ]
        );
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_word("Hello"), "hello");
        // decomposed e + combining acute composes to a single char
        assert_eq!(normalize_word("Cafe\u{301}"), "caf\u{e9}");

        let token = Token::new("HELLO");
        assert_eq!(token.normalized, "hello");
        assert_eq!(token.case, CaseMutation::AllCaps);
        assert!(!token.is_fixed());
        assert!(Token::new("3rd").is_fixed());
    }

    #[test]
    fn apostrophes_stay_inside_words() {
        assert_eq!("I don't know".lexical_words(), vec!["i", "don't", "know"]);
    }

    #[test]
    fn sentences() {
        let text = "I have a problem. Teh cat sat?! Yes...\nnew line";
        let sentences = text.sentences().collect::<Vec<_>>();

        assert_eq!(
            sentences,
            vec![
                "I have a problem.",
                " Teh cat sat?!",
                " Yes...\n",
                "new line",
            ]
        );
        assert_eq!(sentences.concat(), text);
    }

    #[test]
    fn decimals_do_not_split() {
        assert_eq!("pi is 3.14 today".sentences().count(), 1);
        assert_eq!("".sentences().count(), 0);
    }
}
