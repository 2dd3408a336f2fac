//! Casing of surface words, re-applied to their replacements.

use smol_str::SmolStr;

/// Uppercases every character, expanding where needed ("ß" becomes "SS").
#[inline(always)]
pub fn upper_case(s: &str) -> SmolStr {
    s.chars()
        .map(|c| c.to_uppercase().collect::<String>())
        .collect::<SmolStr>()
}

/// Uppercases the first character only.
#[inline(always)]
pub fn upper_first(s: &str) -> SmolStr {
    let mut c = s.chars();
    match c.next() {
        None => SmolStr::new(""),
        Some(f) => SmolStr::from(f.to_uppercase().collect::<String>() + c.as_str()),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
    Neither,
}

impl Case {
    #[inline(always)]
    fn new(ch: char) -> Case {
        if ch.is_lowercase() {
            Case::Lower
        } else if ch.is_uppercase() {
            Case::Upper
        } else {
            Case::Neither
        }
    }
}

/// Whether `word` has a capital after its first letter without being all
/// capitals, like "McDonald" or "iPhone".
pub fn is_mixed_case(word: &str) -> bool {
    let mut chars = word.chars();
    let mut last_case = match chars.next() {
        Some(ch) => Case::new(ch),
        None => return false,
    };

    if last_case == Case::Neither {
        return false;
    }

    let mut case_changes = 0;

    for ch in chars {
        let next_case = Case::new(ch);

        match (last_case, next_case) {
            (_, Case::Neither) => return false,
            (Case::Upper, Case::Upper) => {}
            (_, Case::Upper) => case_changes += 2,
            (Case::Upper, Case::Lower) => case_changes += 1,
            _ => {}
        }

        last_case = next_case;
    }

    case_changes > 1
}

fn has_upper(word: &str) -> bool {
    word.chars().any(char::is_uppercase)
}

/// Has a cased letter and no lowercase ones.
pub fn is_all_caps(word: &str) -> bool {
    has_upper(word) && upper_case(word) == word
}

/// Starts with a capital and has no other capitals.
pub fn is_first_caps(word: &str) -> bool {
    has_upper(word) && upper_first(word) == word
}

/// Casing pattern of a surface word, re-applied to its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMutation {
    /// "Hello"; also a lone capital such as "A".
    FirstCaps,
    /// "HELLO"
    AllCaps,
    /// Lowercase, uncased or mixed case; the replacement is used as is.
    None,
}

impl CaseMutation {
    /// Casing pattern of `word`.
    pub fn of(word: &str) -> CaseMutation {
        let single = word.chars().nth(1).is_none();

        if is_mixed_case(word) {
            // McDonald-style words keep whatever the replacement has
            CaseMutation::None
        } else if !single && is_all_caps(word) {
            CaseMutation::AllCaps
        } else if is_first_caps(word) {
            CaseMutation::FirstCaps
        } else {
            CaseMutation::None
        }
    }

    /// Casts the normalized `word` into this pattern.
    pub fn apply(self, word: &str) -> SmolStr {
        match self {
            CaseMutation::FirstCaps => upper_first(word),
            CaseMutation::AllCaps => upper_case(word),
            CaseMutation::None => SmolStr::new(word),
        }
    }
}
