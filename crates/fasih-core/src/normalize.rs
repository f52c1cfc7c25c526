//! Arabic text normalization used by both indexing and querying.
//!
//! Verses in the corpus are fully vocalized while user queries rarely are, so
//! every comparison goes through [`normalize`]: marks and tatweel are dropped,
//! hamza/alef/yaa variants are folded, the hemistich ellipsis becomes a space
//! and whitespace is collapsed. The result is a fixed point of the function.

const TATWEEL: char = '\u{0640}';

fn is_arabic_mark(c: char) -> bool {
    matches!(c, '\u{0610}'..='\u{061A}' | '\u{064B}'..='\u{065F}' | '\u{0670}')
}

fn unify_letter(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ى' | 'ئ' => 'ي',
        'ؤ' => 'و',
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArabicNormalizer {
    pub unify_letters: bool,
}

impl Default for ArabicNormalizer {
    fn default() -> Self {
        Self { unify_letters: true }
    }
}

impl ArabicNormalizer {
    pub fn new(unify_letters: bool) -> Self {
        Self { unify_letters }
    }

    pub fn normalize(&self, text: &str) -> String {
        let mut folded = String::with_capacity(text.len());
        for c in text.chars() {
            if c == TATWEEL || is_arabic_mark(c) {
                continue;
            }
            folded.push(if self.unify_letters { unify_letter(c) } else { c });
        }
        let spaced = folded.replace("...", " ").replace('…', " ");
        spaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Normalize with the default options (letter unification on).
pub fn normalize(text: &str) -> String {
    ArabicNormalizer::default().normalize(text)
}

/// Whitespace tokens of the normalized text. No stemming.
pub fn tokenize(text: &str) -> Vec<String> {
    ArabicNormalizer::default().tokenize(text)
}

/// Remove ellipsis markers anywhere in `text` and trim the ends.
pub fn strip_ellipsis(text: &str) -> String {
    text.replace("...", "").replace('…', "").trim().to_string()
}
