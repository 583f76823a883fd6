//! Text normalization for Arabic and Latin script
//!
//! Everything that gets compared (document text, criterion values, synonyms,
//! lexicon terms) goes through [`normalize`] so that orthographic variation
//! cannot defeat matching:
//!
//! 1. Arabic presentation forms are folded to base letters (NFKC, applied
//!    to the presentation-form blocks only).
//! 2. Lowercase.
//! 3. Arabic tashkeel, tatweel and invisible format marks are dropped.
//! 4. Letter variants are unified (hamza-bearing alef forms, alef maksura,
//!    teh marbuta, hamza on waw/yeh) and Arabic-Indic digits become ASCII.
//! 5. Whitespace runs collapse to a single space, edges are trimmed.
//!
//! Each character is handled by exactly one of steps 3 and 4 (the sets are
//! disjoint), so composed and decomposed hamza forms both end up as bare alef.

use serde::Serialize;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Text that has been through [`normalize`]. There is no other constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize `text` into its comparable form.
pub fn normalize(text: &str) -> NormalizedText {
    if text.is_empty() {
        return NormalizedText::default();
    }

    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        if is_presentation_form(c) {
            for expanded in std::iter::once(c).nfkc() {
                push_folded(expanded, &mut folded);
            }
        } else {
            push_folded(c, &mut folded);
        }
    }

    NormalizedText(collapse_whitespace(&folded))
}

fn push_folded(c: char, out: &mut String) {
    for lower in c.to_lowercase() {
        if is_ignorable(lower) {
            continue;
        }
        out.push(unify_letter(lower));
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_presentation_form(c: char) -> bool {
    matches!(c, '\u{FB50}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFE}')
}

/// Tashkeel, Quranic annotation marks, tatweel and zero-width/bidi controls.
fn is_ignorable(c: char) -> bool {
    matches!(
        c,
        '\u{0610}'..='\u{061A}'
            | '\u{064B}'..='\u{065F}'
            | '\u{0670}'
            | '\u{06D6}'..='\u{06DC}'
            | '\u{06DF}'..='\u{06E8}'
            | '\u{06EA}'..='\u{06ED}'
            | '\u{0640}'
            | '\u{061C}'
            | '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
    )
}

fn unify_letter(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ى' | 'ئ' | 'ی' => 'ي',
        'ة' => 'ه',
        'ؤ' => 'و',
        'ک' => 'ك',
        '\u{0660}'..='\u{0669}' => shift_digit(c, '\u{0660}'),
        '\u{06F0}'..='\u{06F9}' => shift_digit(c, '\u{06F0}'),
        _ => c,
    }
}

fn shift_digit(c: char, zero: char) -> char {
    char::from_digit(c as u32 - zero as u32, 10).unwrap_or(c)
}
