//! Fuzzy criterion matching against normalized document text

use crate::processing::normalizer::{normalize, NormalizedText};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strsim::levenshtein;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_THRESHOLD: u8 = 80;

/// How a [`MatchResult`] score was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Candidate found verbatim in the text.
    Exact,
    /// Best contiguous window of the text.
    Partial,
    /// Word-set overlap, order independent.
    TokenSet,
    /// Compound keyword rule fired for a major.
    KeywordOverride,
    /// Nationality group found in the text.
    Group,
    /// The text names a different nationality group.
    GroupMismatch,
    /// No term of the queried nationality group is in the text.
    GroupAbsent,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub criterion_name: String,
    /// `None` when the criterion was skipped.
    pub satisfied: Option<bool>,
    pub best_score: u8,
    pub matched_term: String,
    pub method: MatchMethod,
}

impl MatchResult {
    pub fn skipped(criterion_name: impl Into<String>) -> Self {
        Self {
            criterion_name: criterion_name.into(),
            satisfied: None,
            best_score: 0,
            matched_term: String::new(),
            method: MatchMethod::Skipped,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.satisfied.is_none()
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied == Some(true)
    }
}

/// Normalized document text plus the word structure the scorers need.
/// Built once per document and shared by every criterion.
#[derive(Debug, Clone)]
pub struct PreparedText {
    text: NormalizedText,
    /// Byte offset of every char, plus the total length.
    char_offsets: Vec<usize>,
    /// Char indices at which a word starts.
    word_starts: Vec<usize>,
    tokens: BTreeSet<String>,
    token_chars: usize,
}

impl PreparedText {
    pub fn new(text: NormalizedText) -> Self {
        let raw = text.as_str();
        let mut char_offsets: Vec<usize> = raw.char_indices().map(|(i, _)| i).collect();
        char_offsets.push(raw.len());

        let mut word_starts = Vec::new();
        let mut previous_is_space = true;
        for (index, c) in raw.chars().enumerate() {
            if previous_is_space && !c.is_whitespace() {
                word_starts.push(index);
            }
            previous_is_space = c.is_whitespace();
        }

        let tokens: BTreeSet<String> = raw.unicode_words().map(str::to_string).collect();
        let token_chars = tokens.iter().map(|t| t.chars().count()).sum();

        Self {
            text,
            char_offsets,
            word_starts,
            tokens,
            token_chars,
        }
    }

    pub fn from_raw(raw: &str) -> Self {
        Self::new(normalize(raw))
    }

    pub fn text(&self) -> &NormalizedText {
        &self.text
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn contains(&self, needle: &str) -> bool {
        !needle.is_empty() && self.text.as_str().contains(needle)
    }

    pub fn tokens(&self) -> &BTreeSet<String> {
        &self.tokens
    }

    fn char_len(&self) -> usize {
        self.char_offsets.len() - 1
    }

    fn window(&self, start: usize, len: usize) -> &str {
        let end = (start + len).min(self.char_len());
        &self.text.as_str()[self.char_offsets[start]..self.char_offsets[end]]
    }
}

/// Scores query terms and their synonyms against a [`PreparedText`].
pub struct FuzzyMatcher {
    default_threshold: u8,
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(threshold: i32) -> Self {
        Self {
            default_threshold: clamp_threshold(threshold),
        }
    }

    /// Match `query` and `synonyms` against `text`.
    ///
    /// Candidates are normalized and tried in order (query first); the
    /// highest score wins, earlier candidates win ties. A missing threshold
    /// falls back to the matcher default; out-of-range values are clamped.
    pub fn match_terms(
        &self,
        criterion_name: &str,
        query: &str,
        synonyms: &[String],
        text: &PreparedText,
        threshold: Option<i32>,
    ) -> MatchResult {
        let threshold = threshold
            .map(clamp_threshold)
            .unwrap_or(self.default_threshold);

        let candidates: Vec<NormalizedText> = std::iter::once(query)
            .chain(synonyms.iter().map(String::as_str))
            .map(normalize)
            .filter(|candidate| !candidate.is_empty())
            .collect();

        if candidates.is_empty() {
            return MatchResult::skipped(criterion_name);
        }

        let mut best_score = 0;
        let mut method = MatchMethod::Partial;
        let mut matched = &candidates[0];
        for (index, candidate) in candidates.iter().enumerate() {
            let (score, candidate_method) = self.score_candidate(candidate.as_str(), text);
            if index == 0 || score > best_score {
                best_score = score;
                method = candidate_method;
                matched = candidate;
            }
            if score == 100 {
                break;
            }
        }

        MatchResult {
            criterion_name: criterion_name.to_string(),
            satisfied: Some(best_score >= threshold),
            best_score,
            matched_term: matched.to_string(),
            method,
        }
    }

    /// Score one already-normalized candidate: exact containment is 100,
    /// otherwise the better of the windowed and word-set similarities.
    pub fn score_candidate(&self, candidate: &str, text: &PreparedText) -> (u8, MatchMethod) {
        if text.contains(candidate) {
            return (100, MatchMethod::Exact);
        }

        let partial = partial_ratio(candidate, text);
        let token_set = token_set_ratio(candidate, text);
        if token_set > partial {
            (token_set, MatchMethod::TokenSet)
        } else {
            (partial, MatchMethod::Partial)
        }
    }

}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

pub fn clamp_threshold(threshold: i32) -> u8 {
    threshold.clamp(0, 100) as u8
}

/// Levenshtein similarity scaled to 0..=100, integer arithmetic so that
/// only identical strings reach 100.
pub fn ratio(a: &str, b: &str) -> u8 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0;
    }
    let distance = levenshtein(a, b);
    ((longest - distance) * 100 / longest) as u8
}

/// Best [`ratio`] between `candidate` and a window of the same length
/// starting at any word boundary of the text.
pub fn partial_ratio(candidate: &str, text: &PreparedText) -> u8 {
    let length = candidate.chars().count();
    if length == 0 || text.char_len() == 0 {
        return 0;
    }
    if length >= text.char_len() {
        return ratio(candidate, text.as_str());
    }

    let mut best = 0;
    for &start in &text.word_starts {
        let score = ratio(candidate, text.window(start, length));
        if score > best {
            best = score;
            if best == 100 {
                break;
            }
        }
    }
    best
}

/// Word-set similarity: 100 when every candidate word is a word of the
/// text, otherwise the best ratio among the intersection/difference
/// recombinations. Candidate words missing from the text always cost
/// score, however short the text.
pub fn token_set_ratio(candidate: &str, text: &PreparedText) -> u8 {
    let query_tokens: BTreeSet<&str> = candidate.unicode_words().collect();
    if query_tokens.is_empty() || text.tokens.is_empty() {
        return 0;
    }

    let intersection: Vec<&str> = query_tokens
        .iter()
        .copied()
        .filter(|token| text.tokens.contains(*token))
        .collect();
    let only_query: Vec<&str> = query_tokens
        .iter()
        .copied()
        .filter(|token| !text.tokens.contains(*token))
        .collect();
    let only_text_count = text.tokens.len() - intersection.len();

    if only_query.is_empty() {
        return 100;
    }

    let sect = intersection.join(" ");
    let sect_len = sect.chars().count();
    let query_diff = only_query.join(" ");
    let query_diff_len = query_diff.chars().count();
    let intersection_chars: usize = intersection.iter().map(|t| t.chars().count()).sum();
    let text_diff_len =
        text.token_chars - intersection_chars + only_text_count.saturating_sub(1);

    let mut best = 0;
    if sect_len > 0 {
        // sect is a prefix of "sect + ' ' + diff": the distance is the suffix length
        best = prefix_ratio(sect_len, query_diff_len);
    }

    // ratio(a, b) can never exceed shorter * 100 / longer
    let longest = query_diff_len.max(text_diff_len);
    let shortest = query_diff_len.min(text_diff_len);
    if longest > 0 && (shortest * 100 / longest) as u8 > best {
        let text_diff: Vec<&str> = text
            .tokens
            .iter()
            .map(String::as_str)
            .filter(|token| !query_tokens.contains(token))
            .collect();
        best = best.max(ratio(&query_diff, &text_diff.join(" ")));
    }
    best
}

fn prefix_ratio(prefix_len: usize, suffix_len: usize) -> u8 {
    let total = prefix_len + 1 + suffix_len;
    (prefix_len * 100 / total) as u8
}
