//! Criterion set evaluation with the major and nationality special cases

use crate::config::{Config, LexiconConfig, NationalityGroup, ScreeningConfig};
use crate::error::{Result, ScreenerError};
use crate::processing::criteria::{Criterion, CriterionKind, CriterionSet};
use crate::processing::matcher::{FuzzyMatcher, MatchMethod, MatchResult, PreparedText};
use crate::processing::normalizer::normalize;
use crate::processing::verdict::DocumentVerdict;
use aho_corasick::{AhoCorasick, MatchKind};
use log::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Attached prefixes under which a compound keyword still counts as the
/// same word ("المعلومات" for "معلومات").
const CLITIC_PREFIXES: [&str; 10] = ["وال", "بال", "فال", "كال", "لل", "ال", "و", "ب", "ل", "ف"];

/// Nationality group with terms in [`word_form`].
#[derive(Debug, Clone)]
struct TermGroup {
    id: String,
    terms: Vec<String>,
}

/// Where the nationality scanner found group terms in a document.
#[derive(Debug, Default)]
struct GroupHits {
    /// `(group index, matched term)` in document order.
    hits: Vec<(usize, String)>,
}

impl GroupHits {
    fn first_in(&self, group: usize) -> Option<&str> {
        self.hits
            .iter()
            .find(|(index, _)| *index == group)
            .map(|(_, term)| term.as_str())
    }

    fn first_outside(&self, group: usize) -> Option<&str> {
        self.hits
            .iter()
            .find(|(index, _)| *index != group)
            .map(|(_, term)| term.as_str())
    }
}

/// Evaluates a [`CriterionSet`] against one document's text.
pub struct Evaluator {
    matcher: FuzzyMatcher,
    override_score: u8,
    preview_chars: usize,
    major_synonyms: Vec<Vec<String>>,
    compound_rules: Vec<Vec<String>>,
    nationality_groups: Vec<TermGroup>,
    nationality_scanner: Option<AhoCorasick>,
    /// Group index of each scanner pattern.
    pattern_groups: Vec<usize>,
    patterns: Vec<String>,
}

impl Evaluator {
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_parts(&config.screening, &config.lexicon)
    }

    pub fn from_parts(screening: &ScreeningConfig, lexicon: &LexiconConfig) -> Result<Self> {
        let major_synonyms = lexicon
            .major_synonyms
            .iter()
            .map(|group| normalize_terms(group))
            .filter(|group| group.len() > 1)
            .collect();

        let compound_rules = lexicon
            .compound_keywords
            .iter()
            .map(|rule| normalize_terms(rule))
            .filter(|rule| !rule.is_empty())
            .collect();

        let nationality_groups: Vec<TermGroup> = lexicon
            .nationality_groups
            .iter()
            .map(|NationalityGroup { id, terms }| TermGroup {
                id: id.clone(),
                terms: normalize_terms(terms)
                    .iter()
                    .map(|term| word_form(term))
                    .filter(|term| !term.is_empty())
                    .collect(),
            })
            .collect();

        // A term listed under two groups belongs to the first.
        let mut patterns = Vec::new();
        let mut pattern_groups = Vec::new();
        for (index, group) in nationality_groups.iter().enumerate() {
            for term in &group.terms {
                if !patterns.contains(term) {
                    patterns.push(term.clone());
                    pattern_groups.push(index);
                }
            }
        }

        let nationality_scanner = if patterns.is_empty() {
            None
        } else {
            let scanner = AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(&patterns)
                .map_err(|e| {
                    ScreenerError::Processing(format!("Failed to build nationality scanner: {}", e))
                })?;
            Some(scanner)
        };

        debug!(
            "Evaluator ready: {} major groups, {} compound rules, {} nationality terms",
            lexicon.major_synonyms.len(),
            lexicon.compound_keywords.len(),
            patterns.len()
        );

        Ok(Self {
            matcher: FuzzyMatcher::with_threshold(screening.threshold),
            override_score: screening.override_score.min(100),
            preview_chars: screening.preview_chars,
            major_synonyms,
            compound_rules,
            nationality_groups,
            nationality_scanner,
            pattern_groups,
            patterns,
        })
    }

    /// Evaluate every criterion against `document_text`. The text is
    /// normalized once and shared by all criteria.
    pub fn evaluate(
        &self,
        document_id: &str,
        document_text: &str,
        criteria: &CriterionSet,
    ) -> DocumentVerdict {
        let text = PreparedText::from_raw(document_text);
        let per_criterion = criteria
            .iter()
            .map(|criterion| self.evaluate_criterion(criterion, &text, criteria.keyword_override()))
            .collect();

        DocumentVerdict::from_results(document_id, per_criterion)
            .with_text(document_text, self.preview_chars)
    }

    pub fn evaluate_criterion(
        &self,
        criterion: &Criterion,
        text: &PreparedText,
        keyword_override: bool,
    ) -> MatchResult {
        if criterion.is_empty() {
            return MatchResult::skipped(&criterion.name);
        }

        match criterion.kind {
            CriterionKind::Major => self.evaluate_major(criterion, text, keyword_override),
            CriterionKind::Nationality => self.evaluate_nationality(criterion, text),
            CriterionKind::University | CriterionKind::Keyword => self.matcher.match_terms(
                &criterion.name,
                &criterion.required_value,
                &criterion.synonyms,
                text,
                Some(criterion.threshold),
            ),
        }
    }

    fn evaluate_major(
        &self,
        criterion: &Criterion,
        text: &PreparedText,
        keyword_override: bool,
    ) -> MatchResult {
        let query = normalize(&criterion.required_value);
        let mut synonyms = criterion.synonyms.clone();
        for term in self.major_expansions(query.as_str()) {
            if !synonyms.iter().any(|s| normalize(s).as_str() == term) {
                synonyms.push(term.to_string());
            }
        }

        let result = self.matcher.match_terms(
            &criterion.name,
            &criterion.required_value,
            &synonyms,
            text,
            Some(criterion.threshold),
        );

        if !keyword_override || result.is_satisfied() {
            return result;
        }

        let candidates: Vec<String> = std::iter::once(query.into_string())
            .chain(synonyms.iter().map(|s| normalize(s).into_string()))
            .collect();

        match self.compound_rule_for(&candidates, text) {
            Some(rule) => {
                debug!(
                    "Compound rule [{}] satisfies '{}'",
                    rule.join(", "),
                    criterion.required_value
                );
                MatchResult {
                    satisfied: Some(true),
                    best_score: result.best_score.max(self.override_score),
                    matched_term: rule.join(" "),
                    method: MatchMethod::KeywordOverride,
                    ..result
                }
            }
            None => result,
        }
    }

    /// Other names of the degree when the query is a known major.
    fn major_expansions<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.major_synonyms
            .iter()
            .filter(move |group| group.iter().any(|term| term == query))
            .flat_map(|group| group.iter())
            .filter(move |term| term.as_str() != query)
            .map(String::as_str)
    }

    /// First rule whose keywords all occur as words of one candidate and
    /// as words of the text.
    fn compound_rule_for(&self, candidates: &[String], text: &PreparedText) -> Option<&[String]> {
        self.compound_rules
            .iter()
            .find(|rule| {
                rule.iter().all(|keyword| {
                    has_keyword(text.tokens().iter().map(String::as_str), keyword)
                }) && candidates.iter().any(|candidate| {
                    rule.iter()
                        .all(|keyword| has_keyword(candidate.unicode_words(), keyword))
                })
            })
            .map(Vec::as_slice)
    }

    /// A query naming a known group is decided by group membership only:
    /// a whole-word term of its own group satisfies it, anything else does
    /// not. Other queries are fuzzy-matched literally.
    fn evaluate_nationality(&self, criterion: &Criterion, text: &PreparedText) -> MatchResult {
        let query = word_form(normalize(&criterion.required_value).as_str());
        let Some(group_index) = self.group_of(&query) else {
            return self.matcher.match_terms(
                &criterion.name,
                &criterion.required_value,
                &criterion.synonyms,
                text,
                Some(criterion.threshold),
            );
        };

        let haystack = word_form(text.as_str());
        let hits = self.scan_groups(&haystack);
        let own_hit = hits.first_in(group_index).map(str::to_string).or_else(|| {
            criterion
                .synonyms
                .iter()
                .map(|s| word_form(normalize(s).as_str()))
                .find(|s| contains_whole_word(&haystack, s))
        });

        if let Some(term) = own_hit {
            return MatchResult {
                criterion_name: criterion.name.clone(),
                satisfied: Some(true),
                best_score: 100,
                matched_term: term,
                method: MatchMethod::Group,
            };
        }

        let group_id = &self.nationality_groups[group_index].id;
        match hits.first_outside(group_index) {
            Some(conflict) => {
                debug!(
                    "Nationality '{}' ({}) contradicted by '{}'",
                    criterion.required_value, group_id, conflict
                );
                MatchResult {
                    criterion_name: criterion.name.clone(),
                    satisfied: Some(false),
                    best_score: 0,
                    matched_term: conflict.to_string(),
                    method: MatchMethod::GroupMismatch,
                }
            }
            None => {
                debug!("No '{}' nationality term in the text", group_id);
                MatchResult {
                    criterion_name: criterion.name.clone(),
                    satisfied: Some(false),
                    best_score: 0,
                    matched_term: String::new(),
                    method: MatchMethod::GroupAbsent,
                }
            }
        }
    }

    /// Group whose id or one of whose terms equals the normalized query.
    fn group_of(&self, query: &str) -> Option<usize> {
        self.nationality_groups.iter().position(|group| {
            word_form(normalize(&group.id).as_str()) == query
                || group.terms.iter().any(|t| t == query)
        })
    }

    /// Whole-word group terms in the text, longest term first at each
    /// position so "غير سعودي" is never read as "سعودي".
    fn scan_groups(&self, haystack: &str) -> GroupHits {
        let Some(scanner) = &self.nationality_scanner else {
            return GroupHits::default();
        };

        let hits = scanner
            .find_iter(haystack)
            .filter(|m| is_whole_word(haystack, m.start(), m.end()))
            .map(|m| {
                let pattern = m.pattern().as_usize();
                (self.pattern_groups[pattern], self.patterns[pattern].clone())
            })
            .collect();

        GroupHits { hits }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(&Config::default()).expect("Failed to create default evaluator")
    }
}

fn normalize_terms(terms: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for term in terms {
        let term = normalize(term).into_string();
        if !term.is_empty() && !normalized.contains(&term) {
            normalized.push(term);
        }
    }
    normalized
}

/// Words of `text` joined by single spaces; punctuation and hyphens drop
/// out, so "الجنسية: سعودي" and "non-saudi" scan as plain word runs.
fn word_form(text: &str) -> String {
    text.unicode_words().collect::<Vec<_>>().join(" ")
}

fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    !needle.is_empty()
        && haystack
            .match_indices(needle)
            .any(|(start, _)| is_whole_word(haystack, start, start + needle.len()))
}

fn has_keyword<'a>(words: impl IntoIterator<Item = &'a str>, keyword: &str) -> bool {
    words.into_iter().any(|word| {
        word == keyword
            || CLITIC_PREFIXES
                .iter()
                .any(|prefix| word.strip_prefix(prefix) == Some(keyword))
    })
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
