//! Screening criteria supplied by the recruiter

use crate::error::{Result, ScreenerError};
use crate::processing::matcher::DEFAULT_THRESHOLD;
use crate::processing::normalizer::normalize;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    University,
    Major,
    Nationality,
    Keyword,
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriterionKind::University => write!(f, "university"),
            CriterionKind::Major => write!(f, "major"),
            CriterionKind::Nationality => write!(f, "nationality"),
            CriterionKind::Keyword => write!(f, "keyword"),
        }
    }
}

/// One matching slot. An empty `required_value` means the slot is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub kind: CriterionKind,
    pub required_value: String,
    pub synonyms: Vec<String>,
    pub threshold: i32,
}

impl Criterion {
    pub fn new(kind: CriterionKind, required_value: impl Into<String>) -> Self {
        let required_value = required_value.into();
        let name = match kind {
            CriterionKind::Keyword => format!("keyword:{}", required_value.trim()),
            other => other.to_string(),
        };

        Self {
            name,
            kind,
            required_value,
            synonyms: Vec::new(),
            threshold: DEFAULT_THRESHOLD as i32,
        }
    }

    pub fn university(value: impl Into<String>) -> Self {
        Self::new(CriterionKind::University, value)
    }

    pub fn major(value: impl Into<String>) -> Self {
        Self::new(CriterionKind::Major, value)
    }

    pub fn nationality(value: impl Into<String>) -> Self {
        Self::new(CriterionKind::Nationality, value)
    }

    pub fn keyword(value: impl Into<String>) -> Self {
        Self::new(CriterionKind::Keyword, value)
    }

    pub fn with_synonyms(mut self, synonyms: Vec<String>) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn with_threshold(mut self, threshold: i32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// True when the value normalizes to nothing, i.e. the slot is skipped.
    pub fn is_empty(&self) -> bool {
        normalize(&self.required_value).is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=100).contains(&self.threshold) {
            return Err(ScreenerError::Configuration(format!(
                "threshold {} for criterion '{}' is outside 0-100",
                self.threshold, self.name
            )));
        }

        let has_synonyms = self.synonyms.iter().any(|s| !normalize(s).is_empty());
        if self.is_empty() && has_synonyms {
            return Err(ScreenerError::Configuration(format!(
                "criterion '{}' has synonyms but no value",
                self.name
            )));
        }

        Ok(())
    }
}

/// Ordered, immutable set of criteria for one screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSet {
    criteria: Vec<Criterion>,
    keyword_override: bool,
}

impl CriterionSet {
    pub fn new() -> Self {
        Self {
            criteria: Vec::new(),
            keyword_override: true,
        }
    }

    pub fn with(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Enable or disable the compound-keyword override for majors.
    pub fn with_keyword_override(mut self, enabled: bool) -> Self {
        self.keyword_override = enabled;
        self
    }

    /// Apply one threshold to every criterion.
    pub fn with_threshold(mut self, threshold: i32) -> Self {
        for criterion in &mut self.criteria {
            criterion.threshold = threshold;
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.iter()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn keyword_override(&self) -> bool {
        self.keyword_override
    }

    /// True when no criterion has a value, so nothing would be evaluated.
    pub fn all_skipped(&self) -> bool {
        self.criteria.iter().all(Criterion::is_empty)
    }

    /// Reject malformed configuration before any document is processed.
    pub fn validate(&self) -> Result<()> {
        self.criteria.iter().try_for_each(Criterion::validate)
    }
}

impl Default for CriterionSet {
    fn default() -> Self {
        Self::new()
    }
}
