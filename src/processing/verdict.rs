//! Per-document verdicts

use crate::input::{ExtractionOutcome, FileType};
use crate::processing::matcher::MatchResult;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictReason {
    Passed,
    CriteriaFailed { criteria: Vec<String> },
    /// Every criterion was empty; nothing was checked.
    NoCriteria,
    ExtractionFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentVerdict {
    pub document_id: String,
    pub overall_pass: bool,
    pub reason: VerdictReason,
    pub per_criterion: Vec<MatchResult>,
    pub extraction_error: Option<String>,
    pub low_signal: bool,
    pub file_type: Option<FileType>,
    pub text_preview: String,
    pub extracted_text: String,
}

impl DocumentVerdict {
    /// Combine criterion results: a pass needs at least one evaluated
    /// criterion and every evaluated criterion satisfied.
    pub fn from_results(document_id: impl Into<String>, per_criterion: Vec<MatchResult>) -> Self {
        let evaluated = per_criterion.iter().filter(|r| !r.is_skipped()).count();
        let failed: Vec<String> = per_criterion
            .iter()
            .filter(|r| r.satisfied == Some(false))
            .map(|r| r.criterion_name.clone())
            .collect();

        let (overall_pass, reason) = if evaluated == 0 {
            (false, VerdictReason::NoCriteria)
        } else if failed.is_empty() {
            (true, VerdictReason::Passed)
        } else {
            (false, VerdictReason::CriteriaFailed { criteria: failed })
        };

        Self {
            document_id: document_id.into(),
            overall_pass,
            reason,
            per_criterion,
            extraction_error: None,
            low_signal: false,
            file_type: None,
            text_preview: String::new(),
            extracted_text: String::new(),
        }
    }

    pub fn with_text(mut self, text: &str, preview_chars: usize) -> Self {
        self.text_preview = preview(text, preview_chars);
        self.extracted_text = text.to_string();
        self
    }

    /// Attach extraction metadata. A failed extraction becomes the reason
    /// for a failed verdict unless no criterion was evaluated at all.
    pub fn with_extraction(mut self, outcome: &ExtractionOutcome) -> Self {
        self.file_type = Some(outcome.file_type);
        self.low_signal = outcome.low_signal;
        self.extraction_error = outcome.error.clone();

        if let Some(error) = &outcome.error {
            if !self.overall_pass && self.reason != VerdictReason::NoCriteria {
                self.reason = VerdictReason::ExtractionFailed {
                    error: error.clone(),
                };
            }
        }
        self
    }

    /// A verdict for a document that never reached evaluation.
    pub fn failed(document_id: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            document_id: document_id.into(),
            overall_pass: false,
            reason: VerdictReason::ExtractionFailed {
                error: error.clone(),
            },
            per_criterion: Vec::new(),
            extraction_error: Some(error),
            low_signal: false,
            file_type: None,
            text_preview: String::new(),
            extracted_text: String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.extraction_error.is_some()
    }

    pub fn failed_criteria(&self) -> impl Iterator<Item = &MatchResult> {
        self.per_criterion
            .iter()
            .filter(|r| r.satisfied == Some(false))
    }
}

/// First `max_chars` characters of `text` with whitespace collapsed.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let truncated: String = collapsed.chars().take(max_chars).collect();
        format!("{}...", truncated.trim_end())
    }
}
