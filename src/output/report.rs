//! Batch report structures

use crate::processing::criteria::{Criterion, CriterionSet};
use crate::processing::verdict::DocumentVerdict;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything one screening run produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub threshold: i32,
    pub keyword_override: bool,
    pub criteria: Vec<Criterion>,
    pub summary: BatchSummary,
    /// Set when the batch stopped before every document was started.
    pub cancelled: bool,
    /// In input order.
    pub verdicts: Vec<DocumentVerdict>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Failed documents whose text could not be extracted.
    pub errored: usize,
    pub not_processed: usize,
}

impl BatchReport {
    pub fn new(
        verdicts: Vec<DocumentVerdict>,
        criteria: &CriterionSet,
        threshold: i32,
        total: usize,
        cancelled: bool,
    ) -> Self {
        let passed = verdicts.iter().filter(|v| v.overall_pass).count();
        let errored = verdicts.iter().filter(|v| v.is_error()).count();

        let summary = BatchSummary {
            total,
            passed,
            failed: verdicts.len() - passed,
            errored,
            not_processed: total.saturating_sub(verdicts.len()),
        };

        Self {
            generated_at: Utc::now(),
            threshold,
            keyword_override: criteria.keyword_override(),
            criteria: criteria.iter().cloned().collect(),
            summary,
            cancelled,
            verdicts,
        }
    }

    pub fn passed(&self) -> impl Iterator<Item = &DocumentVerdict> {
        self.verdicts.iter().filter(|v| v.overall_pass)
    }

    /// Share of processed documents that passed, 0-100.
    pub fn pass_rate(&self) -> u8 {
        let processed = self.verdicts.len();
        if processed == 0 {
            return 0;
        }
        (self.summary.passed * 100 / processed) as u8
    }
}
