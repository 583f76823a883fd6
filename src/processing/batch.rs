//! Batch screening: extraction and evaluation of many documents in parallel

use crate::config::Config;
use crate::error::{Result, ScreenerError};
use crate::input::{InputManager, UploadedDocument};
use crate::output::report::BatchReport;
use crate::processing::criteria::CriterionSet;
use crate::processing::evaluator::Evaluator;
use crate::processing::verdict::DocumentVerdict;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Shared flag that stops a running batch from starting new documents.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchRunner {
    input: Arc<InputManager>,
    evaluator: Arc<Evaluator>,
    workers: usize,
    /// `None` disables the per-document limit.
    timeout: Option<Duration>,
    threshold: i32,
    cancel: CancelHandle,
}

impl BatchRunner {
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = match config.screening.document_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            input: Arc::new(InputManager::with_min_pdf_text_chars(
                config.screening.min_pdf_text_chars,
            )),
            evaluator: Arc::new(Evaluator::new(config)?),
            workers: config.worker_count().max(1),
            timeout,
            threshold: config.screening.threshold,
            cancel: CancelHandle::new(),
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Handle that cancels this runner's current and future batches.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn input_manager(&self) -> &InputManager {
        &self.input
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub async fn run(
        &self,
        documents: Vec<UploadedDocument>,
        criteria: &CriterionSet,
    ) -> Result<BatchReport> {
        self.run_with_progress(documents, criteria, |_| {}).await
    }

    /// Screen `documents` against `criteria`.
    ///
    /// The criteria are validated before any document is touched. One
    /// document failing never aborts the batch; its verdict carries the
    /// error instead. Verdicts come back in input order and `on_verdict`
    /// sees them in that order too.
    pub async fn run_with_progress<F>(
        &self,
        documents: Vec<UploadedDocument>,
        criteria: &CriterionSet,
        mut on_verdict: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&DocumentVerdict),
    {
        criteria.validate()?;

        let total = documents.len();
        info!(
            "Screening {} document(s) against {} criteria with {} worker(s)",
            total,
            criteria.len(),
            self.workers
        );
        if criteria.all_skipped() {
            warn!("Every criterion is empty; no document can pass");
        }

        let criteria = Arc::new(criteria.clone());
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(total);

        for document in documents {
            if self.cancel.is_cancelled() {
                break;
            }

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| ScreenerError::Processing(format!("Worker pool closed: {}", e)))?;

            if self.cancel.is_cancelled() {
                break;
            }

            let input = Arc::clone(&self.input);
            let evaluator = Arc::clone(&self.evaluator);
            let criteria = Arc::clone(&criteria);
            let timeout = self.timeout;

            handles.push(tokio::spawn(screen_document(
                input, evaluator, criteria, document, permit, timeout,
            )));
        }

        let cancelled = handles.len() < total;
        if cancelled {
            info!(
                "Batch cancelled: {} of {} document(s) not started",
                total - handles.len(),
                total
            );
        }

        let mut verdicts = Vec::with_capacity(handles.len());
        for handle in handles {
            let verdict = handle
                .await
                .map_err(|e| ScreenerError::Processing(format!("Screening task failed: {}", e)))?;
            on_verdict(&verdict);
            verdicts.push(verdict);
        }

        Ok(BatchReport::new(
            verdicts,
            criteria.as_ref(),
            self.threshold,
            total,
            cancelled,
        ))
    }
}

/// Extract and evaluate one document on the blocking pool. Timeouts and
/// crashed workers become error verdicts. The worker permit is released
/// when the blocking work ends, so a timed-out document keeps its slot
/// until its thread is free again.
async fn screen_document(
    input: Arc<InputManager>,
    evaluator: Arc<Evaluator>,
    criteria: Arc<CriterionSet>,
    document: UploadedDocument,
    permit: OwnedSemaphorePermit,
    timeout: Option<Duration>,
) -> DocumentVerdict {
    let document_id = document.filename.clone();
    let work_id = document_id.clone();

    let work = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let outcome = input.extract(&document.bytes, &document.extension);
        if let Some(error) = &outcome.error {
            warn!("{}: {}", work_id, error);
        }
        evaluator
            .evaluate(&work_id, &outcome.text, &criteria)
            .with_extraction(&outcome)
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!("{}: timed out after {:?}", document_id, limit);
                let error = ScreenerError::Timeout(limit.as_secs());
                return DocumentVerdict::failed(document_id, error.to_string());
            }
        },
        None => work.await,
    };

    match joined {
        Ok(verdict) => {
            debug!(
                "{}: {}",
                verdict.document_id,
                if verdict.overall_pass { "pass" } else { "fail" }
            );
            verdict
        }
        Err(e) => DocumentVerdict::failed(document_id, format!("Processing error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::criteria::Criterion;
    use crate::processing::verdict::VerdictReason;

    fn txt(name: &str, content: &str) -> UploadedDocument {
        UploadedDocument::new(name, content.as_bytes().to_vec(), "txt")
    }

    #[tokio::test]
    async fn test_verdicts_keep_input_order() {
        let runner = BatchRunner::new(&Config::default()).unwrap().with_workers(3);
        let documents: Vec<UploadedDocument> = (0..12)
            .map(|i| {
                let nationality = if i % 2 == 0 { "سعودي" } else { "غير سعودي" };
                txt(&format!("cv-{}.txt", i), &format!("الجنسية: {}", nationality))
            })
            .collect();
        let criteria = CriterionSet::new().with(Criterion::nationality("سعودي"));

        let report = runner.run(documents, &criteria).await.unwrap();
        assert_eq!(report.verdicts.len(), 12);
        for (i, verdict) in report.verdicts.iter().enumerate() {
            assert_eq!(verdict.document_id, format!("cv-{}.txt", i));
            assert_eq!(verdict.overall_pass, i % 2 == 0);
        }
        assert_eq!(report.summary.passed, 6);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_invalid_criteria_rejected_before_processing() {
        let runner = BatchRunner::new(&Config::default()).unwrap();
        let criteria = CriterionSet::new()
            .with(Criterion::university("KSU"))
            .with_threshold(150);

        let result = runner.run(vec![txt("a.txt", "KSU")], &criteria).await;
        assert!(matches!(result, Err(ScreenerError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_cancelled_runner_starts_nothing() {
        let runner = BatchRunner::new(&Config::default()).unwrap();
        runner.cancel_handle().cancel();

        let criteria = CriterionSet::new().with(Criterion::keyword("python"));
        let report = runner
            .run(vec![txt("a.txt", "python"), txt("b.txt", "rust")], &criteria)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.verdicts.is_empty());
        assert_eq!(report.summary.not_processed, 2);
    }

    #[tokio::test]
    async fn test_timed_out_document_keeps_worker_slot() {
        let semaphore = Arc::new(Semaphore::new(1));
        let permit = Arc::clone(&semaphore).acquire_owned().await.unwrap();
        let document = txt("long.txt", &"lorem ipsum dolor ".repeat(70_000));
        let criteria = CriterionSet::new().with(Criterion::keyword("python developer"));

        let verdict = screen_document(
            Arc::new(InputManager::new()),
            Arc::new(Evaluator::default()),
            Arc::new(criteria),
            document,
            permit,
            Some(Duration::ZERO),
        )
        .await;

        assert!(!verdict.overall_pass);
        assert_eq!(verdict.extraction_error.as_deref(), Some("Timed out after 0s"));
        assert_eq!(semaphore.available_permits(), 0);

        let released =
            tokio::time::timeout(Duration::from_secs(60), Arc::clone(&semaphore).acquire_owned())
                .await;
        assert!(matches!(released, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn test_runner_timeout_yields_error_verdict() {
        let runner = BatchRunner::new(&Config::default())
            .unwrap()
            .with_workers(1)
            .with_timeout(Some(Duration::ZERO));
        let criteria = CriterionSet::new().with(Criterion::keyword("python developer"));

        let report = runner
            .run(
                vec![txt("long.txt", &"lorem ipsum dolor ".repeat(70_000))],
                &criteria,
            )
            .await
            .unwrap();

        let verdict = &report.verdicts[0];
        assert!(!verdict.overall_pass);
        assert!(matches!(verdict.reason, VerdictReason::ExtractionFailed { .. }));
        assert_eq!(report.summary.errored, 1);
    }

    #[tokio::test]
    async fn test_progress_sees_every_verdict() {
        let runner = BatchRunner::new(&Config::default()).unwrap();
        let criteria = CriterionSet::new().with(Criterion::keyword("python"));
        let mut seen = Vec::new();

        runner
            .run_with_progress(
                vec![txt("a.txt", "python developer"), txt("b.txt", "")],
                &criteria,
                |verdict| seen.push(verdict.document_id.clone()),
            )
            .await
            .unwrap();

        assert_eq!(seen, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }
}
