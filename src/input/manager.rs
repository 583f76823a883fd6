//! Input manager: dispatches uploads to extractors and owns the failure policy

use crate::error::{Result, ScreenerError};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{
    visible_char_count, CsvExtractor, DocxExtractor, PdfExtractor, PlainTextExtractor,
    TextExtractor, XlsxExtractor,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tokio::fs;

/// One uploaded file as handed over by the upload layer. The extension is
/// trusted as declared.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub extension: String,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            extension: extension.into(),
        }
    }
}

/// Result of extracting one document. `error` is set only when the container
/// could not be parsed at all, in which case `text` is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutcome {
    pub file_type: FileType,
    pub text: String,
    pub error: Option<String>,
    /// PDF with almost no text; probably scanned.
    pub low_signal: bool,
}

impl ExtractionOutcome {
    fn failed(file_type: FileType, error: String) -> Self {
        Self {
            file_type,
            text: String::new(),
            error: Some(error),
            low_signal: false,
        }
    }
}

pub struct InputManager {
    pdf: PdfExtractor,
    docx: DocxExtractor,
    xlsx: XlsxExtractor,
    csv: CsvExtractor,
    text: PlainTextExtractor,
    min_pdf_text_chars: usize,
}

impl InputManager {
    pub fn new() -> Self {
        Self::with_min_pdf_text_chars(30)
    }

    pub fn with_min_pdf_text_chars(min_pdf_text_chars: usize) -> Self {
        Self {
            pdf: PdfExtractor::new(min_pdf_text_chars),
            docx: DocxExtractor::new(),
            xlsx: XlsxExtractor,
            csv: CsvExtractor,
            text: PlainTextExtractor,
            min_pdf_text_chars,
        }
    }

    /// Extract text from `bytes` according to the declared extension.
    ///
    /// Never fails and never panics: parser errors and parser panics are
    /// both reported through [`ExtractionOutcome::error`]. Unsupported
    /// extensions yield empty text without an error.
    pub fn extract(&self, bytes: &[u8], declared_extension: &str) -> ExtractionOutcome {
        let file_type = FileType::from_extension(declared_extension);
        let Some(extractor) = self.extractor_for(file_type) else {
            debug!("Nothing to extract for extension '{}'", declared_extension);
            return ExtractionOutcome {
                file_type,
                text: String::new(),
                error: None,
                low_signal: false,
            };
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(bytes)));
        match result {
            Ok(Ok(text)) => {
                let low_signal = file_type == FileType::Pdf
                    && visible_char_count(&text) < self.min_pdf_text_chars;
                if low_signal {
                    warn!("PDF yielded almost no text; it may be a scanned image");
                }
                ExtractionOutcome {
                    file_type,
                    text,
                    error: None,
                    low_signal,
                }
            }
            Ok(Err(e)) => {
                debug!("{} extraction failed: {}", file_type, e);
                ExtractionOutcome::failed(file_type, e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("{} parser panicked: {}", file_type, message);
                ExtractionOutcome::failed(
                    file_type,
                    ScreenerError::Extraction(format!("parser crashed: {}", message)).to_string(),
                )
            }
        }
    }

    /// Read a file from disk into an [`UploadedDocument`].
    pub async fn read_upload(&self, path: &Path) -> Result<UploadedDocument> {
        if !path.exists() {
            return Err(ScreenerError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let bytes = fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();

        info!("Read {} ({} bytes)", filename, bytes.len());
        Ok(UploadedDocument::new(filename, bytes, extension))
    }

    fn extractor_for(&self, file_type: FileType) -> Option<&dyn TextExtractor> {
        match file_type {
            FileType::Pdf => Some(&self.pdf),
            FileType::Docx => Some(&self.docx),
            FileType::Xlsx => Some(&self.xlsx),
            FileType::Csv => Some(&self.csv),
            FileType::Txt => Some(&self.text),
            FileType::Unsupported => None,
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
