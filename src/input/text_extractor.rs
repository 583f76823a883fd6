//! Text extraction from the supported container formats

use crate::error::{Result, ScreenerError};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use encoding_rs::{Encoding, WINDOWS_1256};
use log::{debug, warn};
use regex::{Captures, Regex};
use std::io::{Cursor, Read};
use std::panic;

pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Page-by-page PDF extraction. A page that fails contributes an empty
/// string; only an unreadable document is an error.
pub struct PdfExtractor {
    min_text_chars: usize,
}

impl PdfExtractor {
    pub fn new(min_text_chars: usize) -> Self {
        Self { min_text_chars }
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let document = lopdf::Document::load_mem(bytes)?;
        if document.is_encrypted() {
            return Err(ScreenerError::Extraction(
                "PDF is password-protected".to_string(),
            ));
        }

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_number in page_numbers {
            match document.extract_text(&[page_number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    debug!("PDF page {} yielded no text: {}", page_number, e);
                    pages.push(String::new());
                }
            }
        }
        let text = pages.join("\n");

        if visible_char_count(&text) >= self.min_text_chars {
            return Ok(text);
        }

        // Sparse page text: retry with pdf-extract's ToUnicode handling.
        match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
            Ok(Ok(alternative)) if visible_char_count(&alternative) > visible_char_count(&text) => {
                debug!("pdf-extract recovered {} characters", alternative.len());
                Ok(alternative)
            }
            Ok(Ok(_)) => Ok(text),
            Ok(Err(e)) => {
                debug!("pdf-extract fallback failed: {}", e);
                Ok(text)
            }
            Err(_) => {
                warn!("pdf-extract panicked on a sparse PDF; keeping page text");
                Ok(text)
            }
        }
    }
}

/// Visible paragraph text of `word/document.xml`.
pub struct DocxExtractor {
    skipped_runs: Regex,
    line_breaks: Regex,
    tabs: Regex,
    tags: Regex,
    char_refs: Regex,
}

impl DocxExtractor {
    pub fn new() -> Self {
        Self {
            skipped_runs: Regex::new(
                r"(?s)<w:(?:delText|instrText)\b[^>]*>.*?</w:(?:delText|instrText)>",
            )
            .expect("Invalid skipped run regex"),
            line_breaks: Regex::new(r"</w:p>|<w:br\b[^>]*/>|<w:cr\b[^>]*/>")
                .expect("Invalid line break regex"),
            tabs: Regex::new(r"<w:tab\b[^>]*/>").expect("Invalid tab regex"),
            tags: Regex::new(r"<[^>]*>").expect("Invalid tag regex"),
            char_refs: Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("Invalid char ref regex"),
        }
    }

    fn xml_to_text(&self, xml: &str) -> String {
        let text = self.skipped_runs.replace_all(xml, "");
        let text = self.line_breaks.replace_all(&text, "\n");
        let text = self.tabs.replace_all(&text, " ");
        let text = self.tags.replace_all(&text, "");
        let text = self.unescape(&text);

        text.lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn unescape(&self, text: &str) -> String {
        let text = self.char_refs.replace_all(text, |caps: &Captures| {
            let reference = &caps[1];
            let code = match reference.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => reference.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        });

        text.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&")
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")?
            .read_to_string(&mut xml)?;
        Ok(self.xml_to_text(&xml))
    }
}

/// Every non-empty cell of every sheet, in row order. One row per line.
pub struct XlsxExtractor;

impl TextExtractor for XlsxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
        let mut rows = Vec::new();

        for sheet in workbook.sheet_names() {
            let range = match workbook.worksheet_range(&sheet) {
                Ok(range) => range,
                Err(e) => {
                    warn!("Skipping unreadable sheet '{}': {}", sheet, e);
                    continue;
                }
            };
            for row in range.rows() {
                let cells: Vec<String> = row.iter().filter_map(cell_text).collect();
                if !cells.is_empty() {
                    rows.push(cells.join(" "));
                }
            }
        }

        Ok(rows.join("\n"))
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(value) => {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        other => Some(other.to_string()),
    }
}

/// CSV rows flattened the same way as spreadsheets. Fields are decoded
/// with the plain-text fallback chain.
pub struct CsvExtractor;

impl TextExtractor for CsvExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            let cells: Vec<String> = record
                .iter()
                .map(decode_text)
                .map(|field| field.trim().to_string())
                .filter(|field| !field.is_empty())
                .collect();
            if !cells.is_empty() {
                rows.push(cells.join(" "));
            }
        }

        Ok(rows.join("\n"))
    }
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        Ok(decode_text(bytes))
    }
}

/// Decode bytes of unknown encoding: BOM-declared Unicode, then UTF-8,
/// then Windows-1256 (Arabic), then lossy UTF-8. Never fails.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text.into_owned();
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    if let Some(text) = WINDOWS_1256.decode_without_bom_handling_and_without_replacement(bytes) {
        debug!("Decoded {} bytes as windows-1256", bytes.len());
        return text.into_owned();
    }

    debug!("Falling back to lossy UTF-8 for {} bytes", bytes.len());
    String::from_utf8_lossy(bytes).into_owned()
}

pub(crate) fn visible_char_count(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
