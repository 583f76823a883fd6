//! Integration tests for the CV screener

use cv_screener::config::Config;
use cv_screener::input::{FileType, InputManager, UploadedDocument};
use cv_screener::output::{JsonFormatter, OutputFormatter};
use cv_screener::processing::{
    BatchRunner, Criterion, CriterionSet, MatchMethod, VerdictReason,
};
use cv_screener::ScreenerError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const ARABIC_CV: &str = "السيرة الذاتية\nجامعة الملك سعود\nبكالوريوس نظم المعلومات الإدارية\nالجنسية: سعودي";

fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// One page per entry; `None` makes a page without any text.
fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let operations = match page {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => Vec::new(),
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Minimal workbook with inline-string cells, one entry per sheet.
fn xlsx_with_sheets(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let mut overrides = String::new();
    let mut sheet_entries = String::new();
    let mut relationships = String::new();
    for (index, (name, _)) in sheets.iter().enumerate() {
        let number = index + 1;
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{number}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        sheet_entries.push_str(&format!(
            r#"<sheet name="{name}" sheetId="{number}" r:id="rId{number}"/>"#
        ));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{number}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{number}.xml"/>"#
        ));
    }

    let parts = [
        (
            "[Content_Types].xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#
            ),
        ),
        (
            "_rels/.rels".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/workbook.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_entries}</sheets></workbook>"#
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
            ),
        ),
    ];
    for (name, xml) in parts {
        writer.start_file(name, options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
    }

    for (index, (_, rows)) in sheets.iter().enumerate() {
        let mut data = String::new();
        for (row_index, row) in rows.iter().enumerate() {
            data.push_str(&format!(r#"<row r="{}">"#, row_index + 1));
            for (column, value) in row.iter().enumerate() {
                let reference = format!("{}{}", (b'A' + column as u8) as char, row_index + 1);
                data.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#
                ));
            }
            data.push_str("</row>");
        }
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
        );
        writer
            .start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

fn standard_criteria() -> CriterionSet {
    CriterionSet::new()
        .with(Criterion::university("جامعة الملك سعود"))
        .with(Criterion::major("نظم المعلومات الإدارية"))
        .with(Criterion::nationality("سعودي"))
}

#[test]
fn test_docx_extraction() {
    let manager = InputManager::new();
    let bytes = docx_with_paragraphs(&["جامعة الملك سعود", "نظم المعلومات &amp; الإدارية"]);

    let outcome = manager.extract(&bytes, "docx");
    assert_eq!(outcome.file_type, FileType::Docx);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.text, "جامعة الملك سعود\nنظم المعلومات & الإدارية");
}

#[test]
fn test_pdf_extraction_keeps_text_pages() {
    let manager = InputManager::new();
    let bytes = pdf_with_pages(&[
        Some("King Saud University Bachelor of Management Information Systems"),
        None,
    ]);

    let outcome = manager.extract(&bytes, "pdf");
    assert_eq!(outcome.file_type, FileType::Pdf);
    assert!(outcome.error.is_none());
    assert!(!outcome.low_signal);
    assert!(outcome
        .text
        .contains("King Saud University Bachelor of Management Information Systems"));
}

#[test]
fn test_textless_pdf_is_low_signal() {
    let manager = InputManager::new();
    let outcome = manager.extract(&pdf_with_pages(&[None, None]), "pdf");

    assert!(outcome.error.is_none());
    assert!(outcome.low_signal);
    assert!(outcome.text.trim().is_empty());
}

#[test]
fn test_xlsx_rows_flatten_across_sheets() {
    let manager = InputManager::new();
    let profile: &[&[&str]] = &[&["الاسم", "أحمد"], &["الجنسية", "سعودي"]];
    let education: &[&[&str]] = &[&["جامعة الملك سعود", "نظم المعلومات"]];
    let bytes = xlsx_with_sheets(&[("Profile", profile), ("Education", education)]);

    let outcome = manager.extract(&bytes, "xlsx");
    assert_eq!(outcome.file_type, FileType::Xlsx);
    assert!(outcome.error.is_none());
    assert_eq!(
        outcome.text,
        "الاسم أحمد\nالجنسية سعودي\nجامعة الملك سعود نظم المعلومات"
    );
}

#[tokio::test]
async fn test_mixed_batch() {
    let runner = BatchRunner::new(&Config::default()).unwrap().with_workers(2);
    let documents = vec![
        UploadedDocument::new("ahmed.txt", ARABIC_CV.as_bytes().to_vec(), "txt"),
        UploadedDocument::new(
            "sara.docx",
            docx_with_paragraphs(&["جامعة الملك سعود", "نظم المعلومات الإدارية", "سعودية"]),
            "DOCX",
        ),
        UploadedDocument::new(
            "omar.csv",
            "الاسم,الجنسية,الجامعة\nعمر,غير سعودي,جامعة الملك سعود\n"
                .as_bytes()
                .to_vec(),
            "csv",
        ),
        UploadedDocument::new("broken.pdf", b"this is not a pdf".to_vec(), "pdf"),
        UploadedDocument::new("photo.jpg", vec![0xFF, 0xD8, 0xFF], "jpg"),
    ];

    let report = runner.run(documents, &standard_criteria()).await.unwrap();
    let ids: Vec<&str> = report.verdicts.iter().map(|v| v.document_id.as_str()).collect();
    assert_eq!(ids, vec!["ahmed.txt", "sara.docx", "omar.csv", "broken.pdf", "photo.jpg"]);

    let ahmed = &report.verdicts[0];
    assert!(ahmed.overall_pass);
    assert_eq!(ahmed.file_type, Some(FileType::Txt));
    assert!(ahmed.text_preview.starts_with("السيرة الذاتية جامعة"));

    let sara = &report.verdicts[1];
    assert!(sara.overall_pass);

    let omar = &report.verdicts[2];
    assert!(!omar.overall_pass);
    let nationality = omar
        .per_criterion
        .iter()
        .find(|r| r.criterion_name == "nationality")
        .unwrap();
    assert_eq!(nationality.method, MatchMethod::GroupMismatch);

    let broken = &report.verdicts[3];
    assert!(!broken.overall_pass);
    assert!(broken.extraction_error.is_some());
    assert!(matches!(broken.reason, VerdictReason::ExtractionFailed { .. }));

    let photo = &report.verdicts[4];
    assert!(!photo.overall_pass);
    assert_eq!(photo.file_type, Some(FileType::Unsupported));
    assert!(photo.extraction_error.is_none());
    assert!(photo.extracted_text.is_empty());

    assert_eq!(report.summary.total, 5);
    assert_eq!(report.summary.passed, 2);
    assert_eq!(report.summary.failed, 3);
    assert_eq!(report.summary.errored, 1);
}

#[tokio::test]
async fn test_misspelled_major_passes_with_override_only() {
    let runner = BatchRunner::new(&Config::default()).unwrap();
    let criteria = CriterionSet::new().with(Criterion::major("نظم معلومات ادرايه"));
    let documents = || {
        vec![UploadedDocument::new(
            "cv.txt",
            ARABIC_CV.as_bytes().to_vec(),
            "txt",
        )]
    };

    let report = runner.run(documents(), &criteria).await.unwrap();
    assert!(report.verdicts[0].overall_pass);
    assert_eq!(
        report.verdicts[0].per_criterion[0].method,
        MatchMethod::KeywordOverride
    );

    let strict = criteria.with_keyword_override(false);
    let report = runner.run(documents(), &strict).await.unwrap();
    assert!(!report.verdicts[0].overall_pass);
}

#[tokio::test]
async fn test_read_upload_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Ahmed CV.TXT");
    std::fs::write(&path, ARABIC_CV).unwrap();

    let manager = InputManager::new();
    let document = manager.read_upload(&path).await.unwrap();
    assert_eq!(document.filename, "Ahmed CV.TXT");
    assert_eq!(document.extension, "TXT");

    let outcome = manager.extract(&document.bytes, &document.extension);
    assert_eq!(outcome.text, ARABIC_CV);

    let missing = manager.read_upload(&dir.path().join("missing.pdf")).await;
    assert!(matches!(missing, Err(ScreenerError::InvalidInput(_))));
}

#[tokio::test]
async fn test_windows_1256_text_upload() {
    let runner = BatchRunner::new(&Config::default()).unwrap();
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1256.encode("الجنسية: سعودي");
    assert!(!had_errors);

    let criteria = CriterionSet::new().with(Criterion::nationality("Saudi"));
    let report = runner
        .run(
            vec![UploadedDocument::new("legacy.txt", bytes.into_owned(), "txt")],
            &criteria,
        )
        .await
        .unwrap();

    assert!(report.verdicts[0].overall_pass);
}

#[tokio::test]
async fn test_empty_criteria_never_pass() {
    let runner = BatchRunner::new(&Config::default()).unwrap();
    let criteria = CriterionSet::new()
        .with(Criterion::university(""))
        .with(Criterion::major(""))
        .with(Criterion::nationality(""));

    let report = runner
        .run(
            vec![UploadedDocument::new("cv.txt", ARABIC_CV.as_bytes().to_vec(), "txt")],
            &criteria,
        )
        .await
        .unwrap();

    assert!(!report.verdicts[0].overall_pass);
    assert_eq!(report.verdicts[0].reason, VerdictReason::NoCriteria);
}

#[tokio::test]
async fn test_json_report() {
    let runner = BatchRunner::new(&Config::default()).unwrap();
    let report = runner
        .run(
            vec![UploadedDocument::new("cv.txt", ARABIC_CV.as_bytes().to_vec(), "txt")],
            &standard_criteria(),
        )
        .await
        .unwrap();

    let json = JsonFormatter::new(false).format_report(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["verdicts"][0]["overall_pass"], true);
    assert_eq!(value["verdicts"][0]["file_type"], "txt");
    assert_eq!(value["criteria"].as_array().unwrap().len(), 3);
    assert_eq!(value["cancelled"], false);
}
