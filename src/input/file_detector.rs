//! File type detection from the declared extension

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Xlsx,
    Csv,
    Txt,
    Unsupported,
}

impl FileType {
    /// Resolve a declared extension. A leading dot is tolerated; the
    /// comparison is case-insensitive. File contents are never sniffed.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => FileType::Pdf,
            "docx" => FileType::Docx,
            "xlsx" => FileType::Xlsx,
            "csv" => FileType::Csv,
            "txt" => FileType::Txt,
            _ => FileType::Unsupported,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileType::Unsupported)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FileType::Unsupported)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Xlsx => "xlsx",
            FileType::Csv => "csv",
            FileType::Txt => "txt",
            FileType::Unsupported => "unsupported",
        };
        write!(f, "{}", name)
    }
}
