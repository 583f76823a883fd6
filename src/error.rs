//! Error handling for the CV screener

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, ScreenerError>;

impl From<zip::result::ZipError> for ScreenerError {
    fn from(err: zip::result::ZipError) -> Self {
        ScreenerError::Extraction(format!("invalid document container: {}", err))
    }
}

impl From<lopdf::Error> for ScreenerError {
    fn from(err: lopdf::Error) -> Self {
        ScreenerError::Extraction(format!("invalid PDF: {}", err))
    }
}

impl From<calamine::XlsxError> for ScreenerError {
    fn from(err: calamine::XlsxError) -> Self {
        ScreenerError::Extraction(format!("invalid workbook: {}", err))
    }
}

impl From<csv::Error> for ScreenerError {
    fn from(err: csv::Error) -> Self {
        ScreenerError::Extraction(format!("invalid CSV: {}", err))
    }
}

impl From<toml::de::Error> for ScreenerError {
    fn from(err: toml::de::Error) -> Self {
        ScreenerError::Configuration(format!("Failed to parse config: {}", err))
    }
}
