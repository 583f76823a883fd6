//! Input processing module
//! Handles file type detection, text extraction, and upload loading

pub mod file_detector;
pub mod text_extractor;
pub mod manager;

pub use file_detector::FileType;
pub use manager::{ExtractionOutcome, InputManager, UploadedDocument};
