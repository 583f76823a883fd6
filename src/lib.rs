//! CV screener library

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod processing;

pub use config::Config;
pub use error::{Result, ScreenerError};
pub use input::{ExtractionOutcome, InputManager, UploadedDocument};
pub use output::BatchReport;
pub use processing::{
    normalize, BatchRunner, CancelHandle, Criterion, CriterionSet, DocumentVerdict, Evaluator,
    FuzzyMatcher, MatchResult,
};
