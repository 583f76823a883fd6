//! Report structures and formatters

pub mod formatter;
pub mod report;

pub use formatter::{
    formatter_for, save_report_to_file, suggest_filename, ConsoleFormatter, JsonFormatter,
    OutputFormatter,
};
pub use report::{BatchReport, BatchSummary};
