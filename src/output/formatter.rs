//! Output formatters for batch reports

use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::report::BatchReport;
use crate::processing::matcher::{MatchMethod, MatchResult};
use crate::processing::verdict::{DocumentVerdict, VerdictReason};
use colored::{Color, Colorize};
use std::path::Path;

pub trait OutputFormatter {
    fn format_report(&self, report: &BatchReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Human-readable summary with optional colors and per-criterion detail.
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

pub struct JsonFormatter {
    pretty: bool,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_verdict_badge(&self, verdict: &DocumentVerdict) -> String {
        let (badge, color) = if verdict.overall_pass {
            ("PASS", Color::Green)
        } else if verdict.is_error() {
            ("ERROR", Color::Magenta)
        } else {
            ("FAIL", Color::Red)
        };

        if self.use_colors {
            format!("[{}]", badge.color(color).bold())
        } else {
            format!("[{}]", badge)
        }
    }

    fn format_reason(reason: &VerdictReason) -> String {
        match reason {
            VerdictReason::Passed => "all criteria satisfied".to_string(),
            VerdictReason::CriteriaFailed { criteria } => {
                format!("not satisfied: {}", criteria.join(", "))
            }
            VerdictReason::NoCriteria => "no criteria to check".to_string(),
            VerdictReason::ExtractionFailed { error } => format!("extraction failed: {}", error),
        }
    }

    fn format_criterion(&self, result: &MatchResult) -> String {
        let (mark, color) = match result.satisfied {
            Some(true) => ("✓", Color::Green),
            Some(false) => ("✗", Color::Red),
            None => ("-", Color::White),
        };

        if result.is_skipped() {
            return format!("    {} {}: skipped\n", mark, result.criterion_name);
        }

        let method = match result.method {
            MatchMethod::Exact => "exact",
            MatchMethod::Partial => "partial",
            MatchMethod::TokenSet => "token set",
            MatchMethod::KeywordOverride => "keyword override",
            MatchMethod::Group => "group",
            MatchMethod::GroupMismatch => "group mismatch",
            MatchMethod::GroupAbsent => "group absent",
            MatchMethod::Skipped => "skipped",
        };

        format!(
            "    {} {}: {} ({}, matched '{}')\n",
            self.colorize(mark, color),
            result.criterion_name,
            result.best_score,
            method,
            result.matched_term
        )
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &BatchReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("CV SCREENING REPORT", 1));
        output.push_str(&format!(
            "Generated: {} | Threshold: {} | Keyword override: {}\n",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.threshold,
            if report.keyword_override { "on" } else { "off" }
        ));

        output.push_str(&self.format_header("Criteria", 2));
        for criterion in &report.criteria {
            if criterion.is_empty() {
                output.push_str(&format!("  • {}: (not set)\n", criterion.name));
            } else if criterion.synonyms.is_empty() {
                output.push_str(&format!("  • {}: {}\n", criterion.name, criterion.required_value));
            } else {
                output.push_str(&format!(
                    "  • {}: {} (also: {})\n",
                    criterion.name,
                    criterion.required_value,
                    criterion.synonyms.join(", ")
                ));
            }
        }

        output.push_str(&self.format_header("Documents", 2));
        for verdict in &report.verdicts {
            output.push_str(&format!(
                "{} {} - {}\n",
                self.format_verdict_badge(verdict),
                verdict.document_id,
                Self::format_reason(&verdict.reason)
            ));

            if verdict.low_signal {
                output.push_str(&format!(
                    "    {}\n",
                    self.colorize("little text found; the file may be a scanned image", Color::Yellow)
                ));
            }

            if self.detailed {
                for result in &verdict.per_criterion {
                    output.push_str(&self.format_criterion(result));
                }
                if !verdict.text_preview.is_empty() {
                    output.push_str(&format!("    Preview: {}\n", verdict.text_preview));
                }
            }
        }

        let summary = &report.summary;
        output.push_str(&self.format_header("Summary", 2));
        output.push_str(&format!(
            "{} passed, {} failed ({} unreadable) of {} document(s) | pass rate {}%\n",
            self.colorize(&summary.passed.to_string(), Color::Green),
            self.colorize(&summary.failed.to_string(), Color::Red),
            summary.errored,
            summary.total,
            report.pass_rate()
        ));

        if report.cancelled {
            output.push_str(&format!(
                "{}\n",
                self.colorize(
                    &format!("Cancelled: {} document(s) not processed", summary.not_processed),
                    Color::Yellow
                )
            ));
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &BatchReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

pub fn formatter_for(format: OutputFormat, use_colors: bool, detailed: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter::new(use_colors, detailed)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    use std::fs;
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file_path, content)?;
    Ok(())
}

pub fn suggest_filename(format: &OutputFormat, timestamp: bool) -> String {
    let timestamp_suffix = if timestamp {
        format!("_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        String::new()
    };

    match format {
        OutputFormat::Console => format!("screening{}.txt", timestamp_suffix),
        OutputFormat::Json => format!("screening{}.json", timestamp_suffix),
    }
}
