//! CLI interface for the CV screener

use crate::config::OutputFormat;
use crate::processing::criteria::{Criterion, CriterionSet};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cv-screener")]
#[command(about = "Screen CVs against university, major and nationality requirements")]
#[command(long_about = "Extract text from PDF, DOCX, XLSX, CSV and TXT CVs and check each one against recruiter criteria using Arabic-aware fuzzy matching")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Screen one or more CV files
    Screen {
        /// CV files (PDF, DOCX, XLSX, CSV, TXT)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Required university
        #[arg(short, long)]
        university: Option<String>,

        /// Required major
        #[arg(short, long)]
        major: Option<String>,

        /// Required nationality
        #[arg(short, long)]
        nationality: Option<String>,

        /// Additional required keyword (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Alternative university names, separated by ',', '|' or '/'
        #[arg(long)]
        university_synonyms: Option<String>,

        /// Alternative major names, separated by ',', '|' or '/'
        #[arg(long)]
        major_synonyms: Option<String>,

        /// Alternative nationality terms, separated by ',', '|' or '/'
        #[arg(long)]
        nationality_synonyms: Option<String>,

        /// Pass mark 0-100 (defaults to the configured threshold)
        #[arg(short, long, allow_hyphen_values = true)]
        threshold: Option<i32>,

        /// Output format: console, json
        #[arg(short, long, default_value = "console")]
        output: String,

        /// Save output to file; without a value a timestamped name is used
        #[arg(short, long, num_args = 0..=1, require_equals = true)]
        save: Option<Option<PathBuf>>,

        /// Show per-criterion scores and text previews
        #[arg(short, long)]
        detailed: bool,

        /// Disable the compound keyword rule for majors
        #[arg(long)]
        no_override: bool,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file path
    Path,
}

/// Raw criterion values as typed on the command line.
#[derive(Debug, Default, Clone)]
pub struct CriteriaArgs {
    pub university: Option<String>,
    pub major: Option<String>,
    pub nationality: Option<String>,
    pub keywords: Vec<String>,
    pub university_synonyms: Option<String>,
    pub major_synonyms: Option<String>,
    pub nationality_synonyms: Option<String>,
    pub threshold: i32,
    pub keyword_override: bool,
}

impl CriteriaArgs {
    /// Build the criterion set; absent values become skipped criteria.
    pub fn into_criteria(self) -> CriterionSet {
        let synonyms = |raw: &Option<String>| raw.as_deref().map(parse_synonyms).unwrap_or_default();

        let mut set = CriterionSet::new()
            .with(
                Criterion::university(self.university.clone().unwrap_or_default())
                    .with_synonyms(synonyms(&self.university_synonyms)),
            )
            .with(
                Criterion::major(self.major.clone().unwrap_or_default())
                    .with_synonyms(synonyms(&self.major_synonyms)),
            )
            .with(
                Criterion::nationality(self.nationality.clone().unwrap_or_default())
                    .with_synonyms(synonyms(&self.nationality_synonyms)),
            );

        for keyword in &self.keywords {
            set = set.with(Criterion::keyword(keyword.clone()));
        }

        set.with_threshold(self.threshold)
            .with_keyword_override(self.keyword_override)
    }
}

/// Split a synonym list on ',', '|', '/' or the Arabic comma.
pub fn parse_synonyms(raw: &str) -> Vec<String> {
    raw.split([',', '|', '/', '،'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!("Invalid output format: {}. Supported: console, json", format)),
    }
}
