//! Configuration management for the CV screener

use crate::error::{Result, ScreenerError};
use crate::processing::normalizer::normalize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screening: ScreeningConfig,
    pub lexicon: LexiconConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Pass mark for every criterion, 0-100.
    pub threshold: i32,
    /// Score reported when a compound keyword rule satisfies a major.
    pub override_score: u8,
    /// PDFs with fewer visible characters are flagged as possibly scanned.
    pub min_pdf_text_chars: usize,
    pub preview_chars: usize,
    pub document_timeout_secs: u64,
    /// 0 means one worker per CPU.
    pub max_workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    /// Each entry lists interchangeable names of one degree.
    pub major_synonyms: Vec<Vec<String>>,
    /// Each entry lists words that together identify a degree.
    pub compound_keywords: Vec<Vec<String>>,
    pub nationality_groups: Vec<NationalityGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalityGroup {
    pub id: String,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub detailed: bool,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            threshold: 80,
            override_score: 90,
            min_pdf_text_chars: 30,
            preview_chars: 500,
            document_timeout_secs: 30,
            max_workers: 0,
        }
    }
}

impl Default for LexiconConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            major_synonyms: vec![
                strings(&[
                    "نظم المعلومات الإدارية",
                    "نظم معلومات إدارية",
                    "management information systems",
                ]),
                strings(&["نظم المعلومات", "information systems"]),
                strings(&["علوم الحاسب", "علوم الحاسوب", "computer science"]),
                strings(&["هندسة البرمجيات", "software engineering"]),
                strings(&["إدارة الأعمال", "business administration"]),
                strings(&["المحاسبة", "accounting"]),
            ],
            compound_keywords: vec![
                strings(&["نظم", "معلومات"]),
                strings(&["علوم", "حاسب"]),
                strings(&["علوم", "حاسوب"]),
                strings(&["هندسة", "برمجيات"]),
                strings(&["إدارة", "أعمال"]),
                strings(&["information", "systems"]),
                strings(&["computer", "science"]),
                strings(&["software", "engineering"]),
                strings(&["business", "administration"]),
            ],
            nationality_groups: vec![
                NationalityGroup {
                    id: "national".to_string(),
                    terms: strings(&[
                        "سعودي",
                        "سعودية",
                        "سعودى",
                        "saudi",
                        "saudi arabian",
                        "saudi national",
                        "الجنسية السعودية",
                    ]),
                },
                NationalityGroup {
                    id: "non-national".to_string(),
                    terms: strings(&[
                        "غير سعودي",
                        "غير سعودية",
                        "وافد",
                        "non-saudi",
                        "non saudi",
                        "expatriate",
                    ]),
                },
            ],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Console,
            detailed: false,
            color_output: true,
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first use.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            ScreenerError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("cv-screener")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        let screening = &self.screening;
        if !(0..=100).contains(&screening.threshold) {
            return Err(ScreenerError::Configuration(format!(
                "screening.threshold {} is outside 0-100",
                screening.threshold
            )));
        }
        if screening.override_score > 100 {
            return Err(ScreenerError::Configuration(format!(
                "screening.override_score {} is above 100",
                screening.override_score
            )));
        }

        for group in &self.lexicon.nationality_groups {
            if normalize(&group.id).is_empty() {
                return Err(ScreenerError::Configuration(
                    "nationality group with an empty id".to_string(),
                ));
            }
            if group.terms.iter().all(|term| normalize(term).is_empty()) {
                return Err(ScreenerError::Configuration(format!(
                    "nationality group '{}' has no terms",
                    group.id
                )));
            }
        }

        if self
            .lexicon
            .compound_keywords
            .iter()
            .any(|rule| rule.iter().all(|keyword| normalize(keyword).is_empty()))
        {
            return Err(ScreenerError::Configuration(
                "compound keyword rule without keywords".to_string(),
            ));
        }

        if let Some(keyword) = self
            .lexicon
            .compound_keywords
            .iter()
            .flatten()
            .find(|keyword| normalize(keyword).as_str().contains(' '))
        {
            return Err(ScreenerError::Configuration(format!(
                "compound keyword '{}' must be a single word",
                keyword
            )));
        }

        Ok(())
    }

    /// Effective worker count for the batch runner.
    pub fn worker_count(&self) -> usize {
        match self.screening.max_workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}
