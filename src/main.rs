//! cv-screener: batch CV screening against recruiter criteria

use clap::Parser;
use cv_screener::cli::{self, Cli, Commands, ConfigAction, CriteriaArgs};
use cv_screener::config::{Config, OutputFormat};
use cv_screener::error::{Result, ScreenerError};
use cv_screener::input::FileType;
use cv_screener::output::{formatter_for, save_report_to_file, suggest_filename};
use cv_screener::processing::BatchRunner;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, cli.config).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

async fn run_command(command: Commands, config: Config, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Screen {
            files,
            university,
            major,
            nationality,
            keywords,
            university_synonyms,
            major_synonyms,
            nationality_synonyms,
            threshold,
            output,
            save,
            detailed,
            no_override,
        } => {
            let output_format =
                cli::parse_output_format(&output).map_err(ScreenerError::InvalidInput)?;

            let criteria = CriteriaArgs {
                university,
                major,
                nationality,
                keywords,
                university_synonyms,
                major_synonyms,
                nationality_synonyms,
                threshold: threshold.unwrap_or(config.screening.threshold),
                keyword_override: !no_override,
            }
            .into_criteria();
            criteria.validate()?;

            let runner = BatchRunner::new(&config)?;

            let mut documents = Vec::with_capacity(files.len());
            for path in &files {
                if !FileType::from_path(path).is_supported() {
                    warn!(
                        "{}: unsupported file type, it will be reported as not screened",
                        path.display()
                    );
                }
                match runner.input_manager().read_upload(path).await {
                    Ok(document) => documents.push(document),
                    Err(e) => warn!("Skipping {}: {}", path.display(), e),
                }
            }
            if documents.is_empty() {
                return Err(ScreenerError::InvalidInput(
                    "None of the given files could be read".to_string(),
                ));
            }

            let cancel = runner.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted; finishing documents already started");
                    cancel.cancel();
                }
            });

            let progress = ProgressBar::new(documents.len() as u64);
            progress.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                    .map_err(|e| ScreenerError::OutputFormatting(e.to_string()))?,
            );

            let report = runner
                .run_with_progress(documents, &criteria, |verdict| {
                    progress.set_message(verdict.document_id.clone());
                    progress.inc(1);
                })
                .await?;
            progress.finish_and_clear();

            let formatter = formatter_for(
                output_format,
                config.output.color_output,
                detailed || config.output.detailed,
            );
            let content = formatter.format_report(&report)?;
            println!("{}", content);

            if let Some(path) = save {
                let path = path
                    .unwrap_or_else(|| PathBuf::from(suggest_filename(&output_format, true)));
                let saved = match output_format {
                    OutputFormat::Console => {
                        formatter_for(output_format, false, true).format_report(&report)?
                    }
                    OutputFormat::Json => content,
                };
                save_report_to_file(&saved, &path)?;
                info!("Report saved to {}", path.display());
            }
        }

        Commands::Config { action } => {
            let path = config_path.unwrap_or_else(Config::config_path);
            match action {
                Some(ConfigAction::Show) | None => {
                    let content = toml::to_string_pretty(&config).map_err(|e| {
                        ScreenerError::Configuration(format!("Failed to serialize config: {}", e))
                    })?;
                    println!("# {}\n{}", path.display(), content);
                }

                Some(ConfigAction::Reset) => {
                    Config::default().save_to(&path)?;
                    println!("Configuration reset: {}", path.display());
                }

                Some(ConfigAction::Path) => {
                    println!("{}", path.display());
                }
            }
        }
    }

    Ok(())
}
