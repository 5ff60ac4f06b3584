use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

use hei_score::config::Config;
use hei_score::scoring::{ScoreReport, ScoringEngine};
use hei_score::Catalog;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_INPUT: i32 = 2;
const EXIT_PARTIAL: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Table,
    Tsv,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score every subject in an intake table
    Score {
        /// CSV or TSV file with one row per subject
        input: PathBuf,

        /// Write results to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Worker threads (defaults to available parallelism; 1 scores sequentially)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// List the categories of the configured catalog
    Catalog,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "hei-score")]
#[command(about = "Healthy Eating Index scoring CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging and per-subject breakdowns
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/hei-score/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.map(PathBuf::from);

    match cli.command {
        Commands::Init { force } => {
            let path = match config_path {
                Some(p) => p,
                None => match hei_score::config::get_config_path() {
                    Ok(p) => p,
                    Err(e) => {
                        eprintln!("Config error: {:#}", e);
                        std::process::exit(EXIT_CONFIG);
                    }
                },
            };
            if let Err(e) = hei_score::config::write_default_config(&path, force) {
                eprintln!("Config error: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            println!("Wrote default config to {}", path.display());
        }
        Commands::Catalog => {
            let (_config, catalog) = load_validated(config_path, cli.verbose);
            let use_colors = hei_score::output::should_use_colors();
            println!("{}", hei_score::output::format_catalog(&catalog, use_colors));
        }
        Commands::Score {
            input,
            output,
            format,
            workers,
        } => {
            let (config, catalog) = load_validated(config_path, cli.verbose);
            let start_time = Instant::now();

            let report = match run_scoring(&config, catalog.clone(), &input, workers) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Input error: {:#}", e);
                    std::process::exit(EXIT_INPUT);
                }
            };

            // Colors only when rendering straight to a terminal
            let use_colors = output.is_none() && hei_score::output::should_use_colors();
            let rendered = match format {
                Format::Table => hei_score::output::format_score_table(&report, use_colors),
                Format::Tsv => hei_score::output::format_tsv(&report),
                Format::Json => match hei_score::output::format_json(&report) {
                    Ok(json) => json,
                    Err(e) => {
                        eprintln!("Failed to render JSON: {}", e);
                        std::process::exit(EXIT_INPUT);
                    }
                },
            };

            match &output {
                Some(path) => {
                    if let Err(e) = hei_score::output::write_output(path, &rendered) {
                        eprintln!("Output error: {:#}", e);
                        std::process::exit(EXIT_INPUT);
                    }
                    tracing::info!(path = %path.display(), subjects = report.scored.len(), "wrote results");
                }
                None => println!("{}", rendered),
            }

            if cli.verbose {
                for subject in &report.scored {
                    eprintln!();
                    eprintln!(
                        "{}",
                        hei_score::output::format_breakdown(subject, &catalog, false)
                    );
                }
                eprintln!();
                eprintln!(
                    "Total: {} scored, {} failed in {:?}",
                    report.scored.len(),
                    report.failures.len(),
                    start_time.elapsed()
                );
            }

            if !report.failures.is_empty() {
                eprintln!("{} subject(s) could not be scored:", report.failures.len());
                for line in hei_score::output::format_failures(&report) {
                    eprintln!("  - {}", line);
                }
                // Nothing scored at all is an input error, not a partial success
                if report.scored.is_empty() {
                    std::process::exit(EXIT_INPUT);
                }
                std::process::exit(EXIT_PARTIAL);
            }
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

/// Load config, install logging, validate, and resolve the catalog.
/// Exits with `EXIT_CONFIG` on any failure.
fn load_validated(config_path: Option<PathBuf>, verbose: bool) -> (Config, Catalog) {
    let config = match hei_score::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let level = hei_score::telemetry::resolve_level(verbose, config.log_level.as_deref());
    if let Err(e) = hei_score::telemetry::init(&level, config.log_file.as_deref()) {
        eprintln!("Config error: {:#}", anyhow::Error::from(e));
        std::process::exit(EXIT_CONFIG);
    }

    // Validate config at startup
    if let Err(errors) = hei_score::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let catalog = match config.catalog.build() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    (config, catalog)
}

/// Load the table, apply unit conversions, and score it.
fn run_scoring(
    config: &Config,
    catalog: Catalog,
    input: &Path,
    workers: Option<usize>,
) -> anyhow::Result<ScoreReport> {
    let mut table = hei_score::table::load_table(input, &config.subject_column)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    table
        .apply_conversions(&config.conversions)
        .context("Failed to apply unit conversions")?;
    tracing::info!(subjects = table.len(), path = %input.display(), "loaded intake table");

    let mut engine = ScoringEngine::new(catalog, &table, &config.energy_column)?;
    engine.compose_plan(&config.composition)?;

    let workers = workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let report = if workers <= 1 {
        engine.score()?
    } else {
        engine.score_partitioned(workers)?
    };
    Ok(report)
}
