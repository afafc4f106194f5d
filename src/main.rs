//! CLI entry point for the meal-choice analysis.
//!
//! Provides subcommands for running the full report, exporting the expanded
//! per-order dataset, and logging the descriptive share table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meal_choice::config::AnalysisConfig;
use meal_choice::describe::vegetarian_shares;
use meal_choice::expand::{CodePolicy, expand};
use meal_choice::output::{print_pretty, print_shares, write_orders, write_report};
use meal_choice::parser::read_aggregates;
use meal_choice::report::run_analysis;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "meal_choice")]
#[command(about = "Logistic-regression analysis of vegetarian meal choice across two hotels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole analysis and write tables and report.json
    Report {
        /// Aggregated meal counts exported from the spreadsheet as CSV
        #[arg(short, long, value_name = "CSV")]
        input: PathBuf,

        /// Directory to write the outputs to
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,

        /// Optional JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Expand aggregated counts into one row per meal order
    Expand {
        #[arg(short, long, value_name = "CSV")]
        input: PathBuf,

        /// CSV file to write the orders to
        #[arg(short, long, default_value = "orders.csv")]
        output: PathBuf,

        /// Gzip compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Record unmapped codes as missing instead of failing
        #[arg(long, default_value_t = false)]
        lenient: bool,
    },
    /// Log vegetarian shares per hotel and intervention
    Describe {
        #[arg(short, long, value_name = "CSV")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/meal_choice.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("meal_choice.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            input,
            output_dir,
            config,
        } => {
            let config = match config {
                Some(path) => AnalysisConfig::load(&path)?,
                None => AnalysisConfig::default(),
            };
            let delimiter = config.delimiter()?;

            let records = read_aggregates(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let report = run_analysis(&records, &config)?;
            print_pretty(&report);

            let written = write_report(&output_dir, &report, &config.display, delimiter)?;
            info!(
                files = written.len(),
                co2_reduction_percent = report.co2.reduction_percent,
                "Analysis complete"
            );
        }
        Commands::Expand {
            input,
            output,
            gzip,
            lenient,
        } => {
            let policy = if lenient {
                CodePolicy::Lenient
            } else {
                CodePolicy::Strict
            };
            let records = read_aggregates(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let orders = expand(&records, policy)?;
            write_orders(&output, &orders, b',', gzip)?;
        }
        Commands::Describe { input } => {
            let records = read_aggregates(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let orders = expand(&records, CodePolicy::Strict)?;
            print_shares(&vegetarian_shares(&orders));
        }
    }

    Ok(())
}
