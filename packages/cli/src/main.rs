#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime incident analysis toolchain.
//!
//! Reads an incident CSV export, runs the requested part of the analysis,
//! and writes the result as JSON to stdout or a file.
//!
//! Uses `indicatif-log-bridge` (via [`crime_analysis_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the stage bar never fight for the terminal.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crime_analysis_analytics::{
    aggregate_hotspots, load_records, run_pipeline, run_pipeline_parallel,
};
use crime_analysis_analytics_models::{AnalysisConfig, HotspotGrouping, TimeBucket};
use crime_analysis_cli_utils::IndicatifProgress;
use crime_analysis_ingest::read_csv;
use crime_analysis_ingest_models::RawTable;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "crime_analysis", about = "Crime incident analysis toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis: hotspots, precision matrix, prediction model,
    /// recommendations and summary stats
    Analyze {
        /// Incident CSV export
        input: PathBuf,
        #[command(flatten)]
        options: AnalysisArgs,
        /// Run the independent analyses on parallel tasks
        #[arg(long)]
        parallel: bool,
    },
    /// Rank hotspots by city and/or time bucket
    Hotspots {
        /// Incident CSV export
        input: PathBuf,
        /// Grouping key
        #[arg(long, value_enum, default_value = "city")]
        by: GroupBy,
        /// Only report the highest-ranked groups
        #[arg(long)]
        top: Option<usize>,
        #[command(flatten)]
        options: AnalysisArgs,
    },
    /// Check the input schema and report normalization diagnostics only
    Diagnose {
        /// Incident CSV export
        input: PathBuf,
        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Produce the dashboard summary (totals, monthly trend, top types,
    /// peak hours, prediction accuracy)
    Stats {
        /// Incident CSV export
        input: PathBuf,
        #[command(flatten)]
        options: AnalysisArgs,
    },
}

/// Configuration file, overrides, and output shared by the analysis
/// commands.
#[derive(Args)]
struct AnalysisArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Random seed for the train/test split and the forest
    #[arg(long)]
    seed: Option<u64>,
    /// Fraction of rows placed in the training split
    #[arg(long)]
    train_ratio: Option<f64>,
    /// Graphical lasso L1 penalty
    #[arg(long)]
    alpha: Option<f64>,
    /// Minimum non-null observations for a precision-matrix feature
    #[arg(long)]
    min_nonnull: Option<usize>,
}

impl AnalysisArgs {
    fn load_config(&self) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if let Some(ratio) = self.train_ratio {
            config.train_test_ratio = ratio;
        }
        if let Some(alpha) = self.alpha {
            config.graphical_lasso_alpha = alpha;
        }
        if let Some(min_nonnull) = self.min_nonnull {
            config.min_nonnull_for_precision = min_nonnull;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    City,
    Hour,
    DayOfWeek,
    Month,
    CityHour,
    CityDayOfWeek,
    CityMonth,
}

impl From<GroupBy> for HotspotGrouping {
    fn from(by: GroupBy) -> Self {
        match by {
            GroupBy::City => Self::Location,
            GroupBy::Hour => Self::Time(TimeBucket::Hour),
            GroupBy::DayOfWeek => Self::Time(TimeBucket::DayOfWeek),
            GroupBy::Month => Self::Time(TimeBucket::Month),
            GroupBy::CityHour => Self::LocationAndTime(TimeBucket::Hour),
            GroupBy::CityDayOfWeek => Self::LocationAndTime(TimeBucket::DayOfWeek),
            GroupBy::CityMonth => Self::LocationAndTime(TimeBucket::Month),
        }
    }
}

fn read_table(path: &Path) -> Result<RawTable, Box<dyn std::error::Error>> {
    log::info!("Reading incidents from {}", path.display());
    let file = File::open(path)?;
    Ok(read_csv(BufReader::new(file))?)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        log::info!("Wrote {}", path.display());
    } else {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        serde_json::to_writer_pretty(&mut lock, value)?;
        lock.write_all(b"\n")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_analysis_cli_utils::init_logger();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Analyze {
            input,
            options,
            parallel,
        } => {
            let config = options.load_config()?;
            let table = read_table(&input)?;
            let progress = IndicatifProgress::stages_bar(&multi, "Analyzing");
            let report = if parallel {
                run_pipeline_parallel(&table, &config, progress).await?
            } else {
                run_pipeline(&table, &config, progress.as_ref())?
            };
            write_json(&report, options.output.as_deref())?;
        }
        Commands::Hotspots {
            input,
            by,
            top,
            options,
        } => {
            let config = options.load_config()?;
            let table = read_table(&input)?;
            let loaded = load_records(&table, &config)?;
            let mut report = aggregate_hotspots(&loaded.records, by.into());
            if let Some(top) = top {
                report.hotspots.truncate(top);
            }
            write_json(&report, options.output.as_deref())?;
        }
        Commands::Diagnose { input, output } => {
            let batch = crime_analysis_ingest::normalize_csv_path(&input)?;
            write_json(&batch.diagnostics, output.as_deref())?;
        }
        Commands::Stats { input, options } => {
            let config = options.load_config()?;
            let table = read_table(&input)?;
            let progress = IndicatifProgress::stages_bar(&multi, "Summarizing");
            let report = run_pipeline(&table, &config, progress.as_ref())?;
            write_json(&report.stats, options.output.as_deref())?;
        }
    }

    log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
