use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use feed_conversion::logging::init_logging;
use feed_conversion::{
    run_flow, ConversionReport, CsvCatalogue, CsvSource, FileSink, MemorySink, NanPolicy,
    RunConfig,
};

/// Compute feed-conversion ratios for breeding batches from CSV exports.
#[derive(Debug, Parser)]
#[command(name = "feed-conversion", version)]
struct Cli {
    /// Breeding initial-parameter rows
    #[arg(long)]
    init_params: PathBuf,

    /// Weight / consumption rows
    #[arg(long)]
    measurements: PathBuf,

    /// TOML run configuration; catalogue paths resolve relative to it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file (.csv or .parquet)
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    formula_version: Option<String>,

    /// clamp_to_zero | exclude_row
    #[arg(long)]
    nan_policy: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    json_logs: bool,

    /// Also write JSON logs into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(version) = &cli.formula_version {
        config.formula_version = version.clone();
    }
    if let Some(policy) = &cli.nan_policy {
        config.nan_policy = policy.parse::<NanPolicy>()?;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.logging.json |= cli.json_logs;
    if let Some(dir) = &cli.log_dir {
        config.logging.directory = Some(dir.clone());
    }

    init_logging(&config.logging).context("initializing logging")?;

    let base_path = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    let catalogue = CsvCatalogue::new(base_path, config.reference.clone());
    let source = CsvSource::new(&cli.init_params, &cli.measurements);
    let pipeline = config.pipeline();

    let report = match &cli.output {
        Some(path) => run_flow(&source, &catalogue, &mut FileSink::new(path), &pipeline)
            .with_context(|| format!("writing {}", path.display()))?,
        None => run_flow(&source, &catalogue, &mut MemorySink::new(), &pipeline)
            .context("computing conversions")?,
    };

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &ConversionReport) {
    if report.no_data {
        println!("no data: nothing computed");
        return;
    }
    println!("records: {}", report.records.len());
    if !report.dropped_batches.is_empty() {
        println!("dropped batches (no stock): {:?}", report.dropped_batches);
    }
    if report.excluded_rows > 0 {
        println!("rows excluded (undefined ratio): {}", report.excluded_rows);
    }
}
