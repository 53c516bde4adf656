//! CLI for the fd-features pipeline.
//!
//! Turns a raw quarterly fundamentals CSV into a feature matrix and binary
//! outperformance labels, and manages the ticker universe that restricts it.

use clap::{Parser, Subcommand};
use fd_features::{
    FeaturePipeline, PipelineConfig, Result,
    export::{write_features, write_labels},
    universe::{read_universe, write_universe},
};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fd-features")]
#[command(about = "Quarterly fundamentals feature pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the feature matrix and labels from a fundamentals file
    Build {
        /// Raw fundamentals CSV
        #[arg(short, long)]
        input: PathBuf,
        /// Directory receiving features.csv and labels.csv
        #[arg(short, long)]
        output_dir: PathBuf,
        /// JSON configuration; defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Ticker list restricting the loaded entities
        #[arg(short, long)]
        universe: Option<PathBuf>,
        /// Override the forward-fill limit
        #[arg(long)]
        fill_limit: Option<usize>,
    },
    /// Write the tickers found in a fundamentals file
    Universe {
        /// Raw fundamentals CSV
        #[arg(short, long)]
        input: PathBuf,
        /// Output ticker list
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the default configuration as JSON
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Build {
            input,
            output_dir,
            config,
            universe,
            fill_limit,
        } => build(
            &input,
            &output_dir,
            config.as_deref(),
            universe.as_deref(),
            fill_limit,
        ),
        Commands::Universe { input, output } => universe(&input, &output),
        Commands::Config => print_default_config(),
    };

    if let Err(err) = outcome {
        error!(%err, "fd-features failed");
        std::process::exit(1);
    }
}

/// Resolve the configuration from an optional file and CLI overrides.
fn load_config(path: Option<&Path>, fill_limit: Option<usize>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(limit) = fill_limit {
        config.fill_limit = limit;
    }
    Ok(config)
}

fn build(
    input: &Path,
    output_dir: &Path,
    config: Option<&Path>,
    universe: Option<&Path>,
    fill_limit: Option<usize>,
) -> Result<()> {
    let pipeline = FeaturePipeline::new(load_config(config, fill_limit)?)?;
    let universe = universe.map(read_universe).transpose()?;

    let features = pipeline.run_csv(input, universe.as_ref())?;

    std::fs::create_dir_all(output_dir)?;
    write_features(output_dir.join("features.csv"), &features)?;
    write_labels(output_dir.join("labels.csv"), &features)?;

    let (rows, columns) = features.features().dim();
    info!(
        rows,
        columns,
        positive_rate = features.positive_rate(),
        norm = features.norm(),
        "build finished"
    );
    Ok(())
}

fn universe(input: &Path, output: &Path) -> Result<()> {
    let pipeline = FeaturePipeline::new(PipelineConfig::default())?;
    let entities = pipeline.load(input, None)?.entities()?;
    write_universe(output, &entities)?;
    info!(tickers = entities.len(), path = %output.display(), "wrote universe");
    Ok(())
}

fn print_default_config() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
    Ok(())
}
