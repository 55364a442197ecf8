//! rivice CLI - daily river-ice index time series

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rivice_algorithms::imagery::{IndexDefinition, IndexKind};
use rivice_catalog::{Catalog, LocalCatalog};
use rivice_pipeline::{CsvSink, JsonSink, Pipeline, PipelineConfig, TableSink};

/// Workspace crate targets that receive log output.
const CRATE_TARGETS: &[&str] = &[
    "rivice",
    "rivice_core",
    "rivice_algorithms",
    "rivice_catalog",
    "rivice_pipeline",
];

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "rivice")]
#[command(author, version, about = "Daily spectral water/ice index time series", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and write the time-series table
    Run {
        /// Run configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,
        /// Imagery catalog directory
        #[arg(short, long)]
        imagery: PathBuf,
        /// Cloud-probability catalog directory
        #[arg(short, long)]
        probability: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Table format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,
    },
    /// List the indices a configuration computes
    Indices {
        /// Run configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the imagery scenes a configuration selects
    Scenes {
        /// Run configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,
        /// Imagery catalog directory
        #[arg(short, long)]
        imagery: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

// ─── Helpers ────────────────────────────────────────────────────────────

/// 0 → warn, 1 → info, 2 → debug, 3+ → trace; `RUST_LOG` wins when set.
fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let default_filter = CRATE_TARGETS
        .iter()
        .map(|t| format!("{t}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}

fn open_catalog(path: &Path) -> Result<LocalCatalog> {
    LocalCatalog::open(path).with_context(|| format!("Failed to open catalog {}", path.display()))
}

fn describe(def: &IndexDefinition) -> String {
    match def.kind() {
        IndexKind::NormalizedDifference { a, b } => format!("({a} - {b}) / ({a} + {b})"),
        IndexKind::Expression(formula) => formula.source().to_string(),
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            imagery,
            probability,
            output,
            format,
        } => {
            let config = load_config(&config)?;
            let pipeline = Pipeline::from_config(&config).context("Invalid configuration")?;
            let imagery = open_catalog(&imagery)?.with_aliases(config.band_aliases());
            let probability = open_catalog(&probability)?.with_aliases(config.band_aliases());

            info!(
                start = %config.start_date,
                end = %config.end_date,
                indices = pipeline.indices().len(),
                "starting run"
            );

            let pb = spinner("Processing scenes...");
            let start = Instant::now();
            let table = pipeline.run(&imagery, &probability);
            pb.finish_and_clear();
            let table = table.context("Pipeline failed")?;
            let elapsed = start.elapsed();

            let sink: Box<dyn TableSink> = match format {
                Format::Csv => Box::new(CsvSink::new(output)),
                Format::Json => Box::new(JsonSink::new(output)),
            };
            let path = sink
                .write(&table, &config.output_name)
                .context("Failed to write table")?;

            println!("Time series saved to: {}", path.display());
            println!("  Dates: {}", table.len());
            println!("  Processing time: {:.2?}", elapsed);
        }

        Commands::Indices { config } => {
            let config = load_config(&config)?;
            for def in config.index_definitions()? {
                println!("{:<16} {}", def.name(), describe(&def));
            }
        }

        Commands::Scenes { config, imagery } => {
            let config = load_config(&config)?;
            let roi = config.region()?;
            let query = config.query(&roi)?;
            let catalog = open_catalog(&imagery)?.with_aliases(config.band_aliases());

            let pb = spinner("Querying catalog...");
            let scenes = catalog.query(&query);
            pb.finish_and_clear();
            let scenes = scenes.context("Catalog query failed")?;

            for scene in &scenes {
                let cloud = scene
                    .metadata(&query.cloud_cover_key)
                    .map(|c| format!("{:.1}%", c))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {}  cloud {}",
                    scene.timestamp().format("%Y-%m-%d %H:%M:%S"),
                    scene.id(),
                    cloud
                );
            }
            println!("{} scene(s)", scenes.len());
        }
    }

    Ok(())
}
