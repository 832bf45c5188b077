//! Fusion CLI - Command-line interface for health fusion
//!
//! Commands:
//! - merge: Merge one day's multi-source request into a single snapshot
//! - sources: Print the active source registry with ranks
//! - check-config: Validate registry and configuration files

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use health_fusion::types::FusionRequest;
use health_fusion::{FusionConfig, FusionEngine, FusionError, SourceRegistry};
use health_fusion::{FUSION_VERSION, PRODUCER_NAME};

/// Fusion - Merge overlapping health telemetry into one authoritative day
#[derive(Parser)]
#[command(name = "fusion")]
#[command(author = "Synheart AI Inc")]
#[command(version = FUSION_VERSION)]
#[command(
    about = "Merge multi-source health data into one deduplicated snapshot",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a fusion request (JSON) into a merged snapshot
    Merge {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Heart-rate bucket width in minutes (overrides config and request)
        #[arg(long)]
        window_minutes: Option<i64>,

        /// Source registry file (JSON array of descriptors)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the active source registry
    Sources {
        /// Source registry file (defaults to the built-in table)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate registry and configuration files
    CheckConfig {
        /// Source registry file
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "health_fusion=info,fusion=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FusionCliError> {
    match cli.command {
        Commands::Merge {
            input,
            output,
            format,
            window_minutes,
            sources,
            config,
        } => cmd_merge(
            &input,
            &output,
            format,
            window_minutes,
            sources.as_deref(),
            config.as_deref(),
        ),

        Commands::Sources { sources, json } => cmd_sources(sources.as_deref(), json),

        Commands::CheckConfig { sources, config } => {
            cmd_check_config(sources.as_deref(), config.as_deref())
        }
    }
}

fn cmd_merge(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    window_minutes: Option<i64>,
    sources: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), FusionCliError> {
    let engine = load_engine(sources, config)?;

    let input_data = read_input(input)?;
    let mut request: FusionRequest = serde_json::from_str(&input_data)
        .map_err(|e| FusionCliError::ParseError(format!("Failed to parse fusion request: {}", e)))?;

    if let Some(minutes) = window_minutes {
        request.window_override_ms = Some(minutes.saturating_mul(60_000));
    }

    if request.snapshots.is_empty() {
        warn!("request contains no source snapshots");
    }

    info!(
        sources = request.snapshots.len(),
        workouts = request.workouts.len(),
        "merging request"
    );

    let merged = engine.merge_request(&request);
    for issue in &merged.issues {
        debug!(code = issue.code.as_str(), "{}", issue.message);
    }

    let output_data = match format {
        OutputFormat::Json => serde_json::to_string(&merged)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&merged)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_sources(sources: Option<&Path>, json: bool) -> Result<(), FusionCliError> {
    let registry = load_registry(sources)?;

    let rows: Vec<SourceRow> = registry
        .iter()
        .map(|s| SourceRow {
            id: s.id.clone(),
            name: s.name.clone(),
            priority: s.priority,
            reliability: s.reliability,
            rank: registry.rank_of(&s.id),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Source Registry");
        println!("===============");
        println!("{:<16} {:>4} {:>8} {:>11}  NAME", "ID", "RANK", "PRIORITY", "RELIABILITY");
        for row in &rows {
            println!(
                "{:<16} {:>4} {:>8} {:>11.2}  {}",
                row.id,
                row.rank,
                row.priority,
                row.reliability,
                row.name.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}

fn cmd_check_config(sources: Option<&Path>, config: Option<&Path>) -> Result<(), FusionCliError> {
    let engine = load_engine(sources, config)?;

    println!("{} {}", PRODUCER_NAME, FUSION_VERSION);
    println!("  [OK] registry: {} sources", engine.registry().len());
    println!(
        "  [OK] config: {} ms heart-rate window, {:?} policy",
        engine.config().series_window_ms,
        engine.config().series_policy
    );

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, FusionCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_registry(sources: Option<&Path>) -> Result<SourceRegistry, FusionCliError> {
    match sources {
        Some(path) => Ok(SourceRegistry::from_json(&fs::read_to_string(path)?)?),
        None => Ok(SourceRegistry::default()),
    }
}

fn load_engine(
    sources: Option<&Path>,
    config: Option<&Path>,
) -> Result<FusionEngine, FusionCliError> {
    let registry = load_registry(sources)?;
    let config = match config {
        Some(path) => FusionConfig::from_json(&fs::read_to_string(path)?)?,
        None => FusionConfig::default(),
    };
    Ok(FusionEngine::new(registry, config)?)
}

// Error types

#[derive(Debug)]
enum FusionCliError {
    Io(io::Error),
    Fusion(FusionError),
    Json(serde_json::Error),
    ParseError(String),
}

impl From<io::Error> for FusionCliError {
    fn from(e: io::Error) -> Self {
        FusionCliError::Io(e)
    }
}

impl From<FusionError> for FusionCliError {
    fn from(e: FusionError) -> Self {
        FusionCliError::Fusion(e)
    }
}

impl From<serde_json::Error> for FusionCliError {
    fn from(e: serde_json::Error) -> Self {
        FusionCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FusionCliError> for CliError {
    fn from(e: FusionCliError) -> Self {
        match e {
            FusionCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FusionCliError::Fusion(e) => {
                let hint = match e {
                    FusionError::InvalidRegistry(_) => "Check the --sources file",
                    FusionError::InvalidConfig(_) | FusionError::InvalidWindow(_) => {
                        "Check the --config file"
                    }
                    _ => "Check input format",
                };
                CliError {
                    code: "FUSION_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FusionCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FusionCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some(
                    "Input must be a fusion request with a \"snapshots\" object".to_string(),
                ),
            },
        }
    }
}

#[derive(serde::Serialize)]
struct SourceRow {
    id: String,
    name: Option<String>,
    priority: i32,
    reliability: f64,
    rank: usize,
}
