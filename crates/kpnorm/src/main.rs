//! kpnorm: validate and normalize keypoint annotations from the command line.
//!
//! Reads a JSON document of raw point positions (or, with `--categories`,
//! an object of keypoint categories keyed by label id), runs it through
//! the validation pipeline and prints the normalized result as JSON.
//! Useful for:
//!
//! - Checking dataset annotation files before import
//! - Converting flat `x1, y1, x2, y2, ...` positions to canonical pairs
//! - Inspecting how a template pose lands in the unit box
//!
//! Set `RUST_LOG=debug` to see per-field diagnostics on stderr.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin kpnorm -- [OPTIONS] [INPUT]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use kpnorm_core::{PointsCategories, PointsConfig, PointsFormat, ValidationError};

/// Validate and normalize keypoint annotations.
///
/// Prints the normalized points (or categories) as JSON on stdout.
#[derive(Parser)]
#[command(name = "kpnorm", version)]
struct Cli {
    /// Path to the input JSON document. Reads stdin when omitted or `-`.
    input: Option<PathBuf>,

    /// Accepted shape for raw point positions.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FORMAT)]
    format: Format,

    /// Extent used for an axis on which all points coincide.
    #[arg(long, default_value_t = PointsConfig::DEFAULT_DEGENERATE_EPSILON)]
    epsilon: f64,

    /// Treat the input as keypoint categories keyed by label id.
    #[arg(long)]
    categories: bool,

    /// Field name reported in errors for plain positions input.
    #[arg(long, default_value = "positions")]
    field: String,

    /// Pretty-print the output JSON.
    #[arg(long)]
    pretty: bool,

    /// Full config as a JSON string.
    ///
    /// When provided, `--format` and `--epsilon` are ignored. The JSON
    /// must be a valid `PointsConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Point input shape selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Detect pairs or flat scalars from the input.
    Auto,
    /// Interleaved scalars `x1, y1, x2, y2, ...`.
    Flat,
    /// Two-element groups `[x, y]`.
    Pairs,
}

/// Maps a [`PointsFormat`] to the local CLI [`Format`] enum.
const fn format_from_core(f: PointsFormat) -> Format {
    match f {
        PointsFormat::Auto => Format::Auto,
        PointsFormat::Flat => Format::Flat,
        PointsFormat::Pairs => Format::Pairs,
    }
}

/// The CLI default format, derived from [`PointsConfig::DEFAULT_FORMAT`]
/// so the two cannot silently diverge.
const CLI_DEFAULT_FORMAT: Format = format_from_core(PointsConfig::DEFAULT_FORMAT);

/// Errors surfaced to the user by the CLI.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error parsing --config-json: {0}")]
    ConfigJson(#[source] serde_json::Error),

    #[error("error reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("input is not valid JSON: {0}")]
    InputJson(#[source] serde_json::Error),

    #[error("malformed keypoint annotation: {0}")]
    Validation(#[from] ValidationError),

    #[error("error serializing output: {0}")]
    Output(#[source] serde_json::Error),
}

/// Build a [`PointsConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PointsConfig, CliError> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(CliError::ConfigJson)?
    } else {
        PointsConfig {
            format: match cli.format {
                Format::Auto => PointsFormat::Auto,
                Format::Flat => PointsFormat::Flat,
                Format::Pairs => PointsFormat::Pairs,
            },
            degenerate_epsilon: cli.epsilon,
        }
    };
    config.validate()?;
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read_to_string(p).map_err(|source| CliError::Read {
                path: p.display().to_string(),
                source,
            })
        }
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| CliError::Read {
                    path: "stdin".to_string(),
                    source,
                })?;
            Ok(text)
        }
    }
}

/// Validate `input` and render the normalized result as JSON.
fn run(cli: &Cli, config: &PointsConfig, input: &str) -> Result<String, CliError> {
    let value: serde_json::Value = serde_json::from_str(input).map_err(CliError::InputJson)?;

    let output = if cli.categories {
        let categories = PointsCategories::from_json_with(value, config)?;
        tracing::info!(count = categories.len(), "validated points categories");
        serde_json::to_value(&categories)
    } else {
        let points = kpnorm_core::process_positions(&cli.field, value, config)?;
        tracing::info!(count = points.len(), "validated keypoint positions");
        serde_json::to_value(&points)
    };
    let output = output.map_err(CliError::Output)?;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    };
    rendered.map_err(CliError::Output)
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = config_from_cli(&cli).and_then(|config| {
        let input = read_input(cli.input.as_deref())?;
        run(&cli, &config, &input)
    });

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
