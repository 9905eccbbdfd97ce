//! pcb-step-export: circuit board to STEP solid model converter
//!
//! Reads a JSON circuit description and writes a STEP file containing the
//! board and its components.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use pcb_step_export::assembly::Converter;
use pcb_step_export::circuit::parse_circuit_json;
use pcb_step_export::config;

/// Convert a circuit description into a STEP solid model.
///
/// Components with a STEP model reference are merged into the output;
/// the others are represented by boxes.
#[derive(Parser, Debug)]
#[command(name = "pcb-step-export")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Circuit description (JSON array of records)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output STEP file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Product and board solid name
    #[arg(long)]
    product_name: Option<String>,

    /// Board thickness in mm
    #[arg(long)]
    thickness: Option<f64>,

    /// Only export the board
    #[arg(long)]
    no_components: bool,

    /// Use boxes instead of external STEP models
    #[arg(long)]
    no_external_models: bool,

    /// Use a local file for a model reference (REF=PATH, repeatable)
    #[arg(long = "model", value_name = "REF=PATH", value_parser = parse_model_override)]
    models: Vec<(String, PathBuf)>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

fn parse_model_override(value: &str) -> Result<(String, PathBuf), String> {
    match value.rsplit_once('=') {
        Some((reference, path)) if !reference.is_empty() && !path.is_empty() => {
            Ok((reference.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected REF=PATH, got '{value}'")),
    }
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the input and model overrides, converts and writes the result.
async fn run(args: Args, cfg: config::Config) -> Result<usize, String> {
    let text = tokio::fs::read_to_string(&args.input)
        .await
        .map_err(|e| format!("failed to read {}: {e}", args.input.display()))?;
    let records = parse_circuit_json(&text)
        .map_err(|e| format!("invalid circuit description {}: {e}", args.input.display()))?;

    let mut options = cfg.conversion.to_options();
    if let Some(name) = args.product_name {
        options.product_name = name;
    }
    options.board_thickness = args.thickness;
    options.include_components &= !args.no_components;
    options.include_external_models &= !args.no_external_models;
    for (reference, path) in args.models {
        let model = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("failed to read model {}: {e}", path.display()))?;
        options.preloaded_models.insert(reference, model);
    }

    let conversion = Converter::new(options)
        .convert(&records)
        .await
        .map_err(|e| e.to_string())?;

    for warning in &conversion.warnings {
        warn!(component = %warning.component, "{}", warning.message);
    }

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, conversion.step.as_bytes())
                .await
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            info!(path = %path.display(), "Wrote STEP file");
        }
        None => print!("{}", conversion.step),
    }
    Ok(conversion.solid_count)
}

/// Entry point for pcb-step-export.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        input = %args.input.display(),
        "Starting conversion"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args, cfg)) {
        Ok(solids) => {
            info!(solids, "Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Conversion failed");
            ExitCode::FAILURE
        }
    }
}
