//! `predict`: reads `{"rows": [...]}` on stdin, runs the ONNX pipeline and
//! prints one JSON line on stdout.

use clap::Parser;
use exopredict::bridge::{handler, types::PredictResponse};
use exopredict::config::{repo_root_for, AppConfig, Settings, FEATURE_ORDER_ENV};
use exopredict::model::loader;
use exopredict::{Classifier, ErrorResponse, InferenceError};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "predict")]
#[command(about = "Run a serialized classification pipeline over JSON rows", long_about = None)]
struct Cli {
    /// Path to the ONNX pipeline (defaults to public/models/exoplanet_xgb_pipeline.onnx)
    model_path: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the response only; logs go to stderr.
    let default_level = if cli.verbose { "debug" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let feature_order = std::env::var(FEATURE_ORDER_ENV).ok();
    let outcome = run(&cli, feature_order.as_deref());

    let mut stdout = io::stdout().lock();
    match outcome {
        Ok(response) => {
            writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
            stdout.flush()?;
            Ok(())
        }
        Err(err) => {
            eprintln!("predict error: {err}");
            writeln!(stdout, "{}", serde_json::to_string(&ErrorResponse::from(&err))?)?;
            stdout.flush()?;
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli, feature_order: Option<&str>) -> Result<PredictResponse, InferenceError> {
    // 1. Settings
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    let repo_root = std::env::current_exe()
        .map(|exe| repo_root_for(&exe))
        .unwrap_or_else(|_| PathBuf::from("."));
    let settings = Settings::resolve(
        cli.model_path.clone(),
        feature_order,
        config,
        &repo_root,
    );

    // 2. Runtime check, then the model
    loader::ensure_dependencies()?;
    let mut model = loader::load_model(&settings.model_path, &settings.session)?;
    debug!(
        path = %model.path().display(),
        capability = ?model.capability(),
        "model ready"
    );

    // 3. Request
    let mut payload = String::new();
    io::stdin().read_to_string(&mut payload)?;

    handler::predict(&mut model, &payload, settings.feature_order.as_deref())
}
