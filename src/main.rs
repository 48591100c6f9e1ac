//! Rainfall simulator entry point: CLI wiring and config-driven batch runs.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, EvaluateArgs, ForecastArgs};
use rainfall_sim::config::ForecastConfig;
use rainfall_sim::error::{ForecastError, Result};
use rainfall_sim::evaluation::build_evaluation_table;
use rainfall_sim::io::export::{export_evaluation_csv, export_forecast_csv};
use rainfall_sim::io::import::load_csv;
use rainfall_sim::model::ModelRegistry;
use rainfall_sim::sim::batch::{BatchReport, BatchRunner, ForecastRequest};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints every config error and fails if there were any.
fn check(cfg: &ForecastConfig) -> Result<()> {
    let errors = cfg.validate();
    if errors.is_empty() {
        return Ok(());
    }
    for e in &errors {
        eprintln!("{e}");
    }
    Err(ForecastError::Config(format!(
        "{} invalid setting(s)",
        errors.len()
    )))
}

fn config_error(e: impl std::fmt::Display) -> ForecastError {
    ForecastError::Config(e.to_string())
}

/// Loads data and models, then runs one request for every model.
fn run_forecast(args: &ForecastArgs) -> Result<(ForecastConfig, ForecastRequest, BatchReport)> {
    let cfg = args.resolve_config().map_err(config_error)?;
    check(&cfg)?;
    let start = cfg.start_date().map_err(config_error)?;
    let end = cfg.end_date().map_err(config_error)?;

    let imported = load_csv(&args.data, &cfg.data)?;

    let mut registry = ModelRegistry::new();
    let mut names = Vec::with_capacity(args.models.len());
    for path in &args.models {
        let model = registry.load_linear(path).map_err(config_error)?;
        info!(model = %model.name, kind = %model.kind, "model loaded");
        names.push(model.name.clone());
    }

    let request = ForecastRequest::new(args.district.clone(), names, start, end);
    let mut runner = BatchRunner::new(
        &imported.data,
        &registry,
        cfg.sim_config(),
        cfg.simulation.seed,
    );
    let report = runner.run(std::slice::from_ref(&request));
    Ok((cfg, request, report))
}

/// Prints the table, reports failures, and writes the CSV if requested.
fn present(args: &ForecastArgs, request: &ForecastRequest, report: &BatchReport) -> Result<()> {
    let table = report.table(request);
    println!("{table}");

    for f in &report.failures {
        eprintln!("error: {} / {}: {}", f.district, f.model, f.error);
    }

    if let Some(path) = &args.out {
        export_forecast_csv(&table, path)?;
        eprintln!("Forecast written to {}", path.display());
    }
    Ok(())
}

fn forecast(args: &ForecastArgs) -> Result<ExitCode> {
    let (_, request, report) = run_forecast(args)?;
    present(args, &request, &report)?;
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn evaluate(args: &EvaluateArgs) -> Result<ExitCode> {
    let cfg = args.config.load().map_err(config_error)?;
    check(&cfg)?;

    let imported = load_csv(&args.data, &cfg.data)?;
    let table = build_evaluation_table(
        &imported.data,
        args.district.as_deref(),
        &cfg.evaluation,
        cfg.sim_config().features,
    )?;
    export_evaluation_csv(&table, &args.out)?;
    eprintln!(
        "Evaluation table for {} ({} of {} rows) written to {}",
        imported.data.name(&table.district),
        table.rows.len(),
        table.total_rows,
        args.out.display()
    );
    Ok(ExitCode::SUCCESS)
}

#[cfg(feature = "api")]
fn serve(args: &cli::ServeArgs) -> Result<ExitCode> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use rainfall_sim::api::{self, AppState};

    let (cfg, request, report) = run_forecast(&args.forecast)?;
    present(&args.forecast, &request, &report)?;

    let state = Arc::new(AppState::new(request, cfg, report));
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(api::serve(state, addr))?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let outcome = match &cli.command {
        Command::Forecast(args) => forecast(args),
        Command::Evaluate(args) => evaluate(args),
        #[cfg(feature = "api")]
        Command::Serve(args) => serve(args),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
