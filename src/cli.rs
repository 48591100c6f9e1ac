use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use rainfall_sim::config::{ConfigError, ForecastConfig};

#[derive(Parser)]
#[command(name = "rainfall-sim")]
#[command(about = "Recursive monthly rainfall forecast simulator")]
#[command(version)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. "debug", "rainfall_sim=trace")
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Simulate every model for one district and print the forecast table
    Forecast(ForecastArgs),

    /// Build the labelled hold-out table for one district
    Evaluate(EvaluateArgs),

    /// Run a forecast, then serve it over HTTP
    #[cfg(feature = "api")]
    Serve(ServeArgs),
}

/// Where the configuration comes from.
#[derive(Args)]
pub struct ConfigArgs {
    /// Load configuration from a TOML file
    #[arg(long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Use a built-in preset (baseline, deterministic)
    #[arg(long)]
    pub preset: Option<String>,
}

impl ConfigArgs {
    /// `--config` takes priority, then `--preset`, then the baseline.
    pub fn load(&self) -> Result<ForecastConfig, ConfigError> {
        match (&self.config, &self.preset) {
            (Some(path), _) => ForecastConfig::from_toml_file(path),
            (None, Some(name)) => ForecastConfig::from_preset(name),
            (None, None) => Ok(ForecastConfig::baseline()),
        }
    }
}

#[derive(Args)]
pub struct ForecastArgs {
    /// Historical rainfall CSV
    #[arg(long)]
    pub data: PathBuf,

    /// District code to forecast
    #[arg(long)]
    pub district: String,

    /// Model description file (TOML); repeat for several models
    #[arg(long = "model", required = true)]
    pub models: Vec<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the first forecast month (YYYY-MM)
    #[arg(long)]
    pub start: Option<String>,

    /// Override the last forecast month (YYYY-MM)
    #[arg(long)]
    pub end: Option<String>,

    /// Write the forecast table to CSV
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl ForecastArgs {
    /// Loads the configuration and applies command-line overrides.
    pub fn resolve_config(&self) -> Result<ForecastConfig, ConfigError> {
        let mut cfg = self.config.load()?;
        if let Some(seed) = self.seed {
            cfg.simulation.seed = seed;
        }
        if let Some(start) = &self.start {
            cfg.simulation.start.clone_from(start);
        }
        if let Some(end) = &self.end {
            cfg.simulation.end.clone_from(end);
        }
        Ok(cfg)
    }
}

#[derive(Args)]
pub struct EvaluateArgs {
    /// Historical rainfall CSV
    #[arg(long)]
    pub data: PathBuf,

    /// District code; defaults to the longest qualifying district
    #[arg(long)]
    pub district: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output CSV
    #[arg(long)]
    pub out: PathBuf,
}

#[cfg(feature = "api")]
#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub forecast: ForecastArgs,

    /// API server port
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn forecast_collects_repeated_models() {
        let cli = Cli::try_parse_from([
            "rainfall-sim",
            "forecast",
            "--data",
            "d.csv",
            "--district",
            "D1",
            "--model",
            "a.toml",
            "--model",
            "b.toml",
            "--seed",
            "9",
        ])
        .unwrap();
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.models.len(), 2);
        let cfg = args.resolve_config().unwrap();
        assert_eq!(cfg.simulation.seed, 9);
    }

    #[test]
    fn config_and_preset_conflict() {
        let res = Cli::try_parse_from([
            "rainfall-sim",
            "evaluate",
            "--data",
            "d.csv",
            "--out",
            "o.csv",
            "--config",
            "c.toml",
            "--preset",
            "baseline",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn forecast_requires_a_model() {
        let res = Cli::try_parse_from([
            "rainfall-sim",
            "forecast",
            "--data",
            "d.csv",
            "--district",
            "D1",
        ]);
        assert!(res.is_err());
    }
}
