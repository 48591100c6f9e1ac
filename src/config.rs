//! TOML-based forecast configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::features::builder::{DEFAULT_TIME_IDX_BASE_YEAR, FeatureBuilder, LAG_WINDOW};
use crate::sim::types::{BlendParams, NoiseProfile, SimConfig};

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults matching the baseline preset. Load from TOML
/// with [`ForecastConfig::from_toml_file`] or use
/// [`ForecastConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Horizon, seed, and window length.
    pub simulation: SimulationConfig,
    /// Climatology blending.
    pub blending: BlendParams,
    /// Noise profiles per model family.
    pub perturbation: PerturbationConfig,
    /// Feature construction.
    pub features: FeaturesConfig,
    /// Evaluation-table generation.
    pub evaluation: EvaluationConfig,
    /// Historical CSV layout.
    pub data: DataConfig,
}

/// Horizon, seed, and window length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master random seed.
    pub seed: u64,
    /// First forecast month, `YYYY-MM` or `YYYY-MM-DD`.
    pub start: String,
    /// Last forecast month (inclusive).
    pub end: String,
    /// Pseudo-history length (must be >= 6).
    pub window_len: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start: "2025-01".to_string(),
            end: "2035-12".to_string(),
            window_len: LAG_WINDOW,
        }
    }
}

/// Noise profiles per model family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerturbationConfig {
    /// Gradient-boosted ensembles (`xgboost`).
    pub boosted: NoiseProfile,
    /// Every other model family.
    pub standard: NoiseProfile,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            boosted: NoiseProfile::BOOSTED,
            standard: NoiseProfile::STANDARD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeaturesConfig {
    /// `time_idx = (year - time_idx_base_year) * 12 + month`.
    pub time_idx_base_year: i32,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            time_idx_base_year: DEFAULT_TIME_IDX_BASE_YEAR,
        }
    }
}

/// Evaluation-table generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Share of chronologically last rows kept (0.0-1.0, exclusive).
    pub holdout_fraction: f64,
    /// Below this many rows the whole table is emitted.
    pub min_split_rows: usize,
    /// Observations required before a row is built.
    pub min_history: usize,
    /// Minimum feature rows (observations less `min_history`) for
    /// automatic district selection.
    pub min_district_rows: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            min_split_rows: 10,
            min_history: LAG_WINDOW,
            min_district_rows: 100,
        }
    }
}

/// How duplicate months within one district are combined on import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
}

/// Historical CSV layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub date_column: String,
    /// Monthly rainfall (mm).
    pub value_column: String,
    /// District identifier.
    pub district_column: String,
    /// Optional human-readable district name.
    pub district_name_column: Option<String>,
    pub aggregation: Aggregation,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_column: "date".to_string(),
            value_column: "rfh".to_string(),
            district_column: "ADM2_PCODE".to_string(),
            district_name_column: Some("ADM2_EN".to_string()),
            aggregation: Aggregation::Mean,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"blending.alpha"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Parses `YYYY-MM` or `YYYY-MM-DD` into the first day of that month.
///
/// # Errors
///
/// Returns a message describing the expected format.
pub fn parse_month(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
        .map(crate::features::calendar::month_start)
        .map_err(|_| format!("\"{s}\" is not a YYYY-MM or YYYY-MM-DD date"))
}

impl ForecastConfig {
    /// Returns the baseline configuration.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the deterministic preset: baseline with all perturbation off.
    pub fn deterministic() -> Self {
        Self {
            perturbation: PerturbationConfig {
                boosted: NoiseProfile::NONE,
                standard: NoiseProfile::NONE,
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "deterministic"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "deterministic" => Ok(Self::deterministic()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// First forecast month.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for a malformed date.
    pub fn start_date(&self) -> Result<NaiveDate, ConfigError> {
        parse_month(&self.simulation.start).map_err(|m| ConfigError::new("simulation.start", m))
    }

    /// Last forecast month.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for a malformed date.
    pub fn end_date(&self) -> Result<NaiveDate, ConfigError> {
        parse_month(&self.simulation.end).map_err(|m| ConfigError::new("simulation.end", m))
    }

    /// Simulator settings derived from this configuration.
    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            window_len: self.simulation.window_len,
            blend: self.blending,
            boosted: self.perturbation.boosted,
            standard: self.perturbation.standard,
            features: FeatureBuilder::new(self.features.time_idx_base_year),
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.window_len < LAG_WINDOW {
            errors.push(ConfigError::new(
                "simulation.window_len",
                format!("must be >= {LAG_WINDOW}"),
            ));
        }
        let start = self.start_date().map_err(|e| errors.push(e)).ok();
        let end = self.end_date().map_err(|e| errors.push(e)).ok();
        match (start, end) {
            (Some(start), Some(end)) if start > end => errors.push(ConfigError::new(
                "simulation.start",
                "must not be after simulation.end",
            )),
            _ => {}
        }

        let b = &self.blending;
        if !(0.0..=1.0).contains(&b.alpha) {
            errors.push(ConfigError::new("blending.alpha", "must be in [0.0, 1.0]"));
        }
        if !b.exponent.is_finite() || b.exponent < 0.0 {
            errors.push(ConfigError::new("blending.exponent", "must be finite and >= 0"));
        }

        for (name, p) in [
            ("boosted", &self.perturbation.boosted),
            ("standard", &self.perturbation.standard),
        ] {
            if !p.noise_std.is_finite() || p.noise_std < 0.0 {
                errors.push(ConfigError::new(
                    format!("perturbation.{name}.noise_std"),
                    "must be finite and >= 0",
                ));
            }
            if !(0.0..1.0).contains(&p.year_var_bound) {
                errors.push(ConfigError::new(
                    format!("perturbation.{name}.year_var_bound"),
                    "must be in [0.0, 1.0)",
                ));
            }
        }

        let ev = &self.evaluation;
        if !(ev.holdout_fraction > 0.0 && ev.holdout_fraction < 1.0) {
            errors.push(ConfigError::new(
                "evaluation.holdout_fraction",
                "must be in (0.0, 1.0)",
            ));
        }
        if ev.min_history > LAG_WINDOW {
            errors.push(ConfigError::new(
                "evaluation.min_history",
                format!("must be <= {LAG_WINDOW}"),
            ));
        }

        let d = &self.data;
        for (field, col) in [
            ("data.date_column", &d.date_column),
            ("data.value_column", &d.value_column),
            ("data.district_column", &d.district_column),
        ] {
            if col.trim().is_empty() {
                errors.push(ConfigError::new(field, "must not be empty"));
            }
        }

        errors
    }
}
