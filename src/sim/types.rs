//! Core simulation types: run configuration, per-step records, and the
//! forecast output.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::features::builder::{FeatureBuilder, LAG_WINDOW};
use crate::features::schema::FeatureRow;
use crate::model::{ModelKind, NoiseClass};

/// One simulated month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Climatology blending parameters.
///
/// `final = (1 - alpha) * p1 + alpha * month_avg * weight^exponent`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlendParams {
    /// Share of the climatology term (0.0-1.0).
    pub alpha: f64,
    /// Exponent applied to the month weight; larger values damp dry months harder.
    pub exponent: f64,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            exponent: 1.5,
        }
    }
}

/// Stochastic perturbation applied to raw model output.
///
/// `p1 = p0 * year_var + noise` with `noise ~ Normal(0, noise_std)` and
/// `year_var ~ Uniform(1 - year_var_bound, 1 + year_var_bound)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseProfile {
    /// Standard deviation of the additive Gaussian noise (mm).
    pub noise_std: f64,
    /// Half-width of the multiplicative year-to-year variation.
    pub year_var_bound: f64,
}

impl NoiseProfile {
    /// No perturbation at all: `p1 == p0`.
    pub const NONE: NoiseProfile = NoiseProfile {
        noise_std: 0.0,
        year_var_bound: 0.0,
    };

    /// Default profile for boosted ensembles.
    pub const BOOSTED: NoiseProfile = NoiseProfile {
        noise_std: 2.5,
        year_var_bound: 0.7,
    };

    /// Default profile for every other model family.
    pub const STANDARD: NoiseProfile = NoiseProfile {
        noise_std: 2.0,
        year_var_bound: 0.5,
    };

    pub fn is_none(&self) -> bool {
        self.noise_std == 0.0 && self.year_var_bound == 0.0
    }
}

impl Default for NoiseProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Everything a single run needs besides its inputs.
///
/// # Examples
///
/// ```
/// use rainfall_sim::model::ModelKind;
/// use rainfall_sim::sim::types::{NoiseProfile, SimConfig};
///
/// let cfg = SimConfig::deterministic();
/// assert_eq!(cfg.noise_for(ModelKind::XgBoost), NoiseProfile::NONE);
/// assert_eq!(cfg.window_len, 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Pseudo-history length kept between steps (at least 6).
    pub window_len: usize,
    pub blend: BlendParams,
    pub boosted: NoiseProfile,
    pub standard: NoiseProfile,
    pub features: FeatureBuilder,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            window_len: LAG_WINDOW,
            blend: BlendParams::default(),
            boosted: NoiseProfile::BOOSTED,
            standard: NoiseProfile::STANDARD,
            features: FeatureBuilder::default(),
        }
    }
}

impl SimConfig {
    /// Default blending with perturbation disabled for every model family.
    pub fn deterministic() -> Self {
        Self {
            boosted: NoiseProfile::NONE,
            standard: NoiseProfile::NONE,
            ..Self::default()
        }
    }

    pub fn noise_for(&self, kind: ModelKind) -> NoiseProfile {
        match kind.noise_class() {
            NoiseClass::Boosted => self.boosted,
            NoiseClass::Standard => self.standard,
        }
    }
}

/// Full record of one simulated month, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub date: NaiveDate,
    /// Features handed to the model (before schema reconciliation).
    pub features: FeatureRow,
    /// `p0`, the raw model output.
    pub raw_prediction: f64,
    pub year_var: f64,
    pub noise: f64,
    /// `p1 = p0 * year_var + noise`.
    pub perturbed: f64,
    /// `month_avg * weight^exponent` before mixing.
    pub climatology_term: f64,
    /// Final blended value, fed back as the next pseudo-observation.
    pub value: f64,
}

impl From<&StepRecord> for ForecastPoint {
    fn from(r: &StepRecord) -> Self {
        Self {
            date: r.date,
            value: r.value,
        }
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | lag1={:>7.2} roll6={:>7.2} clim={:>7.2} | p0={:>7.2} \
             var={:.3} noise={:>6.2} p1={:>7.2} | rfh={:>7.2} mm",
            self.date.format("%Y-%m"),
            self.features.lags.rfh_lag1,
            self.features.lags.rfh_roll6,
            self.features.month_avg_rfh,
            self.raw_prediction,
            self.year_var,
            self.noise,
            self.perturbed,
            self.value,
        )
    }
}

/// Forecasts of several models for one district, aligned by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastTable {
    pub district: String,
    pub dates: Vec<NaiveDate>,
    /// `(model name, values)`; every value vector matches `dates` in length.
    pub columns: Vec<(String, Vec<f64>)>,
}

impl ForecastTable {
    pub fn new(district: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            district: district.into(),
            dates,
            columns: Vec::new(),
        }
    }

    /// Adds a model column. Points whose date is not in the table are
    /// ignored; table dates the model did not produce read as NaN.
    pub fn push_column(&mut self, model: impl Into<String>, points: &[ForecastPoint]) {
        let values = self
            .dates
            .iter()
            .map(|d| {
                points
                    .iter()
                    .find(|p| p.date == *d)
                    .map_or(f64::NAN, |p| p.value)
            })
            .collect();
        self.columns.push((model.into(), values));
    }

    pub fn column(&self, model: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(name, _)| name == model)
            .map(|(_, v)| v.as_slice())
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Display for ForecastTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<usize> = self.model_names().map(|n| n.len().max(9)).collect();

        write!(f, "{:<8}", self.district)?;
        for (name, w) in self.model_names().zip(widths.iter().copied()) {
            write!(f, "  {name:>w$}")?;
        }
        for (i, date) in self.dates.iter().enumerate() {
            write!(f, "\n{:<8}", date.format("%Y-%m").to_string())?;
            for ((_, values), w) in self.columns.iter().zip(widths.iter().copied()) {
                let v = values.get(i).copied().unwrap_or(f64::NAN);
                if v.is_finite() {
                    write!(f, "  {v:>w$.2}")?;
                } else {
                    write!(f, "  {:>w$}", "-")?;
                }
            }
        }
        Ok(())
    }
}
