//! Fixed feature schema, the assembled feature row, and per-model
//! schema reconciliation.

use chrono::NaiveDate;
use serde::Serialize;

use super::calendar::{CalendarFeatures, Season, SeasonOneHot};
use super::lags::LagFeatures;
use crate::error::{ForecastError, Result};

/// Every column the builder can derive, in canonical order.
pub const FEATURE_NAMES: [&str; 17] = [
    "year",
    "month",
    "quarter",
    "is_monsoon",
    "rfh_lag1",
    "rfh_lag2",
    "rfh_roll3",
    "rfh_roll6",
    "rfh_diff",
    "sin_month",
    "cos_month",
    "month_avg_rfh",
    "time_idx",
    "season_Monsoon",
    "season_Post-Monsoon",
    "season_Summer",
    "season_Winter",
];

/// Number of columns in the training schema (all but `season_Winter`).
pub const TRAINING_FEATURE_COUNT: usize = 16;

/// Prefix of one-hot indicator columns, which are zero-filled when absent.
const ONE_HOT_PREFIX: &str = "season_";

/// One fully derived feature vector for a single month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub calendar: CalendarFeatures,
    pub lags: LagFeatures,
    pub season: SeasonOneHot,
    pub month_avg_rfh: f64,
}

impl FeatureRow {
    /// Looks up a column by name; `None` if the builder does not derive it.
    pub fn value(&self, name: &str) -> Option<f64> {
        let c = &self.calendar;
        let l = &self.lags;
        let v = match name {
            "year" => f64::from(c.year),
            "month" => f64::from(c.month),
            "quarter" => f64::from(c.quarter),
            "is_monsoon" => flag(c.is_monsoon),
            "rfh_lag1" => l.rfh_lag1,
            "rfh_lag2" => l.rfh_lag2,
            "rfh_roll3" => l.rfh_roll3,
            "rfh_roll6" => l.rfh_roll6,
            "rfh_diff" => l.rfh_diff,
            "sin_month" => c.sin_month,
            "cos_month" => c.cos_month,
            "month_avg_rfh" => self.month_avg_rfh,
            "time_idx" => c.time_idx as f64,
            "season_Monsoon" => flag(self.season.is_set(Season::Monsoon)),
            "season_Post-Monsoon" => flag(self.season.is_set(Season::PostMonsoon)),
            "season_Summer" => flag(self.season.is_set(Season::Summer)),
            "season_Winter" => flag(self.season.is_set(Season::Winter)),
            _ => return None,
        };
        Some(v)
    }

    /// All columns in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES
            .iter()
            .map(|&name| (name, self.value(name).unwrap_or(0.0)))
    }

    /// True when every derived value is finite.
    pub fn is_finite(&self) -> bool {
        self.iter().all(|(_, v)| v.is_finite())
    }
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Ordered list of column names a model consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Builds a schema from arbitrary names.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidInput`] on duplicate names.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ForecastError::InvalidInput(format!(
                    "duplicate feature \"{name}\" in schema"
                )));
            }
        }
        Ok(Self { names })
    }

    /// The 16-column training schema (reference season `Winter` dropped).
    pub fn training() -> Self {
        Self {
            names: FEATURE_NAMES[..TRAINING_FEATURE_COUNT]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// All 17 derivable columns.
    pub fn full() -> Self {
        Self {
            names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Aligns `row` to this schema.
    ///
    /// Columns the row lacks are zero-filled when they are one-hot season
    /// indicators; any other unknown column cannot be derived and is an
    /// error. Row columns outside the schema are dropped.
    ///
    /// # Errors
    ///
    /// [`ForecastError::SchemaMismatch`] for an underivable column or an
    /// empty schema, [`ForecastError::InvalidInput`] for non-finite values.
    pub fn reconcile(&self, row: &FeatureRow) -> Result<ModelInput<'_>> {
        if self.names.is_empty() {
            return Err(ForecastError::SchemaMismatch {
                feature: "<empty schema>".to_string(),
            });
        }

        let mut values = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let v = match row.value(name) {
                Some(v) => v,
                None if name.starts_with(ONE_HOT_PREFIX) => {
                    tracing::trace!(feature = %name, "zero-filling one-hot column");
                    0.0
                }
                None => {
                    return Err(ForecastError::SchemaMismatch {
                        feature: name.clone(),
                    });
                }
            };
            if !v.is_finite() {
                return Err(ForecastError::InvalidInput(format!(
                    "feature \"{name}\" is not finite ({v}) for {}",
                    row.date
                )));
            }
            values.push(v);
        }

        Ok(ModelInput {
            names: &self.names,
            values,
        })
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::training()
    }
}

/// A feature row aligned to one model's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput<'s> {
    names: &'s [String],
    values: Vec<f64>,
}

impl<'s> ModelInput<'s> {
    pub fn names(&self) -> &'s [String] {
        self.names
    }

    /// Values in schema order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'s str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}
