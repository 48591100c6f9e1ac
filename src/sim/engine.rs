//! Recursive forecast simulator: feeds each month's output back in as the
//! next month's history.

use chrono::NaiveDate;
use rand::Rng;
use tracing::{debug, info};

use super::clock::monthly_sequence;
use super::perturb::{Perturbation, blend};
use super::types::{ForecastPoint, SimConfig, StepRecord};
use super::window::{RollingWindow, WindowState};
use crate::error::{ForecastError, Result};
use crate::features::schema::FeatureSchema;
use crate::model::{ModelKind, Regressor};
use crate::series::{ClimatologyProfile, Series, TimePoint};

/// Simulator bound to one model.
///
/// Generic over `M: Regressor` for static dispatch; batch runs use
/// `dyn Regressor + Send + Sync`.
pub struct Simulator<'m, M: Regressor + ?Sized> {
    model: &'m M,
    kind: ModelKind,
    config: SimConfig,
}

impl<'m, M: Regressor + ?Sized> Simulator<'m, M> {
    /// # Arguments
    ///
    /// * `model` - Prediction capability
    /// * `kind` - Model family, selects the perturbation profile
    /// * `config` - Blending, noise, and window settings
    pub fn new(model: &'m M, kind: ModelKind, config: SimConfig) -> Self {
        Self {
            model,
            kind,
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Simulates every date in `future_dates` and returns the final values.
    ///
    /// # Errors
    ///
    /// See [`Simulator::run`].
    pub fn simulate<R: Rng>(
        &self,
        series: &Series,
        climatology: &ClimatologyProfile,
        future_dates: &[NaiveDate],
        schema: &FeatureSchema,
        rng: &mut R,
    ) -> Result<Vec<ForecastPoint>> {
        let steps = self.run(series, climatology, future_dates, schema, rng)?;
        Ok(steps.iter().map(ForecastPoint::from).collect())
    }

    /// Simulates every date and returns the full per-step record.
    ///
    /// `schema` is used only when the model does not report its own
    /// feature names.
    ///
    /// # Errors
    ///
    /// * [`ForecastError::InsufficientHistory`] for an empty series
    /// * [`ForecastError::InvalidInput`] for non-consecutive dates or an
    ///   invalid noise profile
    /// * [`ForecastError::SchemaMismatch`] if the model wants a column
    ///   that cannot be derived
    /// * [`ForecastError::PredictionFailure`] if the model fails, or the
    ///   prediction or its blend with climatology is non-finite
    ///
    /// No partial result is returned on error.
    pub fn run<R: Rng>(
        &self,
        series: &Series,
        climatology: &ClimatologyProfile,
        future_dates: &[NaiveDate],
        schema: &FeatureSchema,
        rng: &mut R,
    ) -> Result<Vec<StepRecord>> {
        if series.is_empty() {
            return Err(ForecastError::insufficient(
                series.district(),
                "no historical observations",
            ));
        }
        let dates = monthly_sequence(future_dates)?;
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        let model_schema;
        let schema = match self.model.feature_names() {
            Some(names) => {
                model_schema = FeatureSchema::new(names.iter().cloned())?;
                &model_schema
            }
            None => schema,
        };

        let perturbation = Perturbation::new(self.config.noise_for(self.kind))?;
        let mut window = RollingWindow::seed(series, self.config.window_len)?;
        debug_assert_eq!(window.state(), WindowState::Seeded);

        info!(
            district = series.district(),
            model = %self.kind,
            steps = dates.len(),
            "simulation started"
        );

        let mut steps = Vec::with_capacity(dates.len());
        for date in dates {
            let step = self.step(date, &window, climatology, schema, &perturbation, rng)?;
            window.push(TimePoint::new(date, step.value));
            steps.push(step);
        }
        window.finish();

        info!(
            district = series.district(),
            model = %self.kind,
            state = ?window.state(),
            "simulation finished"
        );
        Ok(steps)
    }

    /// Produces one month from the current window without mutating it.
    fn step<R: Rng>(
        &self,
        date: NaiveDate,
        window: &RollingWindow,
        climatology: &ClimatologyProfile,
        schema: &FeatureSchema,
        perturbation: &Perturbation,
        rng: &mut R,
    ) -> Result<StepRecord> {
        // 1. Features from pseudo-history
        let history = window.values();
        let features = self.config.features.build_row(date, &history, climatology)?;

        // 2. Align to the model
        let input = schema.reconcile(&features)?;

        // 3. Predict
        let raw_prediction = match self.model.predict(&input) {
            Ok(p) if p.is_finite() => p,
            Ok(p) => {
                return Err(ForecastError::PredictionFailure {
                    date,
                    reason: format!("model returned non-finite value {p}"),
                    row: Box::new(features),
                });
            }
            Err(e) => {
                return Err(ForecastError::PredictionFailure {
                    date,
                    reason: e.to_string(),
                    row: Box::new(features),
                });
            }
        };

        // 4. Perturb
        let draw = perturbation.draw(rng);
        let perturbed = draw.apply(raw_prediction);

        // 5. Blend with climatology
        let month = features.calendar.month;
        let blended = blend(
            perturbed,
            climatology.month_avg(month),
            climatology.weight(month),
            self.config.blend,
        );
        if !blended.value.is_finite() {
            return Err(ForecastError::PredictionFailure {
                date,
                reason: format!(
                    "blended value {} is not finite (month_avg={}, weight={})",
                    blended.value,
                    climatology.month_avg(month),
                    climatology.weight(month)
                ),
                row: Box::new(features),
            });
        }

        let record = StepRecord {
            date,
            features,
            raw_prediction,
            year_var: draw.year_var,
            noise: draw.noise,
            perturbed,
            climatology_term: blended.climatology_term,
            value: blended.value,
        };
        debug!(step = %record, "simulated month");
        Ok(record)
    }
}

/// One-shot form of [`Simulator::simulate`].
///
/// # Errors
///
/// See [`Simulator::run`].
#[expect(clippy::too_many_arguments)]
pub fn simulate<M: Regressor + ?Sized, R: Rng>(
    series: &Series,
    climatology: &ClimatologyProfile,
    future_dates: &[NaiveDate],
    schema: &FeatureSchema,
    model: &M,
    kind: ModelKind,
    config: SimConfig,
    rng: &mut R,
) -> Result<Vec<ForecastPoint>> {
    Simulator::new(model, kind, config).simulate(series, climatology, future_dates, schema, rng)
}
