//! Parallel execution of many (district, model) runs with explicit caches.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::clock::MonthlyClock;
use super::engine::Simulator;
use super::types::{ForecastPoint, ForecastTable, SimConfig};
use crate::error::{ForecastError, Result};
use crate::features::schema::FeatureSchema;
use crate::model::{ModelKind, ModelRegistry};
use crate::series::{ClimatologyProfile, HistoricalData, Series};

/// Seed distance between consecutive runs of one batch.
const RUN_SEED_STRIDE: u64 = 1_000;

/// Forecast every listed model for one district over `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastRequest {
    pub district: String,
    pub models: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ForecastRequest {
    pub fn new(
        district: impl Into<String>,
        models: impl IntoIterator<Item = impl Into<String>>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            district: district.into(),
            models: models.into_iter().map(Into::into).collect(),
            start,
            end,
        }
    }

    /// Month-start dates of the horizon.
    pub fn dates(&self) -> Vec<NaiveDate> {
        MonthlyClock::new(self.start, self.end).collect()
    }
}

/// A successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunForecast {
    pub district: String,
    pub model: String,
    pub kind: ModelKind,
    pub points: Arc<[ForecastPoint]>,
}

/// A failed run; it never affects the other runs of its batch.
#[derive(Debug)]
pub struct RunFailure {
    pub district: String,
    pub model: String,
    pub error: ForecastError,
}

/// Outcome of [`BatchRunner::run`], in request order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub forecasts: Vec<RunForecast>,
    pub failures: Vec<RunFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Aligns the successful runs of `request` into one table, columns in
    /// request order.
    pub fn table(&self, request: &ForecastRequest) -> ForecastTable {
        let mut table = ForecastTable::new(request.district.clone(), request.dates());
        for model in &request.models {
            if let Some(run) = self
                .forecasts
                .iter()
                .find(|r| r.district == request.district && &r.model == model)
            {
                table.push_column(model.clone(), &run.points);
            }
        }
        table
    }
}

/// Climatology profiles keyed by district.
#[derive(Debug, Default)]
pub struct ClimatologyCache {
    profiles: HashMap<String, Arc<ClimatologyProfile>>,
}

impl ClimatologyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached profile for the series' district, building it
    /// from the series on first use.
    pub fn get_or_build(&mut self, series: &Series) -> Arc<ClimatologyProfile> {
        Arc::clone(
            self.profiles
                .entry(series.district().to_string())
                .or_insert_with(|| Arc::new(ClimatologyProfile::from_series(series))),
        )
    }

    /// Supplies a precomputed profile, replacing any cached one.
    pub fn insert(&mut self, district: impl Into<String>, profile: ClimatologyProfile) {
        self.profiles.insert(district.into(), Arc::new(profile));
    }

    pub fn get(&self, district: &str) -> Option<Arc<ClimatologyProfile>> {
        self.profiles.get(district).cloned()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RunKey {
    district: String,
    model: String,
    start: NaiveDate,
    end: NaiveDate,
}

/// Completed forecasts keyed by (district, model, horizon).
#[derive(Debug, Default)]
pub struct ForecastCache {
    entries: HashMap<RunKey, Arc<[ForecastPoint]>>,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        district: &str,
        model: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Arc<[ForecastPoint]>> {
        self.entries.get(&key(district, model, start, end)).cloned()
    }

    fn insert(&mut self, key: RunKey, points: Arc<[ForecastPoint]>) {
        self.entries.insert(key, points);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key(district: &str, model: &str, start: NaiveDate, end: NaiveDate) -> RunKey {
    RunKey {
        district: district.to_string(),
        model: model.to_string(),
        start,
        end,
    }
}

/// A run ready to execute.
struct Job<'a> {
    key: RunKey,
    series: &'a Series,
    climatology: Arc<ClimatologyProfile>,
    dates: Arc<[NaiveDate]>,
    seed: u64,
}

enum Slot<'a> {
    Cached(RunKey, Arc<[ForecastPoint]>),
    Pending(Job<'a>),
    Failed(RunKey, ForecastError),
}

/// Runs forecast requests against shared, read-only data and models.
pub struct BatchRunner<'a> {
    data: &'a HistoricalData,
    models: &'a ModelRegistry,
    config: SimConfig,
    schema: FeatureSchema,
    seed: u64,
    climatology: ClimatologyCache,
    forecasts: ForecastCache,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        data: &'a HistoricalData,
        models: &'a ModelRegistry,
        config: SimConfig,
        seed: u64,
    ) -> Self {
        Self {
            data,
            models,
            config,
            schema: FeatureSchema::training(),
            seed,
            climatology: ClimatologyCache::new(),
            forecasts: ForecastCache::new(),
        }
    }

    /// Schema handed to models that do not report their own features.
    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn climatology_mut(&mut self) -> &mut ClimatologyCache {
        &mut self.climatology
    }

    pub fn forecasts(&self) -> &ForecastCache {
        &self.forecasts
    }

    /// Executes every (district, model) run of `requests`.
    ///
    /// Runs already in the forecast cache are reused. The rest execute in
    /// parallel, each with its own RNG seeded from the master seed and its
    /// position in the batch, so results do not depend on scheduling.
    pub fn run(&mut self, requests: &[ForecastRequest]) -> BatchReport {
        let slots = self.plan(requests);
        let pending = slots
            .iter()
            .filter(|s| matches!(s, Slot::Pending(_)))
            .count();
        info!(
            runs = slots.len(),
            pending,
            cached = slots.iter().filter(|s| matches!(s, Slot::Cached(..))).count(),
            "batch started"
        );

        let models = self.models;
        let config = self.config;
        let schema = &self.schema;
        let outcomes: Vec<(RunKey, Result<Arc<[ForecastPoint]>>)> = slots
            .into_par_iter()
            .map(|slot| match slot {
                Slot::Cached(key, points) => (key, Ok(points)),
                Slot::Failed(key, error) => (key, Err(error)),
                Slot::Pending(job) => {
                    let result = execute(&job, models, config, schema);
                    (job.key, result)
                }
            })
            .collect();

        let mut report = BatchReport::default();
        for (key, result) in outcomes {
            match result {
                Ok(points) => {
                    self.forecasts.insert(key.clone(), Arc::clone(&points));
                    let kind = models
                        .get(&key.model)
                        .map_or(ModelKind::Linear, |m| m.kind);
                    report.forecasts.push(RunForecast {
                        district: key.district,
                        model: key.model,
                        kind,
                        points,
                    });
                }
                Err(error) => {
                    warn!(
                        district = %key.district,
                        model = %key.model,
                        error = %error,
                        "run failed"
                    );
                    report.failures.push(RunFailure {
                        district: key.district,
                        model: key.model,
                        error,
                    });
                }
            }
        }

        info!(
            succeeded = report.forecasts.len(),
            failed = report.failures.len(),
            "batch finished"
        );
        report
    }

    /// Resolves requests into runs; lookups that can fail before any
    /// simulation are settled here.
    fn plan(&mut self, requests: &[ForecastRequest]) -> Vec<Slot<'a>> {
        let data: &'a HistoricalData = self.data;
        let mut slots = Vec::new();
        let mut index: u64 = 0;

        for request in requests {
            let dates: Arc<[NaiveDate]> = request.dates().into();
            let series = data.get(&request.district);
            let climatology = series.map(|s| self.climatology.get_or_build(s));

            for model in &request.models {
                let key = key(&request.district, model, request.start, request.end);
                let seed = self.seed.wrapping_add(index.wrapping_mul(RUN_SEED_STRIDE));
                index += 1;

                if let Some(points) = self.forecasts.entries.get(&key) {
                    slots.push(Slot::Cached(key, Arc::clone(points)));
                    continue;
                }
                if self.models.get(model).is_none() {
                    let error =
                        ForecastError::InvalidInput(format!("unknown model \"{model}\""));
                    slots.push(Slot::Failed(key, error));
                    continue;
                }
                match (series, &climatology) {
                    (Some(series), Some(climatology)) => slots.push(Slot::Pending(Job {
                        key,
                        series,
                        climatology: Arc::clone(climatology),
                        dates: Arc::clone(&dates),
                        seed,
                    })),
                    _ => {
                        let error = ForecastError::insufficient(
                            &request.district,
                            "district not found in historical data",
                        );
                        slots.push(Slot::Failed(key, error));
                    }
                }
            }
        }
        slots
    }
}

fn execute(
    job: &Job<'_>,
    models: &ModelRegistry,
    config: SimConfig,
    schema: &FeatureSchema,
) -> Result<Arc<[ForecastPoint]>> {
    let named = models.get(&job.key.model).ok_or_else(|| {
        ForecastError::InvalidInput(format!("unknown model \"{}\"", job.key.model))
    })?;
    let mut rng = StdRng::seed_from_u64(job.seed);
    let sim = Simulator::new(named.model.as_ref(), named.kind, config);
    let points = sim.simulate(job.series, &job.climatology, &job.dates, schema, &mut rng)?;
    Ok(points.into())
}
