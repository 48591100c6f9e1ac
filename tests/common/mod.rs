//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use rainfall_sim::features::schema::ModelInput;
use rainfall_sim::model::{ModelError, Regressor};
use rainfall_sim::series::{ClimatologyProfile, HistoricalData, Series};

/// One year of monsoon-shaped rainfall, January through December.
pub const SCENARIO_VALUES: [f64; 12] = [
    10.0, 20.0, 15.0, 5.0, 0.0, 0.0, 120.0, 200.0, 180.0, 60.0, 10.0, 5.0,
];

pub fn ymd(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

/// Consecutive month starts from `start`, `n` long.
pub fn months(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n)
        .map(|i| start + chrono::Months::new(i as u32))
        .collect()
}

/// District `D1` observed Jan-Dec 2024, with its own climatology.
pub fn scenario() -> (Series, ClimatologyProfile) {
    let series = Series::monthly("D1", ymd(2024, 1), &SCENARIO_VALUES).unwrap();
    let clim = ClimatologyProfile::from_series(&series);
    (series, clim)
}

/// Two districts: `D1` (scenario year) and `D2` (one observation).
pub fn historical_data() -> HistoricalData {
    let mut data = HistoricalData::new();
    data.insert(scenario().0);
    data.insert(Series::monthly("D2", ymd(2024, 12), &[42.0]).unwrap());
    data.set_name("D1", "Barishal");
    data
}

/// Always predicts the same value.
pub struct ConstantModel(pub f64);

impl Regressor for ConstantModel {
    fn predict(&self, _input: &ModelInput<'_>) -> Result<f64, ModelError> {
        Ok(self.0)
    }
}

/// Predicts `rfh_lag1` and counts calls.
#[derive(Default)]
pub struct EchoLagModel {
    pub calls: AtomicUsize,
}

impl EchoLagModel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Regressor for EchoLagModel {
    fn predict(&self, input: &ModelInput<'_>) -> Result<f64, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        input
            .get("rfh_lag1")
            .ok_or_else(|| ModelError("rfh_lag1 missing".into()))
    }
}

/// Fails on every call.
pub struct FailingModel;

impl Regressor for FailingModel {
    fn predict(&self, _input: &ModelInput<'_>) -> Result<f64, ModelError> {
        Err(ModelError("model crashed".into()))
    }
}

/// Path of a file under `demos/`.
pub fn demo_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join(name)
}
