//! Integration tests for recursive simulation and batch runs.

mod common;

use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use rainfall_sim::error::ForecastError;
use rainfall_sim::features::builder::FeatureBuilder;
use rainfall_sim::features::schema::FeatureSchema;
use rainfall_sim::model::{ModelKind, ModelRegistry};
use rainfall_sim::series::{ClimatologyProfile, Series};
use rainfall_sim::sim::batch::{BatchRunner, ForecastRequest};
use rainfall_sim::sim::engine::Simulator;
use rainfall_sim::sim::simulate;
use rainfall_sim::sim::types::{BlendParams, SimConfig};

use common::{ConstantModel, EchoLagModel, FailingModel, months, scenario, ymd};

#[test]
fn first_month_blends_prediction_with_climatology() {
    let (series, clim) = scenario();
    let mut rng = StdRng::seed_from_u64(42);

    let points = simulate(
        &series,
        &clim,
        &[ymd(2025, 1)],
        &FeatureSchema::training(),
        &ConstantModel(50.0),
        ModelKind::Linear,
        SimConfig::deterministic(),
        &mut rng,
    )
    .unwrap();

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].date, ymd(2025, 1));
    // weight(Jan) = 10 / 200
    let expected = 0.3 * 50.0 + 0.7 * 10.0 * 0.05_f64.powf(1.5);
    assert_abs_diff_eq!(points[0].value, expected, epsilon = 1e-9);
    assert_abs_diff_eq!(points[0].value, 15.078, epsilon = 1e-3);
}

#[test]
fn each_output_feeds_the_next_month() {
    let (series, clim) = scenario();
    let model = ConstantModel(50.0);
    let sim = Simulator::new(&model, ModelKind::Linear, SimConfig::deterministic());
    let mut rng = StdRng::seed_from_u64(0);

    let steps = sim
        .run(
            &series,
            &clim,
            &months(ymd(2025, 1), 8),
            &FeatureSchema::training(),
            &mut rng,
        )
        .unwrap();

    assert_eq!(steps.len(), 8);
    assert_eq!(steps[0].features.lags.rfh_lag1, 5.0);
    assert_eq!(steps[0].features.lags.rfh_lag2, 10.0);
    for pair in steps.windows(2) {
        assert_eq!(pair[1].features.lags.rfh_lag1, pair[0].value);
        assert_eq!(pair[1].features.lags.rfh_lag2, pair[0].features.lags.rfh_lag1);
    }
    // After six steps the rolling mean covers simulated values only.
    let simulated: f64 = steps[..6].iter().map(|s| s.value).sum();
    assert_abs_diff_eq!(steps[6].features.lags.rfh_roll6, simulated / 6.0, epsilon = 1e-9);
}

#[test]
fn same_seed_gives_identical_stochastic_forecast() {
    let (series, clim) = scenario();
    let model = ConstantModel(80.0);
    let sim = Simulator::new(&model, ModelKind::XgBoost, SimConfig::default());
    let dates = months(ymd(2025, 1), 24);
    let schema = FeatureSchema::training();

    let a = sim
        .simulate(&series, &clim, &dates, &schema, &mut StdRng::seed_from_u64(7))
        .unwrap();
    let b = sim
        .simulate(&series, &clim, &dates, &schema, &mut StdRng::seed_from_u64(7))
        .unwrap();
    let c = sim
        .simulate(&series, &clim, &dates, &schema, &mut StdRng::seed_from_u64(8))
        .unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.iter().all(|p| p.value.is_finite()));
}

#[test]
fn empty_horizon_never_calls_the_model() {
    let (series, clim) = scenario();
    let model = EchoLagModel::default();
    let sim = Simulator::new(&model, ModelKind::Linear, SimConfig::deterministic());

    let points = sim
        .simulate(
            &series,
            &clim,
            &[],
            &FeatureSchema::training(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

    assert!(points.is_empty());
    assert_eq!(model.calls(), 0);
}

#[test]
fn single_observation_seeds_lag1_only() {
    let series = Series::monthly("D2", ymd(2024, 12), &[42.0]).unwrap();
    let clim = ClimatologyProfile::from_series(&series);
    let model = ConstantModel(10.0);
    let sim = Simulator::new(&model, ModelKind::Linear, SimConfig::deterministic());

    let steps = sim
        .run(
            &series,
            &clim,
            &[ymd(2025, 1)],
            &FeatureSchema::training(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

    let lags = steps[0].features.lags;
    assert_eq!(lags.rfh_lag1, 42.0);
    assert_eq!(lags.rfh_lag2, 0.0);
    assert_eq!(lags.rfh_diff, 0.0);
    // January never observed: climatology term vanishes.
    assert_abs_diff_eq!(steps[0].value, 3.0, epsilon = 1e-12);
}

#[test]
fn empty_series_is_insufficient_history() {
    let series = Series::monthly("D9", ymd(2024, 1), &[]).unwrap();
    let clim = ClimatologyProfile::default();
    let err = simulate(
        &series,
        &clim,
        &[ymd(2025, 1)],
        &FeatureSchema::training(),
        &ConstantModel(1.0),
        ModelKind::Linear,
        SimConfig::deterministic(),
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientHistory { .. }));
}

#[test]
fn model_failure_aborts_without_partial_output() {
    let (series, clim) = scenario();
    let err = simulate(
        &series,
        &clim,
        &months(ymd(2025, 1), 3),
        &FeatureSchema::training(),
        &FailingModel,
        ModelKind::RandomForest,
        SimConfig::deterministic(),
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap_err();

    match err {
        ForecastError::PredictionFailure { date, row, .. } => {
            assert_eq!(date, ymd(2025, 1));
            assert_eq!(row.lags.rfh_lag1, 5.0);
        }
        other => panic!("expected PredictionFailure, got {other:?}"),
    }
}

#[test]
fn simulated_and_historical_rows_agree_for_the_same_month() {
    let (series, clim) = scenario();
    let model = ConstantModel(0.0);
    let sim = Simulator::new(&model, ModelKind::Linear, SimConfig::deterministic());
    let steps = sim
        .run(
            &series,
            &clim,
            &[ymd(2025, 1)],
            &FeatureSchema::training(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

    let mut extended: Vec<f64> = common::SCENARIO_VALUES.to_vec();
    extended.push(33.0);
    let observed = Series::monthly("D1", ymd(2024, 1), &extended).unwrap();
    let rows = FeatureBuilder::default()
        .historical_rows(&observed, &clim, 6)
        .unwrap();
    let last = rows.last().unwrap();

    assert_eq!(last.features, steps[0].features);
    assert_eq!(last.target, 33.0);
    assert_eq!(last.features.calendar.time_idx, 1);
}

#[test]
fn blend_weight_zero_follows_the_model_alone() {
    let (series, clim) = scenario();
    let config = SimConfig {
        blend: BlendParams {
            alpha: 0.0,
            exponent: 1.5,
        },
        ..SimConfig::deterministic()
    };
    let model = EchoLagModel::default();
    let points = Simulator::new(&model, ModelKind::Linear, config)
        .simulate(
            &series,
            &clim,
            &months(ymd(2025, 1), 5),
            &FeatureSchema::training(),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();

    // Persistence model: the last observation carries forward.
    assert!(points.iter().all(|p| p.value == 5.0));
    assert_eq!(model.calls(), 5);
}

#[test]
fn batch_reports_successes_and_failures_together() {
    let data = common::historical_data();
    let mut registry = ModelRegistry::new();
    registry.register("Const", ModelKind::Linear, ConstantModel(50.0));
    registry.register("Broken", ModelKind::XgBoost, FailingModel);

    let requests = [
        ForecastRequest::new("D1", ["Const", "Broken"], ymd(2025, 1), ymd(2025, 12)),
        ForecastRequest::new("D2", ["Const"], ymd(2025, 1), ymd(2025, 3)),
        ForecastRequest::new("D1", ["Prophet"], ymd(2025, 1), ymd(2025, 3)),
    ];
    let mut runner = BatchRunner::new(&data, &registry, SimConfig::deterministic(), 42);
    let report = runner.run(&requests);

    assert!(!report.is_success());
    assert_eq!(report.forecasts.len(), 2);
    assert_eq!(report.failures.len(), 2);

    let d1 = report
        .forecasts
        .iter()
        .find(|r| r.district == "D1")
        .unwrap();
    assert_eq!(d1.points.len(), 12);
    assert_abs_diff_eq!(d1.points[0].value, 15.078, epsilon = 1e-3);

    let d2 = report
        .forecasts
        .iter()
        .find(|r| r.district == "D2")
        .unwrap();
    assert_abs_diff_eq!(d2.points[0].value, 15.0, epsilon = 1e-12);

    let failure = |model: &str| {
        report
            .failures
            .iter()
            .find(|f| f.model == model)
            .map(|f| &f.error)
    };
    assert!(matches!(
        failure("Broken"),
        Some(ForecastError::PredictionFailure { .. })
    ));
    assert!(matches!(
        failure("Prophet"),
        Some(ForecastError::InvalidInput(_))
    ));

    let table = report.table(&requests[0]);
    assert_eq!(table.dates.len(), 12);
    assert!(table.column("Const").is_some());
}
