//! Integration tests for CSV import and evaluation table construction.

mod common;

use rainfall_sim::config::{DataConfig, EvaluationConfig};
use rainfall_sim::error::ForecastError;
use rainfall_sim::evaluation::build_evaluation_table;
use rainfall_sim::features::builder::FeatureBuilder;
use rainfall_sim::io::export::write_evaluation_csv;
use rainfall_sim::io::import::load_csv;

use common::{demo_path, ymd};

#[test]
fn demo_data_imports_both_districts() {
    let report = load_csv(&demo_path("rainfall.csv"), &DataConfig::default()).unwrap();

    assert_eq!(report.rows_read, 168);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.data.len(), 2);
    assert_eq!(report.data.name("BD1004"), "Barishal");
    assert_eq!(report.data.name("BD1006"), "Bhola");

    let barishal = report.data.get("BD1004").unwrap();
    assert_eq!(barishal.len(), 108);
    assert_eq!(barishal.points()[0].date, ymd(2016, 1));
    assert_eq!(barishal.last().map(|p| p.date), Some(ymd(2024, 12)));
}

#[test]
fn evaluation_picks_longest_district_and_keeps_last_fifth() {
    let report = load_csv(&demo_path("rainfall.csv"), &DataConfig::default()).unwrap();
    let table = build_evaluation_table(
        &report.data,
        None,
        &EvaluationConfig::default(),
        FeatureBuilder::default(),
    )
    .unwrap();

    assert_eq!(table.district, "BD1004");
    // 108 observations, first six only seed lags.
    assert_eq!(table.total_rows, 102);
    assert_eq!(table.rows.len(), 21);
    assert_eq!(table.rows.last().map(|r| r.features.date), Some(ymd(2024, 12)));
    assert!(table.rows.iter().all(|r| r.features.is_finite()));
    assert_eq!(table.schema.len(), 16);
}

#[test]
fn evaluation_respects_explicit_district() {
    let report = load_csv(&demo_path("rainfall.csv"), &DataConfig::default()).unwrap();
    let table = build_evaluation_table(
        &report.data,
        Some("BD1006"),
        &EvaluationConfig::default(),
        FeatureBuilder::default(),
    )
    .unwrap();
    assert_eq!(table.district, "BD1006");
    assert_eq!(table.total_rows, 54);
}

#[test]
fn evaluation_fails_when_no_district_is_long_enough() {
    let report = load_csv(&demo_path("rainfall.csv"), &DataConfig::default()).unwrap();
    let settings = EvaluationConfig {
        min_district_rows: 500,
        ..EvaluationConfig::default()
    };
    let err = build_evaluation_table(&report.data, None, &settings, FeatureBuilder::default())
        .unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientHistory { .. }));
}

#[test]
fn evaluation_csv_has_schema_then_target_then_date() {
    let report = load_csv(&demo_path("rainfall.csv"), &DataConfig::default()).unwrap();
    let table = build_evaluation_table(
        &report.data,
        None,
        &EvaluationConfig::default(),
        FeatureBuilder::default(),
    )
    .unwrap();

    let mut buf = Vec::new();
    write_evaluation_csv(&table, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();

    assert_eq!(header.first(), Some(&"year"));
    assert_eq!(header[header.len() - 2], "rfh");
    assert_eq!(header.last(), Some(&"date"));
    assert!(!header.contains(&"season_Winter"));
    assert_eq!(lines.count(), 21);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_csv(&demo_path("no-such-file.csv"), &DataConfig::default()).unwrap_err();
    assert!(matches!(err, ForecastError::Io(_)));
}
