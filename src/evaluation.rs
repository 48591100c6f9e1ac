//! Labelled hold-out tables built from historical data through the same
//! feature builder the simulator uses.

use tracing::info;

use crate::config::EvaluationConfig;
use crate::error::{ForecastError, Result};
use crate::features::builder::{FeatureBuilder, LabelledRow};
use crate::features::schema::FeatureSchema;
use crate::series::{ClimatologyProfile, HistoricalData, Series};

/// Chronologically last rows of one district, ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationTable {
    pub district: String,
    pub schema: FeatureSchema,
    pub rows: Vec<LabelledRow>,
    /// Rows built before the hold-out split.
    pub total_rows: usize,
}

/// Picks the district to evaluate.
///
/// An explicit district must exist. Otherwise the district with the most
/// observations is chosen (first in code order on ties), provided it yields
/// at least `min_rows` feature rows once the first `min_history`
/// observations are spent seeding lags.
///
/// # Errors
///
/// [`ForecastError::InsufficientHistory`] if the explicit district is
/// unknown or no district qualifies.
pub fn select_district<'d>(
    data: &'d HistoricalData,
    explicit: Option<&str>,
    min_rows: usize,
    min_history: usize,
) -> Result<&'d Series> {
    if let Some(code) = explicit {
        return data
            .get(code)
            .ok_or_else(|| ForecastError::insufficient(code, "district not found"));
    }

    let mut best: Option<&Series> = None;
    for series in data.iter() {
        if best.is_none_or(|b| series.len() > b.len()) {
            best = Some(series);
        }
    }
    match best {
        Some(series) if usable_rows(series, min_history) >= min_rows => Ok(series),
        Some(series) => Err(ForecastError::insufficient(
            series.district(),
            format!(
                "largest district yields {} feature rows, need at least {min_rows}",
                usable_rows(series, min_history)
            ),
        )),
        None => Err(ForecastError::insufficient("<any>", "no districts loaded")),
    }
}

fn usable_rows(series: &Series, min_history: usize) -> usize {
    series.len().saturating_sub(min_history)
}

/// Keeps the chronologically last `ceil(fraction * n)` items, or all of
/// them when there are fewer than `min_split_rows`.
pub fn holdout<T>(mut rows: Vec<T>, fraction: f64, min_split_rows: usize) -> Vec<T> {
    let n = rows.len();
    if n < min_split_rows {
        return rows;
    }
    let keep = ((fraction * n as f64).ceil() as usize).min(n);
    rows.split_off(n - keep)
}

/// Builds the evaluation table for one district.
///
/// # Errors
///
/// District selection errors, or [`ForecastError::InsufficientHistory`]
/// if the district is too short to yield any row.
pub fn build_evaluation_table(
    data: &HistoricalData,
    district: Option<&str>,
    settings: &EvaluationConfig,
    builder: FeatureBuilder,
) -> Result<EvaluationTable> {
    let series = select_district(
        data,
        district,
        settings.min_district_rows,
        settings.min_history,
    )?;
    let climatology = ClimatologyProfile::from_series(series);
    let rows = builder.historical_rows(series, &climatology, settings.min_history)?;
    if rows.is_empty() {
        return Err(ForecastError::insufficient(
            series.district(),
            format!(
                "{} observations, need more than {}",
                series.len(),
                settings.min_history
            ),
        ));
    }

    let total_rows = rows.len();
    let rows = holdout(rows, settings.holdout_fraction, settings.min_split_rows);
    info!(
        district = series.district(),
        total_rows,
        kept = rows.len(),
        "evaluation table built"
    );

    Ok(EvaluationTable {
        district: series.district().to_string(),
        schema: FeatureSchema::training(),
        rows,
        total_rows,
    })
}
