//! API response and query types.
//!
//! Forecast field names follow the CSV export (`date`, `rfh`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ForecastConfig;
use crate::model::ModelKind;
use crate::sim::batch::{ForecastRequest, RunFailure, RunForecast};

/// `GET /state` body.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub request: ForecastRequest,
    /// Effective configuration for the batch.
    pub config: ForecastConfig,
    pub runs: Vec<RunSummary>,
    pub failures: Vec<FailureRecord>,
}

/// One successful run without its points.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub district: String,
    pub model: String,
    pub kind: ModelKind,
    pub points: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

impl From<&RunForecast> for RunSummary {
    fn from(r: &RunForecast) -> Self {
        Self {
            district: r.district.clone(),
            model: r.model.clone(),
            kind: r.kind,
            points: r.points.len(),
            first: r.points.first().map(|p| p.date),
            last: r.points.last().map(|p| p.date),
        }
    }
}

/// A failed run with its error rendered as text.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub district: String,
    pub model: String,
    pub error: String,
}

impl From<&RunFailure> for FailureRecord {
    fn from(f: &RunFailure) -> Self {
        Self {
            district: f.district.clone(),
            model: f.model.clone(),
            error: f.error.to_string(),
        }
    }
}

/// One forecast point.
#[derive(Debug, Serialize)]
pub struct ForecastRecord {
    pub model: String,
    pub date: NaiveDate,
    /// Forecast rainfall (mm).
    pub rfh: f64,
}

/// Optional filters for the forecast endpoint.
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    /// Model name (exact match).
    pub model: Option<String>,
    /// First month, `YYYY-MM` (inclusive).
    pub from: Option<String>,
    /// Last month, `YYYY-MM` (inclusive).
    pub to: Option<String>,
}

/// Error response body for 4xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
