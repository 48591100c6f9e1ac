//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use super::AppState;
use super::types::{ErrorResponse, ForecastQuery, ForecastRecord, RunSummary, StateResponse};
use crate::config::parse_month;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: String) -> ApiError {
    (status, Json(ErrorResponse { error }))
}

/// Returns the request, configuration, and run summaries.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        request: state.request.clone(),
        config: state.config.clone(),
        runs: state.forecasts.iter().map(RunSummary::from).collect(),
        failures: state.failures.clone(),
    })
}

/// Returns forecast points, optionally filtered by model and month range.
///
/// `GET /forecast` → 200 + `Vec<ForecastRecord>` JSON, runs in request order
/// `GET /forecast?model=X&from=2025-01&to=2025-06` → filtered (inclusive)
/// `GET /forecast?from=2026-01&to=2025-01` → 400 + `ErrorResponse`
/// `GET /forecast?model=unknown` → 404 + `ErrorResponse`
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<Vec<ForecastRecord>>, ApiError> {
    let from = query
        .from
        .as_deref()
        .map(parse_month)
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("`from`: {e}")))?;
    let to = query
        .to
        .as_deref()
        .map(parse_month)
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("`to`: {e}")))?;

    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("`from` ({from}) must be <= `to` ({to})"),
        ));
    }

    if let Some(model) = query.model.as_deref()
        && !state.forecasts.iter().any(|r| r.model == model)
    {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("no forecast for model \"{model}\""),
        ));
    }

    let records = state
        .forecasts
        .iter()
        .filter(|r| query.model.as_deref().is_none_or(|m| r.model == m))
        .flat_map(|r| {
            r.points
                .iter()
                .filter(move |p| from.is_none_or(|f| p.date >= f) && to.is_none_or(|t| p.date <= t))
                .map(move |p| ForecastRecord {
                    model: r.model.clone(),
                    date: p.date,
                    rfh: p.value,
                })
        })
        .collect();

    Ok(Json(records))
}
