//! REST API for a completed forecast batch.
//!
//! Provides two GET endpoints:
//! - `/state` - request, effective configuration, run and failure summaries
//! - `/forecast` - forecast points with optional model and date filtering

mod handlers;
mod types;

pub use types::{
    ErrorResponse, FailureRecord, ForecastQuery, ForecastRecord, RunSummary, StateResponse,
};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::ForecastConfig;
use crate::sim::batch::{BatchReport, ForecastRequest, RunForecast};

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the batch completes and wrapped in `Arc`; no
/// locks needed since all data is read-only.
pub struct AppState {
    pub request: ForecastRequest,
    pub config: ForecastConfig,
    pub forecasts: Vec<RunForecast>,
    pub failures: Vec<FailureRecord>,
}

impl AppState {
    pub fn new(request: ForecastRequest, config: ForecastConfig, report: BatchReport) -> Self {
        Self {
            request,
            config,
            forecasts: report.forecasts,
            failures: report.failures.iter().map(FailureRecord::from).collect(),
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/forecast", get(handlers::get_forecast))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
