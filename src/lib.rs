//! Recursive monthly rainfall forecast simulator.
//!
//! A single [`features::FeatureBuilder`] derives calendar, lag, season, and
//! climatology features for both historical evaluation rows and simulated
//! months. The [`sim::Simulator`] feeds each month's blended prediction back
//! into its rolling window, and [`sim::BatchRunner`] runs many
//! (district, model) pairs in parallel.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod io;
pub mod model;
pub mod series;
/// Simulation engine, perturbation, calendar, and batch orchestration.
pub mod sim;

pub use error::{ForecastError, Result};
