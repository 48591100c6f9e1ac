//! Feature engineering for the monthly rainfall models.

pub mod builder;
/// Calendar, cyclical, and season encodings.
pub mod calendar;
/// Lag, rolling, and diff statistics.
pub mod lags;
pub mod schema;

pub use builder::{FeatureBuilder, LabelledRow, assemble, month_avg_rfh};
pub use calendar::{CalendarFeatures, Season, SeasonOneHot, calendar_features, season_label};
pub use lags::{LagFeatures, lag_and_rolling_features};
pub use schema::{FEATURE_NAMES, FeatureRow, FeatureSchema, ModelInput};
