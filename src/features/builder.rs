//! The one routine that turns a date plus trailing history into a
//! [`FeatureRow`]. Historical evaluation rows and simulated rows both go
//! through [`FeatureBuilder::build_row`].

use chrono::NaiveDate;

use super::calendar::{CalendarFeatures, SeasonOneHot, calendar_features};
use super::lags::{LagFeatures, lag_and_rolling_features};
use super::schema::FeatureRow;
use crate::error::Result;
use crate::series::{ClimatologyProfile, Series};

/// Longest look-back any lag feature needs (`rfh_roll6`).
pub const LAG_WINDOW: usize = 6;

/// Default base year for `time_idx`.
pub const DEFAULT_TIME_IDX_BASE_YEAR: i32 = 2025;

/// Climatological mean for `month`, 0 if never observed.
pub fn month_avg_rfh(month: u32, climatology: &ClimatologyProfile) -> f64 {
    climatology.month_avg(month)
}

/// Unions the independently derived blocks into one row.
pub fn assemble(
    date: NaiveDate,
    calendar: CalendarFeatures,
    lags: LagFeatures,
    season: SeasonOneHot,
    month_avg_rfh: f64,
) -> FeatureRow {
    FeatureRow {
        date,
        calendar,
        lags,
        season,
        month_avg_rfh,
    }
}

/// A historical observation paired with the features derived from the
/// observations strictly before it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledRow {
    pub features: FeatureRow,
    pub target: f64,
}

/// Feature construction parameters shared by every path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureBuilder {
    time_idx_base_year: i32,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_IDX_BASE_YEAR)
    }
}

impl FeatureBuilder {
    pub fn new(time_idx_base_year: i32) -> Self {
        Self { time_idx_base_year }
    }

    pub fn time_idx_base_year(&self) -> i32 {
        self.time_idx_base_year
    }

    pub fn calendar(&self, date: NaiveDate) -> CalendarFeatures {
        calendar_features(date, self.time_idx_base_year)
    }

    /// Builds the row for `date` from `history` (oldest first, all strictly
    /// before `date`) and the district climatology.
    ///
    /// # Errors
    ///
    /// Fails only if `history` contains a non-finite value.
    pub fn build_row(
        &self,
        date: NaiveDate,
        history: &[f64],
        climatology: &ClimatologyProfile,
    ) -> Result<FeatureRow> {
        let calendar = self.calendar(date);
        let lags = lag_and_rolling_features(history)?;
        let season = SeasonOneHot::for_month(calendar.month);
        let avg = month_avg_rfh(calendar.month, climatology);
        Ok(assemble(date, calendar, lags, season, avg))
    }

    /// Builds one labelled row per observation that has at least
    /// `min_history` predecessors.
    ///
    /// # Errors
    ///
    /// Propagates [`FeatureBuilder::build_row`] failures.
    pub fn historical_rows(
        &self,
        series: &Series,
        climatology: &ClimatologyProfile,
        min_history: usize,
    ) -> Result<Vec<LabelledRow>> {
        let values: Vec<f64> = series.points().iter().map(|p| p.value).collect();
        let mut rows = Vec::with_capacity(values.len().saturating_sub(min_history));

        for (i, point) in series.points().iter().enumerate() {
            if i < min_history {
                continue;
            }
            let history = &values[i.saturating_sub(LAG_WINDOW)..i];
            let features = self.build_row(point.date, history, climatology)?;
            rows.push(LabelledRow {
                features,
                target: point.value,
            });
        }

        Ok(rows)
    }
}
