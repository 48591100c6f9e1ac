//! Historical rainfall series and per-district climatology.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{ForecastError, Result};
use crate::features::calendar::month_start;

/// One monthly rainfall observation (mm), dated at the first of its month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TimePoint {
    /// Creates a point, truncating `date` to month granularity.
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date: month_start(date),
            value,
        }
    }

    /// Calendar month (1-12).
    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

/// Chronologically ordered rainfall history for one district.
///
/// Months are strictly increasing and every value is finite; both are
/// checked on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    district: String,
    points: Vec<TimePoint>,
}

impl Series {
    /// Builds a validated series.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidInput`] if a value is non-finite or a
    /// month does not strictly follow its predecessor.
    pub fn new(district: impl Into<String>, points: Vec<TimePoint>) -> Result<Self> {
        let district = district.into();
        let points: Vec<TimePoint> = points
            .into_iter()
            .map(|p| TimePoint::new(p.date, p.value))
            .collect();

        for (i, p) in points.iter().enumerate() {
            if !p.value.is_finite() {
                return Err(ForecastError::InvalidInput(format!(
                    "district \"{district}\": non-finite value {} at {}",
                    p.value, p.date
                )));
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(ForecastError::InvalidInput(format!(
                    "district \"{district}\": dates must be strictly increasing by month, \
                     {} follows {}",
                    p.date,
                    points[i - 1].date
                )));
            }
        }

        Ok(Self { district, points })
    }

    /// Convenience constructor for consecutive months starting at `start`.
    ///
    /// # Errors
    ///
    /// Same as [`Series::new`].
    pub fn monthly(district: impl Into<String>, start: NaiveDate, values: &[f64]) -> Result<Self> {
        let start = month_start(start);
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let date = start
                    .checked_add_months(chrono::Months::new(i as u32))
                    .unwrap_or(start);
                TimePoint::new(date, v)
            })
            .collect();
        Self::new(district, points)
    }

    pub fn district(&self) -> &str {
        &self.district
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The last `n` points (or all of them if shorter).
    pub fn tail(&self, n: usize) -> &[TimePoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    pub fn last(&self) -> Option<&TimePoint> {
        self.points.last()
    }
}

/// Long-run mean rainfall per calendar month for one district.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClimatologyProfile {
    month_means: BTreeMap<u32, f64>,
    max_mean: f64,
}

impl ClimatologyProfile {
    /// Averages every observation of the series by calendar month.
    pub fn from_series(series: &Series) -> Self {
        let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for p in series.points() {
            let entry = sums.entry(p.month()).or_insert((0.0, 0));
            entry.0 += p.value;
            entry.1 += 1;
        }
        let month_means = sums
            .into_iter()
            .map(|(m, (sum, n))| (m, sum / n as f64))
            .collect();
        Self::from_parts(month_means)
    }

    /// Wraps a precomputed month → mean mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidInput`] for months outside 1-12 or
    /// non-finite means.
    pub fn from_means(means: impl IntoIterator<Item = (u32, f64)>) -> Result<Self> {
        let mut month_means = BTreeMap::new();
        for (month, mean) in means {
            if !(1..=12).contains(&month) {
                return Err(ForecastError::InvalidInput(format!(
                    "climatology month {month} is outside 1-12"
                )));
            }
            if !mean.is_finite() {
                return Err(ForecastError::InvalidInput(format!(
                    "climatology mean for month {month} is not finite"
                )));
            }
            month_means.insert(month, mean);
        }
        Ok(Self::from_parts(month_means))
    }

    fn from_parts(month_means: BTreeMap<u32, f64>) -> Self {
        let max_mean = month_means
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        Self {
            max_mean: if month_means.is_empty() { 0.0 } else { max_mean },
            month_means,
        }
    }

    /// Historical mean for `month`, 0 if the month was never observed.
    pub fn month_avg(&self, month: u32) -> f64 {
        self.month_means.get(&month).copied().unwrap_or(0.0)
    }

    /// Largest monthly mean (0 for an empty profile).
    pub fn max_month_avg(&self) -> f64 {
        self.max_mean
    }

    /// `month_avg(month) / max_month_avg`, or 0 when the profile is empty
    /// or its maximum is not positive.
    pub fn weight(&self, month: u32) -> f64 {
        if self.max_mean > 0.0 {
            self.month_avg(month) / self.max_mean
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.month_means.is_empty()
    }

    pub fn months(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.month_means.iter().map(|(&m, &v)| (m, v))
    }
}

/// Every district's history, keyed by district code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalData {
    series: BTreeMap<String, Series>,
    /// Human-readable names keyed by district code, when the source has them.
    names: BTreeMap<String, String>,
}

impl HistoricalData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the series for its district.
    pub fn insert(&mut self, series: Series) {
        self.series.insert(series.district().to_string(), series);
    }

    pub fn set_name(&mut self, district: impl Into<String>, name: impl Into<String>) {
        self.names.insert(district.into(), name.into());
    }

    pub fn get(&self, district: &str) -> Option<&Series> {
        self.series.get(district)
    }

    /// Display name for a district, falling back to its code.
    pub fn name<'a>(&'a self, district: &'a str) -> &'a str {
        self.names.get(district).map_or(district, String::as_str)
    }

    /// District codes in sorted order.
    pub fn districts(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
