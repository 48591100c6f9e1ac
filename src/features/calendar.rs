//! Calendar, cyclical, and seasonal encodings of a monthly date.

use std::f64::consts::PI;
use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

/// Months of the South Asian monsoon (June-September).
const MONSOON_MONTHS: [u32; 4] = [6, 7, 8, 9];

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after `date`'s month.
pub fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date).checked_add_months(Months::new(1))
}

/// Date-derived features shared by every construction path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub is_monsoon: bool,
    pub sin_month: f64,
    pub cos_month: f64,
    /// Months since December of the year before `time_idx_base_year`.
    pub time_idx: i64,
}

/// Derives the calendar block for `date`.
///
/// `time_idx` is `(year - time_idx_base_year) * 12 + month` on every path,
/// so a historical row and a simulated row for the same month agree.
pub fn calendar_features(date: NaiveDate, time_idx_base_year: i32) -> CalendarFeatures {
    let year = date.year();
    let month = date.month();
    let angle = 2.0 * PI * f64::from(month) / 12.0;
    CalendarFeatures {
        year,
        month,
        quarter: (month - 1) / 3 + 1,
        is_monsoon: MONSOON_MONTHS.contains(&month),
        sin_month: angle.sin(),
        cos_month: angle.cos(),
        time_idx: i64::from(year - time_idx_base_year) * 12 + i64::from(month),
    }
}

/// Bangladesh meteorological season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    Winter,
    Summer,
    Monsoon,
    PostMonsoon,
}

impl Season {
    /// All seasons in one-hot column order.
    pub const ALL: [Season; 4] = [
        Season::Monsoon,
        Season::PostMonsoon,
        Season::Summer,
        Season::Winter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Summer => "Summer",
            Season::Monsoon => "Monsoon",
            Season::PostMonsoon => "Post-Monsoon",
        }
    }

    /// One-hot column name, e.g. `season_Post-Monsoon`.
    pub fn column(self) -> &'static str {
        match self {
            Season::Winter => "season_Winter",
            Season::Summer => "season_Summer",
            Season::Monsoon => "season_Monsoon",
            Season::PostMonsoon => "season_Post-Monsoon",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a calendar month to its season.
///
/// Months outside 1-12 never reach this function in practice (they come
/// from `chrono` dates); they fall into `Winter`.
pub fn season_label(month: u32) -> Season {
    match month {
        3..=5 => Season::Summer,
        6..=9 => Season::Monsoon,
        10 | 11 => Season::PostMonsoon,
        _ => Season::Winter,
    }
}

/// Season indicator flags, exactly one of which is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonOneHot {
    pub monsoon: bool,
    pub post_monsoon: bool,
    pub summer: bool,
    pub winter: bool,
}

impl SeasonOneHot {
    pub fn for_month(month: u32) -> Self {
        Self::from(season_label(month))
    }

    pub fn is_set(&self, season: Season) -> bool {
        match season {
            Season::Monsoon => self.monsoon,
            Season::PostMonsoon => self.post_monsoon,
            Season::Summer => self.summer,
            Season::Winter => self.winter,
        }
    }
}

impl From<Season> for SeasonOneHot {
    fn from(season: Season) -> Self {
        Self {
            monsoon: season == Season::Monsoon,
            post_monsoon: season == Season::PostMonsoon,
            summer: season == Season::Summer,
            winter: season == Season::Winter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quarter_and_monsoon_flags() {
        let f = calendar_features(ymd(2024, 7, 1), 2025);
        assert_eq!(f.year, 2024);
        assert_eq!(f.month, 7);
        assert_eq!(f.quarter, 3);
        assert!(f.is_monsoon);

        let f = calendar_features(ymd(2024, 10, 1), 2025);
        assert_eq!(f.quarter, 4);
        assert!(!f.is_monsoon);

        assert_eq!(calendar_features(ymd(2024, 1, 1), 2025).quarter, 1);
        assert_eq!(calendar_features(ymd(2024, 3, 1), 2025).quarter, 1);
        assert_eq!(calendar_features(ymd(2024, 4, 1), 2025).quarter, 2);
    }

    #[test]
    fn time_idx_counts_months_from_base_year() {
        assert_eq!(calendar_features(ymd(2025, 1, 1), 2025).time_idx, 1);
        assert_eq!(calendar_features(ymd(2026, 3, 1), 2025).time_idx, 15);
        assert_eq!(calendar_features(ymd(2024, 12, 1), 2025).time_idx, 0);
        assert_eq!(calendar_features(ymd(2024, 11, 1), 2025).time_idx, -1);
    }

    #[test]
    fn december_and_january_are_adjacent_on_the_circle() {
        let dec = calendar_features(ymd(2024, 12, 1), 2025);
        let jan = calendar_features(ymd(2025, 1, 1), 2025);
        let jun = calendar_features(ymd(2025, 6, 1), 2025);
        let dist = |a: &CalendarFeatures, b: &CalendarFeatures| {
            ((a.sin_month - b.sin_month).powi(2) + (a.cos_month - b.cos_month).powi(2)).sqrt()
        };
        assert!(dist(&dec, &jan) < dist(&dec, &jun));
        assert_abs_diff_eq!(dec.sin_month, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dec.cos_month, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn season_table() {
        for m in [12, 1, 2] {
            assert_eq!(season_label(m), Season::Winter);
        }
        for m in [3, 4, 5] {
            assert_eq!(season_label(m), Season::Summer);
        }
        for m in [6, 7, 8, 9] {
            assert_eq!(season_label(m), Season::Monsoon);
        }
        for m in [10, 11] {
            assert_eq!(season_label(m), Season::PostMonsoon);
        }
    }

    #[test]
    fn next_month_rolls_over_year() {
        assert_eq!(next_month(ymd(2024, 12, 15)), Some(ymd(2025, 1, 1)));
    }

    proptest! {
        #[test]
        fn sin_cos_lie_on_unit_circle(month in 1u32..=12, year in 1950i32..2100) {
            let f = calendar_features(ymd(year, month, 1), 2025);
            prop_assert!((f.sin_month.powi(2) + f.cos_month.powi(2) - 1.0).abs() < 1e-12);
        }

        #[test]
        fn exactly_one_season_flag(month in 1u32..=12) {
            let onehot = SeasonOneHot::for_month(month);
            let set: Vec<Season> = Season::ALL
                .into_iter()
                .filter(|s| onehot.is_set(*s))
                .collect();
            prop_assert_eq!(set, vec![season_label(month)]);
        }
    }
}
