use chrono::{Months, NaiveDate};

use crate::error::{ForecastError, Result};
use crate::features::calendar::month_start;

/// A monthly simulation clock over an inclusive date range.
///
/// Both ends are truncated to the first of their month.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use rainfall_sim::sim::clock::MonthlyClock;
///
/// let start = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
/// let mut months = Vec::new();
///
/// MonthlyClock::new(start, end).run(|d| months.push(d.format("%Y-%m").to_string()));
/// assert_eq!(months, vec!["2025-11", "2025-12", "2026-01"]);
/// ```
#[derive(Debug, Clone)]
pub struct MonthlyClock {
    /// Next month to hand out, `None` once past `end`.
    current: Option<NaiveDate>,
    end: NaiveDate,
}

impl MonthlyClock {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        let start = month_start(start);
        let end = month_start(end);
        Self {
            current: (start <= end).then_some(start),
            end,
        }
    }

    /// Advances the clock by one month.
    ///
    /// # Returns
    ///
    /// * `Some(date)` - The current month before advancing
    /// * `None` - If the clock has passed its end month
    pub fn tick(&mut self) -> Option<NaiveDate> {
        let date = self.current?;
        self.current = date
            .checked_add_months(Months::new(1))
            .filter(|next| *next <= self.end);
        Some(date)
    }

    /// Runs a function for each remaining month.
    pub fn run(&mut self, mut f: impl FnMut(NaiveDate)) {
        while let Some(date) = self.tick() {
            f(date);
        }
    }

    /// Months still to be handed out.
    pub fn remaining(&self) -> usize {
        self.clone().count()
    }
}

impl Iterator for MonthlyClock {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        self.tick()
    }
}

/// Normalises `dates` to month starts and checks they are consecutive
/// calendar months.
///
/// # Errors
///
/// [`ForecastError::InvalidInput`] on a repeated, backwards, or skipped
/// month.
pub fn monthly_sequence(dates: &[NaiveDate]) -> Result<Vec<NaiveDate>> {
    let mut out: Vec<NaiveDate> = Vec::with_capacity(dates.len());
    for &raw in dates {
        let date = month_start(raw);
        if let Some(&prev) = out.last() {
            let expected = prev.checked_add_months(Months::new(1));
            if expected != Some(date) {
                return Err(ForecastError::InvalidInput(format!(
                    "future dates must be consecutive months: {} follows {}",
                    date.format("%Y-%m"),
                    prev.format("%Y-%m")
                )));
            }
        }
        out.push(date);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_new_clock() {
        let clock = MonthlyClock::new(ymd(2025, 1), ymd(2025, 5));
        assert_eq!(clock.current, Some(ymd(2025, 1)));
        assert_eq!(clock.remaining(), 5);
    }

    #[test]
    fn test_tick() {
        let mut clock = MonthlyClock::new(ymd(2025, 12), ymd(2026, 1));
        assert_eq!(clock.tick(), Some(ymd(2025, 12)));
        assert_eq!(clock.tick(), Some(ymd(2026, 1)));
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_full_horizon() {
        let clock = MonthlyClock::new(ymd(2025, 1), ymd(2035, 12));
        assert_eq!(clock.count(), 132);
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = MonthlyClock::new(ymd(2025, 2), ymd(2025, 1));
        assert_eq!(clock.tick(), None);

        let mut was_called = false;
        clock.run(|_| was_called = true);
        assert!(!was_called);
    }

    #[test]
    fn monthly_sequence_normalises_days() {
        let dates = [
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(),
        ];
        assert_eq!(
            monthly_sequence(&dates).unwrap(),
            vec![ymd(2025, 1), ymd(2025, 2)]
        );
    }

    #[test]
    fn monthly_sequence_rejects_gaps_and_repeats() {
        assert!(monthly_sequence(&[ymd(2025, 1), ymd(2025, 3)]).is_err());
        assert!(monthly_sequence(&[ymd(2025, 1), ymd(2025, 1)]).is_err());
        assert!(monthly_sequence(&[ymd(2025, 2), ymd(2025, 1)]).is_err());
        assert!(monthly_sequence(&[]).unwrap().is_empty());
    }
}
