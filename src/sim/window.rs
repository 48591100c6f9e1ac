//! Bounded pseudo-history for recursive simulation.

use std::collections::VecDeque;

use crate::error::{ForecastError, Result};
use crate::features::builder::LAG_WINDOW;
use crate::series::{Series, TimePoint};

/// Lifecycle of a [`RollingWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Holds only observed history.
    Seeded,
    /// At least one simulated value has been appended.
    Advancing { appended: usize },
    /// The run is over; no more values will be pushed.
    Exhausted { appended: usize },
}

/// The last `capacity` values (observed first, then simulated), oldest
/// first.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    points: VecDeque<TimePoint>,
    appended: usize,
    exhausted: bool,
}

impl RollingWindow {
    /// Seeds the window from the tail of `series`. `capacity` is raised to
    /// the longest lag look-back if smaller.
    ///
    /// # Errors
    ///
    /// [`ForecastError::InsufficientHistory`] if `series` is empty.
    pub fn seed(series: &Series, capacity: usize) -> Result<Self> {
        if series.is_empty() {
            return Err(ForecastError::insufficient(
                series.district(),
                "at least one observation is required to seed a run",
            ));
        }
        let capacity = capacity.max(LAG_WINDOW);
        Ok(Self {
            capacity,
            points: series.tail(capacity).iter().copied().collect(),
            appended: 0,
            exhausted: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Values oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<&TimePoint> {
        self.points.back()
    }

    /// Appends a simulated value and drops the oldest beyond capacity.
    pub fn push(&mut self, point: TimePoint) {
        debug_assert!(!self.exhausted, "push after finish");
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
        self.appended += 1;
    }

    pub fn finish(&mut self) {
        self.exhausted = true;
    }

    pub fn state(&self) -> WindowState {
        match (self.exhausted, self.appended) {
            (true, appended) => WindowState::Exhausted { appended },
            (false, 0) => WindowState::Seeded,
            (false, appended) => WindowState::Advancing { appended },
        }
    }
}
