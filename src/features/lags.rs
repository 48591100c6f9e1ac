//! Lag, rolling-mean, and difference statistics over trailing history.

use serde::Serialize;

use crate::error::{ForecastError, Result};

/// Autoregressive block of the feature row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LagFeatures {
    pub rfh_lag1: f64,
    pub rfh_lag2: f64,
    pub rfh_roll3: f64,
    pub rfh_roll6: f64,
    pub rfh_diff: f64,
}

/// Computes lag statistics from `history`, oldest first.
///
/// Short history degrades instead of failing: missing lags are 0,
/// `rfh_roll3` falls back to `rfh_lag1` below three values and `rfh_roll6`
/// falls back to `rfh_roll3` below six.
///
/// # Errors
///
/// Returns [`ForecastError::InvalidInput`] if any value is non-finite.
pub fn lag_and_rolling_features(history: &[f64]) -> Result<LagFeatures> {
    if let Some(bad) = history.iter().find(|v| !v.is_finite()) {
        return Err(ForecastError::InvalidInput(format!(
            "non-finite rainfall value {bad} in feature history"
        )));
    }

    let n = history.len();
    let rfh_lag1 = history.last().copied().unwrap_or(0.0);
    let rfh_lag2 = if n >= 2 { history[n - 2] } else { 0.0 };
    let rfh_roll3 = if n >= 3 { mean(&history[n - 3..]) } else { rfh_lag1 };
    let rfh_roll6 = if n >= 6 { mean(&history[n - 6..]) } else { rfh_roll3 };
    let rfh_diff = if n >= 2 { rfh_lag1 - rfh_lag2 } else { 0.0 };

    Ok(LagFeatures {
        rfh_lag1,
        rfh_lag2,
        rfh_roll3,
        rfh_roll6,
        rfh_diff,
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn empty_history_is_all_zero() {
        let f = lag_and_rolling_features(&[]).unwrap();
        assert_eq!(f, LagFeatures::default());
    }

    #[test]
    fn single_value_seeds_lag1_only() {
        let f = lag_and_rolling_features(&[42.0]).unwrap();
        assert_eq!(f.rfh_lag1, 42.0);
        assert_eq!(f.rfh_lag2, 0.0);
        assert_eq!(f.rfh_diff, 0.0);
        assert_eq!(f.rfh_roll3, 42.0);
        assert_eq!(f.rfh_roll6, 42.0);
    }

    #[test]
    fn four_values_use_roll3_for_roll6() {
        let f = lag_and_rolling_features(&[1.0, 2.0, 3.0, 7.0]).unwrap();
        assert_eq!(f.rfh_lag1, 7.0);
        assert_eq!(f.rfh_lag2, 3.0);
        assert_eq!(f.rfh_diff, 4.0);
        assert_abs_diff_eq!(f.rfh_roll3, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(f.rfh_roll6, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn full_window() {
        let f = lag_and_rolling_features(&[100.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        assert_abs_diff_eq!(f.rfh_roll3, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(f.rfh_roll6, 3.5, epsilon = 1e-12);
        assert_eq!(f.rfh_diff, -1.0);
    }

    #[test]
    fn rejects_infinite_history() {
        let err = lag_and_rolling_features(&[1.0, f64::INFINITY]).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    proptest! {
        #[test]
        fn roll6_is_mean_of_last_six(values in prop::collection::vec(0.0f64..500.0, 6..24)) {
            let f = lag_and_rolling_features(&values).unwrap();
            let tail = &values[values.len() - 6..];
            let expected = tail.iter().sum::<f64>() / 6.0;
            prop_assert!((f.rfh_roll6 - expected).abs() < 1e-9);
        }
    }
}
