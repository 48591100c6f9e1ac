//! Stochastic perturbation of raw predictions and climatology blending.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::types::{BlendParams, NoiseProfile};
use crate::error::{ForecastError, Result};

/// One draw of the perturbation terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    pub noise: f64,
    pub year_var: f64,
}

impl Draw {
    /// No-op draw.
    pub const IDENTITY: Draw = Draw {
        noise: 0.0,
        year_var: 1.0,
    };

    /// `p0 * year_var + noise`
    pub fn apply(&self, p0: f64) -> f64 {
        p0 * self.year_var + self.noise
    }
}

/// Sampler for a [`NoiseProfile`].
///
/// A zero `noise_std` or `year_var_bound` skips the corresponding draw,
/// so a fully zero profile never touches the RNG.
#[derive(Debug, Clone, Copy)]
pub struct Perturbation {
    normal: Option<Normal<f64>>,
    year_var_bound: f64,
}

impl Perturbation {
    /// # Errors
    ///
    /// [`ForecastError::InvalidInput`] for a negative or non-finite
    /// parameter.
    pub fn new(profile: NoiseProfile) -> Result<Self> {
        let NoiseProfile {
            noise_std,
            year_var_bound,
        } = profile;
        if !noise_std.is_finite() || noise_std < 0.0 {
            return Err(ForecastError::InvalidInput(format!(
                "noise_std must be finite and >= 0, got {noise_std}"
            )));
        }
        if !year_var_bound.is_finite() || year_var_bound < 0.0 {
            return Err(ForecastError::InvalidInput(format!(
                "year_var_bound must be finite and >= 0, got {year_var_bound}"
            )));
        }
        let normal = if noise_std > 0.0 {
            Some(
                Normal::new(0.0, noise_std)
                    .map_err(|e| ForecastError::InvalidInput(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(Self {
            normal,
            year_var_bound,
        })
    }

    /// Draws noise first, then the year variation.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Draw {
        let noise = self.normal.map_or(0.0, |n| n.sample(rng));
        let b = self.year_var_bound;
        let year_var = if b > 0.0 {
            rng.random_range((1.0 - b)..(1.0 + b))
        } else {
            1.0
        };
        Draw { noise, year_var }
    }
}

/// Result of blending a perturbed prediction with climatology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    /// `month_avg * weight^exponent`
    pub climatology_term: f64,
    pub value: f64,
}

/// `(1 - alpha) * p1 + alpha * month_avg * weight^exponent`
pub fn blend(p1: f64, month_avg: f64, weight: f64, params: BlendParams) -> Blend {
    let climatology_term = month_avg * weight.powf(params.exponent);
    Blend {
        climatology_term,
        value: (1.0 - params.alpha) * p1 + params.alpha * climatology_term,
    }
}
