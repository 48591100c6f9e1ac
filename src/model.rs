//! Model capability consumed by the simulator, plus a TOML-described
//! linear model so the binary can run without any training code.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::schema::{FeatureSchema, ModelInput};

/// Failure reported by a model adapter.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// A trained regressor mapping one aligned feature row to rainfall (mm).
pub trait Regressor {
    /// Predicts a single value.
    ///
    /// # Errors
    ///
    /// Any adapter-specific failure; the simulator reports it as a
    /// prediction failure for the current step.
    fn predict(&self, input: &ModelInput<'_>) -> Result<f64, ModelError>;

    /// Column order the model was trained on, if it knows it. When present
    /// it overrides any schema supplied by the caller.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}

/// Adapts a closure into a [`Regressor`] with no schema of its own.
///
/// ```
/// use rainfall_sim::model::{PredictFn, Regressor};
///
/// let model = PredictFn::new(|input| Ok(input.values().iter().sum()));
/// assert!(model.feature_names().is_none());
/// ```
pub struct PredictFn<F> {
    f: F,
}

impl<F> PredictFn<F>
where
    F: Fn(&ModelInput<'_>) -> Result<f64, ModelError>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Regressor for PredictFn<F>
where
    F: Fn(&ModelInput<'_>) -> Result<f64, ModelError>,
{
    fn predict(&self, input: &ModelInput<'_>) -> Result<f64, ModelError> {
        (self.f)(input)
    }
}

/// Model family, used to pick the perturbation profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[serde(rename = "xgboost")]
    XgBoost,
    RandomForest,
    #[serde(rename = "lightgbm")]
    LightGbm,
    Linear,
}

/// How much stochastic perturbation a model family receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseClass {
    /// Gradient-boosted ensembles, whose recursive output drifts the most.
    Boosted,
    Standard,
}

impl ModelKind {
    pub fn noise_class(self) -> NoiseClass {
        match self {
            ModelKind::XgBoost => NoiseClass::Boosted,
            ModelKind::RandomForest | ModelKind::LightGbm | ModelKind::Linear => {
                NoiseClass::Standard
            }
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::XgBoost => "xgboost",
            ModelKind::RandomForest => "random_forest",
            ModelKind::LightGbm => "lightgbm",
            ModelKind::Linear => "linear",
        })
    }
}

/// `intercept + Σ weight·feature`, described in TOML:
///
/// ```toml
/// name = "LightGBM"
/// kind = "lightgbm"
/// intercept = 4.0
/// features = ["rfh_lag1", "month_avg_rfh"]
/// weights = [0.35, 0.6]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearModel {
    pub name: String,
    pub kind: ModelKind,
    #[serde(default)]
    pub intercept: f64,
    features: Vec<String>,
    weights: Vec<f64>,
}

impl LinearModel {
    /// Builds a model directly.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if lengths differ, names repeat, or a
    /// coefficient is non-finite.
    pub fn new(
        name: impl Into<String>,
        kind: ModelKind,
        intercept: f64,
        features: Vec<String>,
        weights: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let model = Self {
            name: name.into(),
            kind,
            intercept,
            features,
            weights,
        };
        model.check()?;
        Ok(model)
    }

    /// Parses a model from TOML.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` for malformed TOML or inconsistent
    /// coefficients.
    pub fn from_toml_str(s: &str) -> Result<Self, ModelError> {
        let model: Self = toml::from_str(s).map_err(|e| ModelError(e.to_string()))?;
        model.check()?;
        Ok(model)
    }

    /// Reads and parses a model file.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if the file is unreadable or invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ModelError(format!("cannot read \"{}\": {e}", path.display())))?;
        Self::from_toml_str(&content)
            .map_err(|e| ModelError(format!("\"{}\": {e}", path.display())))
    }

    pub fn schema(&self) -> FeatureSchema {
        // `check` already rejected duplicates.
        FeatureSchema::new(self.features.iter().cloned()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), ModelError> {
        if self.features.len() != self.weights.len() {
            return Err(ModelError(format!(
                "model \"{}\": {} features but {} weights",
                self.name,
                self.features.len(),
                self.weights.len()
            )));
        }
        if self.features.is_empty() {
            return Err(ModelError(format!("model \"{}\" has no features", self.name)));
        }
        FeatureSchema::new(self.features.iter().cloned())
            .map_err(|e| ModelError(format!("model \"{}\": {e}", self.name)))?;
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelError(format!(
                "model \"{}\" has non-finite coefficients",
                self.name
            )));
        }
        Ok(())
    }
}

impl Regressor for LinearModel {
    fn predict(&self, input: &ModelInput<'_>) -> Result<f64, ModelError> {
        let mut y = self.intercept;
        for (name, w) in self.features.iter().zip(&self.weights) {
            let x = input
                .get(name)
                .ok_or_else(|| ModelError(format!("input is missing feature \"{name}\"")))?;
            y += w * x;
        }
        Ok(y)
    }

    fn feature_names(&self) -> Option<&[String]> {
        Some(&self.features)
    }
}

/// A model registered under a display name.
pub struct NamedModel {
    pub name: String,
    pub kind: ModelKind,
    pub model: Box<dyn Regressor + Send + Sync>,
}

impl fmt::Debug for NamedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedModel")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Models available to a batch, kept in registration order.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<NamedModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model; a later registration with the same name replaces the
    /// earlier one in place.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: ModelKind,
        model: impl Regressor + Send + Sync + 'static,
    ) {
        let entry = NamedModel {
            name: name.into(),
            kind,
            model: Box::new(model),
        };
        match self.models.iter_mut().find(|m| m.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.models.push(entry),
        }
    }

    /// Loads a [`LinearModel`] file and registers it under its own name.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if the file is invalid.
    pub fn load_linear(&mut self, path: &Path) -> Result<&NamedModel, ModelError> {
        let model = LinearModel::from_toml_file(path)?;
        let name = model.name.clone();
        self.register(name.clone(), model.kind, model);
        self.get(&name)
            .ok_or_else(|| ModelError(format!("model \"{name}\" vanished after registration")))
    }

    pub fn get(&self, name: &str) -> Option<&NamedModel> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedModel> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
