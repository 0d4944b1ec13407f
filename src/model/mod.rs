//! Pre-trained model backends
//!
//! Models are opaque behind the [`Model`] trait: a fixed input width, a
//! `predict` and, for classifiers that support it, `predict_proba`. Concrete
//! backends are deserialized from JSON artifacts tagged by `kind`.

pub mod ensemble;
pub mod linear;
pub mod tree;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{FormcastError, Result};

pub use ensemble::{GradientBoosting, RandomForest};
pub use linear::{LinearModel, LogisticModel};
pub use tree::{DecisionTree, Tree};

/// What a model's `predict` output means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Regression,
    Classification,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Regression => write!(f, "regression"),
            Task::Classification => write!(f, "classification"),
        }
    }
}

/// Inference capability of a trained model
pub trait Model: fmt::Debug + Send + Sync {
    /// Backend name for logs and errors
    fn name(&self) -> &'static str;

    fn task(&self) -> Task;

    /// Number of input features the model was fit on
    fn n_features(&self) -> usize;

    /// Regression value, or predicted class index for classifiers
    fn predict(&self, features: &[f64]) -> Result<f64>;

    /// Probability of the positive class (index 1)
    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        let _ = features;
        Err(FormcastError::ModelInvocation(format!(
            "{} model does not expose class probabilities",
            self.name()
        )))
    }

    fn supports_proba(&self) -> bool {
        false
    }
}

/// Serialized form of every supported backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    Logistic(LogisticModel),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl ModelArtifact {
    /// Validate and box the backend
    pub fn into_model(self) -> std::result::Result<Box<dyn Model>, String> {
        let model: Box<dyn Model> = match self {
            ModelArtifact::Linear(m) => {
                m.validate()?;
                Box::new(m)
            }
            ModelArtifact::Logistic(m) => {
                m.validate()?;
                Box::new(m)
            }
            ModelArtifact::DecisionTree(m) => {
                m.validate()?;
                Box::new(m)
            }
            ModelArtifact::RandomForest(m) => {
                m.validate()?;
                Box::new(m)
            }
            ModelArtifact::GradientBoosting(m) => {
                m.validate()?;
                Box::new(m)
            }
        };
        Ok(model)
    }
}

/// Deserialize a model artifact once; the result is shared read-only
pub fn load_model(path: &Path) -> Result<Box<dyn Model>> {
    let artifact_error = |message: String| FormcastError::ArtifactLoad {
        path: path.to_path_buf(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| artifact_error(e.to_string()))?;
    let artifact: ModelArtifact =
        serde_json::from_str(&content).map_err(|e| artifact_error(e.to_string()))?;
    let model = artifact.into_model().map_err(artifact_error)?;

    log::info!(
        "Loaded {} {} model ({} features) from {}",
        model.name(),
        model.task(),
        model.n_features(),
        path.display()
    );
    Ok(model)
}

/// Reject inputs whose width differs from what the model was fit on
pub(crate) fn check_width(name: &str, expected: usize, features: &[f64]) -> Result<()> {
    if features.len() != expected {
        return Err(FormcastError::ModelInvocation(format!(
            "{} model expects {} features, got {}",
            name,
            expected,
            features.len()
        )));
    }
    Ok(())
}

/// Reject non-finite model outputs
pub(crate) fn check_output(name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(FormcastError::ModelInvocation(format!(
            "{} model produced a non-finite output",
            name
        )));
    }
    Ok(value)
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Index of the largest weight, first one on ties
pub(crate) fn argmax(weights: &[f64]) -> usize {
    let mut best = 0;
    for (i, w) in weights.iter().enumerate() {
        if *w > weights[best] {
            best = i;
        }
    }
    best
}
