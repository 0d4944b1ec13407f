//! Operating threshold for probabilistic classifiers
//!
//! The cut-off is chosen at training time to trade precision against recall
//! and is stored next to the model. It is never assumed to be 0.5.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{FormcastError, Result};

/// Probability cut-off in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(FormcastError::Config(format!(
                "threshold must lie in [0, 1], got {}",
                value
            )));
        }
        Ok(Threshold(value))
    }

    /// Load a threshold artifact holding a single JSON number
    pub fn load(path: &Path) -> Result<Self> {
        let artifact_error = |message: String| FormcastError::ArtifactLoad {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| artifact_error(e.to_string()))?;
        let value: f64 =
            serde_json::from_str(content.trim()).map_err(|e| artifact_error(e.to_string()))?;
        let threshold = Threshold::new(value).map_err(|e| artifact_error(e.to_string()))?;

        log::info!("Loaded operating threshold {} from {}", threshold, path.display());
        Ok(threshold)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Positive decision when the probability reaches the threshold
    pub fn decide(&self, probability: f64) -> bool {
        probability >= self.0
    }
}

impl TryFrom<f64> for Threshold {
    type Error = FormcastError;

    fn try_from(value: f64) -> Result<Self> {
        Threshold::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}
