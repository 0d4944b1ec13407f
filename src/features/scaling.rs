//! Standardization of encoded vectors
//!
//! Applies the mean/scale statistics a standard scaler learned at training
//! time. Scaling always runs after encoding and before the model, on the same
//! column layout the statistics were computed on.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::schema::{EncodedVector, FeatureSchema};
use crate::{FormcastError, Result};

/// Fitted scaler statistics, one entry per scaled column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl ScalerParams {
    /// Load scaler statistics from a JSON artifact
    pub fn load(path: &Path) -> Result<Self> {
        let artifact_error = |message: String| FormcastError::ArtifactLoad {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| artifact_error(e.to_string()))?;
        let params: ScalerParams =
            serde_json::from_str(&content).map_err(|e| artifact_error(e.to_string()))?;
        params.validate().map_err(artifact_error)?;

        log::info!("Loaded scaler for {} columns from {}", params.columns.len(), path.display());
        Ok(params)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.mean.len() != self.columns.len() || self.scale.len() != self.columns.len() {
            return Err(format!(
                "{} columns but {} means and {} scales",
                self.columns.len(),
                self.mean.len(),
                self.scale.len()
            ));
        }
        for (column, (mean, scale)) in self.columns.iter().zip(self.mean.iter().zip(&self.scale)) {
            if !mean.is_finite() {
                return Err(format!("mean for {} is not finite", column));
            }
            if !scale.is_finite() || *scale == 0.0 {
                return Err(format!("scale for {} must be finite and non-zero", column));
            }
        }
        Ok(())
    }
}

/// Scaler bound to the positions of a feature schema
#[derive(Debug, Clone)]
pub struct Scaler {
    schema: Arc<FeatureSchema>,
    /// (slot, mean, scale)
    slots: Vec<(usize, f64, f64)>,
}

impl Scaler {
    /// Bind scaler statistics to a schema. Slots not named by the scaler are
    /// passed through unchanged.
    pub fn new(params: &ScalerParams, schema: Arc<FeatureSchema>) -> Result<Self> {
        params.validate().map_err(FormcastError::Config)?;

        let mut slots = Vec::with_capacity(params.columns.len());
        for (i, column) in params.columns.iter().enumerate() {
            let slot = schema.position(column).ok_or_else(|| FormcastError::SchemaMismatch {
                expected: schema.len(),
                found: params.columns.len(),
                detail: format!("scaler column {:?} is not in the feature schema", column),
            })?;
            if slots.iter().any(|(s, _, _)| *s == slot) {
                return Err(FormcastError::Config(format!(
                    "scaler lists column {:?} twice",
                    column
                )));
            }
            slots.push((slot, params.mean[i], params.scale[i]));
        }

        Ok(Scaler { schema, slots })
    }

    /// `(x - mean) / scale` on every scaled slot
    pub fn scale(&self, vector: &EncodedVector) -> Result<EncodedVector> {
        self.apply(vector, |x, mean, scale| (x - mean) / scale)
    }

    /// Undo [`Scaler::scale`]
    pub fn inverse(&self, vector: &EncodedVector) -> Result<EncodedVector> {
        self.apply(vector, |x, mean, scale| x * scale + mean)
    }

    /// Number of slots the scaler touches
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn apply(&self, vector: &EncodedVector, f: impl Fn(f64, f64, f64) -> f64) -> Result<EncodedVector> {
        if vector.schema() != &*self.schema {
            return Err(FormcastError::SchemaMismatch {
                expected: self.schema.len(),
                found: vector.len(),
                detail: "vector was encoded for a different schema than the scaler".to_string(),
            });
        }

        let mut values = vector.values().to_vec();
        for &(slot, mean, scale) in &self.slots {
            values[slot] = f(values[slot], mean, scale);
        }
        EncodedVector::new(vector.schema_arc().clone(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::from_names(&["age", "balance", "married"]).unwrap())
    }

    fn params() -> ScalerParams {
        ScalerParams {
            columns: vec!["age".to_string(), "balance".to_string()],
            mean: vec![40.0, 1_000.0],
            scale: vec![10.0, 500.0],
        }
    }

    #[test]
    fn test_scale_leaves_unscaled_slots() {
        let scaler = Scaler::new(&params(), schema()).unwrap();
        let v = EncodedVector::new(schema(), vec![50.0, 0.0, 1.0]).unwrap();
        let scaled = scaler.scale(&v).unwrap();
        assert_eq!(scaled.values(), [1.0, -2.0, 1.0]);
    }

    #[test]
    fn test_scale_round_trip() {
        let scaler = Scaler::new(&params(), schema()).unwrap();
        let v = EncodedVector::new(schema(), vec![33.3, 1234.5, 0.0]).unwrap();
        let restored = scaler.inverse(&scaler.scale(&v).unwrap()).unwrap();
        for (a, b) in v.values().iter().zip(restored.values()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unknown_column() {
        let mut p = params();
        p.columns[1] = "income".to_string();
        assert!(matches!(
            Scaler::new(&p, schema()),
            Err(FormcastError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut p = params();
        p.scale[0] = 0.0;
        assert!(Scaler::new(&p, schema()).is_err());
    }

    #[test]
    fn test_other_schema_rejected() {
        let scaler = Scaler::new(&params(), schema()).unwrap();
        let other = Arc::new(FeatureSchema::from_names(&["age", "balance", "single"]).unwrap());
        let v = EncodedVector::new(other, vec![1.0, 2.0, 3.0]).unwrap();
        assert!(scaler.scale(&v).is_err());
    }

    #[test]
    fn test_load_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"columns": ["age"], "mean": [40.0], "scale": [10.0]}}"#
        )
        .unwrap();
        let loaded = ScalerParams::load(file.path()).unwrap();
        assert_eq!(loaded.columns, vec!["age".to_string()]);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, r#"{{"columns": ["age"], "mean": [], "scale": [1.0]}}"#).unwrap();
        assert!(matches!(
            ScalerParams::load(bad.path()),
            Err(FormcastError::ArtifactLoad { .. })
        ));
    }
}
