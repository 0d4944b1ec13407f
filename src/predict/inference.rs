//! Model inference for predictions

use std::path::Path;

use serde::Serialize;

use super::threshold::Threshold;
use crate::features::{EncodedVector, FeatureEncoder, Scaler, ScalerParams};
use crate::model::{load_model, Model, Task};
use crate::profiles::Profile;
use crate::{FormcastError, RawInput, Result};

/// Interpreted model output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Regression estimate
    Value { value: f64 },
    /// Hard class label, with the positive-class probability when available
    Label {
        label: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        probability: Option<f64>,
    },
    /// Binary decision at the operating threshold
    Decision {
        decision: bool,
        probability: f64,
        threshold: f64,
    },
}

impl Outcome {
    /// Whether the outcome is the positive class, for classifiers
    pub fn is_positive(&self) -> Option<bool> {
        match self {
            Outcome::Value { .. } => None,
            Outcome::Label { label, .. } => Some(*label == 1),
            Outcome::Decision { decision, .. } => Some(*decision),
        }
    }

    pub fn probability(&self) -> Option<f64> {
        match self {
            Outcome::Value { .. } => None,
            Outcome::Label { probability, .. } => *probability,
            Outcome::Decision { probability, .. } => Some(*probability),
        }
    }
}

/// Everything needed to answer predictions for one profile.
///
/// Artifacts are loaded once at construction and only read afterwards.
#[derive(Debug)]
pub struct PredictionService {
    profile: Profile,
    encoder: FeatureEncoder,
    scaler: Option<Scaler>,
    model: Box<dyn Model>,
    threshold: Option<Threshold>,
}

impl PredictionService {
    /// Assemble a service from already loaded artifacts
    pub fn new(
        profile: Profile,
        model: Box<dyn Model>,
        scaler: Option<ScalerParams>,
        threshold: Option<Threshold>,
    ) -> Result<Self> {
        let encoder = profile.encoder()?;
        let width = encoder.schema().len();

        if model.n_features() != width {
            return Err(FormcastError::SchemaMismatch {
                expected: model.n_features(),
                found: width,
                detail: format!(
                    "{} model was fit on {} features but profile {} encodes {}",
                    model.name(),
                    model.n_features(),
                    profile.name,
                    width
                ),
            });
        }
        if model.task() != profile.task {
            return Err(FormcastError::Config(format!(
                "profile {} expects a {} model, artifact is {}",
                profile.name,
                profile.task,
                model.task()
            )));
        }
        if threshold.is_some() && !model.supports_proba() {
            return Err(FormcastError::Config(format!(
                "profile {} has a threshold but the {} model exposes no probabilities",
                profile.name,
                model.name()
            )));
        }

        let scaler = scaler
            .map(|params| Scaler::new(&params, encoder.schema().clone()))
            .transpose()?;

        Ok(PredictionService {
            profile,
            encoder,
            scaler,
            model,
            threshold,
        })
    }

    /// Load every artifact a profile names, relative to `base_dir`
    pub fn load(profile: Profile, base_dir: &Path) -> Result<Self> {
        let artifacts = profile.artifacts.clone();
        let model = load_model(&base_dir.join(&artifacts.model))?;
        let scaler = artifacts
            .scaler
            .map(|p| ScalerParams::load(&base_dir.join(p)))
            .transpose()?;
        let threshold = artifacts
            .threshold
            .map(|p| Threshold::load(&base_dir.join(p)))
            .transpose()?;

        let service = Self::new(profile, model, scaler, threshold)?;
        log::info!("Prediction service ready for {}", service.profile.name);
        Ok(service)
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn threshold(&self) -> Option<Threshold> {
        self.threshold
    }

    /// Encode then scale; the vector the model will actually see
    pub fn encode(&self, input: &RawInput) -> Result<EncodedVector> {
        let encoded = self.encoder.encode(input)?;
        match &self.scaler {
            Some(scaler) => scaler.scale(&encoded),
            None => Ok(encoded),
        }
    }

    /// Encode, scale and run the model on one form submission
    pub fn predict(&self, input: &RawInput) -> Result<Outcome> {
        let features = self.encode(input)?;
        log::debug!("Encoded features: {:?}", features.values());
        self.predict_encoded(&features)
    }

    /// Run the model on an already encoded and scaled vector
    pub fn predict_encoded(&self, features: &EncodedVector) -> Result<Outcome> {
        if features.schema() != &**self.encoder.schema() {
            return Err(FormcastError::SchemaMismatch {
                expected: self.encoder.schema().len(),
                found: features.len(),
                detail: "vector was encoded for a different schema".to_string(),
            });
        }
        let x = features.values();

        let outcome = match (self.model.task(), self.threshold) {
            (Task::Regression, _) => Outcome::Value {
                value: self.model.predict(x)?,
            },
            (Task::Classification, Some(threshold)) => {
                let probability = self.probability(x)?;
                Outcome::Decision {
                    decision: threshold.decide(probability),
                    probability,
                    threshold: threshold.value(),
                }
            }
            (Task::Classification, None) => {
                let raw = self.model.predict(x)?;
                let probability = if self.model.supports_proba() {
                    Some(self.probability(x)?)
                } else {
                    None
                };
                Outcome::Label {
                    label: class_label(raw)?,
                    probability,
                }
            }
        };

        log::debug!("{} outcome: {:?}", self.profile.name, outcome);
        Ok(outcome)
    }

    fn probability(&self, x: &[f64]) -> Result<f64> {
        let p = self.model.predict_proba(x)?;
        if !(0.0..=1.0).contains(&p) {
            return Err(FormcastError::ModelInvocation(format!(
                "{} model returned probability {} outside [0, 1]",
                self.model.name(),
                p
            )));
        }
        Ok(p)
    }
}

/// Classifier output must be a non-negative whole class index
fn class_label(raw: f64) -> Result<u32> {
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > u32::MAX as f64 {
        return Err(FormcastError::ModelInvocation(format!(
            "classifier returned {} instead of a class index",
            raw
        )));
    }
    Ok(raw as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureSchema, FieldRule};
    use crate::model::{LinearModel, LogisticModel};
    use crate::profiles::ArtifactPaths;
    use crate::{raw_input, FieldValue};
    use std::io::Write;

    fn profile(task: Task) -> Profile {
        Profile {
            name: "toy".to_string(),
            title: "Toy".to_string(),
            task,
            schema: FeatureSchema::from_names(&["x", "flag_yes"]).unwrap(),
            artifacts: ArtifactPaths {
                model: "model.json".into(),
                scaler: None,
                threshold: None,
            },
            labels: None,
            pages: Vec::new(),
            fields: vec![
                FieldRule::numeric("x"),
                FieldRule::one_hot_drop_first("flag", &["no", "yes"]),
            ],
        }
    }

    /// Always returns the same class and probability
    #[derive(Debug)]
    struct Fixed {
        class: f64,
        proba: Option<f64>,
    }

    impl Model for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn task(&self) -> Task {
            Task::Classification
        }

        fn n_features(&self) -> usize {
            2
        }

        fn predict(&self, _features: &[f64]) -> Result<f64> {
            Ok(self.class)
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<f64> {
            self.proba
                .ok_or_else(|| FormcastError::ModelInvocation("no proba".to_string()))
        }

        fn supports_proba(&self) -> bool {
            self.proba.is_some()
        }
    }

    fn input() -> RawInput {
        raw_input([("x", FieldValue::from(2.0)), ("flag", "yes".into())])
    }

    #[test]
    fn test_regression_value() {
        let model = LinearModel::new(vec![10.0, 5.0], 1.0);
        let service =
            PredictionService::new(profile(Task::Regression), Box::new(model), None, None).unwrap();
        assert_eq!(service.predict(&input()).unwrap(), Outcome::Value { value: 26.0 });
    }

    #[test]
    fn test_threshold_decisions() {
        for (p, expected) in [(0.42, false), (0.55, true), (0.5, true)] {
            let model = Fixed {
                class: 0.0,
                proba: Some(p),
            };
            let service = PredictionService::new(
                profile(Task::Classification),
                Box::new(model),
                None,
                Some(Threshold::new(0.5).unwrap()),
            )
            .unwrap();
            let outcome = service.predict(&input()).unwrap();
            assert_eq!(
                outcome,
                Outcome::Decision {
                    decision: expected,
                    probability: p,
                    threshold: 0.5
                }
            );
        }
    }

    #[test]
    fn test_configured_threshold_is_used() {
        let model = Fixed {
            class: 0.0,
            proba: Some(0.35),
        };
        let service = PredictionService::new(
            profile(Task::Classification),
            Box::new(model),
            None,
            Some(Threshold::new(0.3).unwrap()),
        )
        .unwrap();
        assert_eq!(service.predict(&input()).unwrap().is_positive(), Some(true));
    }

    #[test]
    fn test_label_without_threshold() {
        let model = Fixed {
            class: 1.0,
            proba: None,
        };
        let service =
            PredictionService::new(profile(Task::Classification), Box::new(model), None, None)
                .unwrap();
        assert_eq!(
            service.predict(&input()).unwrap(),
            Outcome::Label {
                label: 1,
                probability: None
            }
        );
    }

    #[test]
    fn test_label_carries_probability() {
        let model = LogisticModel::new(vec![1.0, 0.0], -2.0);
        let service =
            PredictionService::new(profile(Task::Classification), Box::new(model), None, None)
                .unwrap();
        let outcome = service.predict(&input()).unwrap();
        assert_eq!(outcome.probability(), Some(0.5));
        assert_eq!(outcome.is_positive(), Some(false));
    }

    #[test]
    fn test_threshold_requires_probabilities() {
        let model = Fixed {
            class: 1.0,
            proba: None,
        };
        let err = PredictionService::new(
            profile(Task::Classification),
            Box::new(model),
            None,
            Some(Threshold::new(0.5).unwrap()),
        )
        .unwrap_err();
        assert!(matches!(err, FormcastError::Config(_)));
    }

    #[test]
    fn test_model_width_must_match_schema() {
        let model = LinearModel::new(vec![1.0, 2.0, 3.0], 0.0);
        let err = PredictionService::new(profile(Task::Regression), Box::new(model), None, None)
            .unwrap_err();
        assert!(matches!(err, FormcastError::SchemaMismatch { expected: 3, found: 2, .. }));
    }

    #[test]
    fn test_task_must_match_profile() {
        let model = LinearModel::new(vec![1.0, 2.0], 0.0);
        assert!(
            PredictionService::new(profile(Task::Classification), Box::new(model), None, None)
                .is_err()
        );
    }

    #[test]
    fn test_bad_class_label() {
        let model = Fixed {
            class: 0.5,
            proba: None,
        };
        let service =
            PredictionService::new(profile(Task::Classification), Box::new(model), None, None)
                .unwrap();
        assert!(matches!(
            service.predict(&input()),
            Err(FormcastError::ModelInvocation(_))
        ));
    }

    #[test]
    fn test_scaling_runs_before_model() {
        let params = ScalerParams {
            columns: vec!["x".to_string()],
            mean: vec![1.0],
            scale: vec![0.5],
        };
        let model = LinearModel::new(vec![1.0, 0.0], 0.0);
        let service =
            PredictionService::new(profile(Task::Regression), Box::new(model), Some(params), None)
                .unwrap();
        assert_eq!(service.encode(&input()).unwrap().values(), [2.0, 1.0]);
        assert_eq!(service.predict(&input()).unwrap(), Outcome::Value { value: 2.0 });
    }

    #[test]
    fn test_missing_field_propagates() {
        let model = LinearModel::new(vec![1.0, 0.0], 0.0);
        let service =
            PredictionService::new(profile(Task::Regression), Box::new(model), None, None).unwrap();
        let err = service
            .predict(&raw_input([("x", FieldValue::from(1.0))]))
            .unwrap_err();
        assert!(matches!(err, FormcastError::MissingField(f) if f == "flag"));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = std::fs::File::create(dir.path().join("model.json")).unwrap();
        write!(
            model,
            r#"{{"kind": "logistic", "coefficients": [0.0, 0.0], "intercept": 0.0}}"#
        )
        .unwrap();
        let mut threshold = std::fs::File::create(dir.path().join("threshold.json")).unwrap();
        write!(threshold, "0.5").unwrap();

        let mut profile = profile(Task::Classification);
        profile.artifacts.threshold = Some("threshold.json".into());
        let service = PredictionService::load(profile, dir.path()).unwrap();
        assert_eq!(service.threshold().map(|t| t.value()), Some(0.5));
        // sigmoid(0) == threshold, so the decision is positive
        assert_eq!(service.predict(&input()).unwrap().is_positive(), Some(true));
    }

    #[test]
    fn test_load_checks_loaded_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = std::fs::File::create(dir.path().join("model.json")).unwrap();
        write!(
            model,
            r#"{{"kind": "logistic", "coefficients": [0.0, 0.0, 0.0], "intercept": 0.0}}"#
        )
        .unwrap();

        let err = PredictionService::load(profile(Task::Classification), dir.path()).unwrap_err();
        assert!(matches!(err, FormcastError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = PredictionService::load(profile(Task::Regression), dir.path()).unwrap_err();
        assert!(matches!(err, FormcastError::ArtifactLoad { .. }));
    }
}
