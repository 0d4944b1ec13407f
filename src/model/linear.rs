//! Linear models (ordinary least squares, Lasso, logistic regression)

use serde::{Deserialize, Serialize};

use super::{check_output, check_width, sigmoid, Model, Task};
use crate::Result;

fn validate_weights(coefficients: &[f64], intercept: f64) -> std::result::Result<(), String> {
    if coefficients.is_empty() {
        return Err("model has no coefficients".to_string());
    }
    if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
        return Err("coefficients and intercept must be finite".to_string());
    }
    Ok(())
}

fn decision(coefficients: &[f64], intercept: f64, features: &[f64]) -> f64 {
    intercept
        + coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
}

/// Linear regression: `intercept + w · x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        LinearModel {
            coefficients,
            intercept,
        }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        validate_weights(&self.coefficients, self.intercept)
    }
}

impl Model for LinearModel {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn task(&self) -> Task {
        Task::Regression
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        check_width(self.name(), self.n_features(), features)?;
        check_output(
            self.name(),
            decision(&self.coefficients, self.intercept, features),
        )
    }
}

/// Binary logistic regression: `sigmoid(intercept + w · x)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        LogisticModel {
            coefficients,
            intercept,
        }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        validate_weights(&self.coefficients, self.intercept)
    }
}

impl Model for LogisticModel {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn task(&self) -> Task {
        Task::Classification
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        let p = self.predict_proba(features)?;
        Ok(if p > 0.5 { 1.0 } else { 0.0 })
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        check_width(self.name(), self.n_features(), features)?;
        let z = check_output(
            self.name(),
            decision(&self.coefficients, self.intercept, features),
        )?;
        Ok(sigmoid(z))
    }

    fn supports_proba(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FormcastError;

    #[test]
    fn test_linear_predict() {
        let model = LinearModel::new(vec![256.9, 339.2], -11_938.5);
        let y = model.predict(&[30.0, 25.0]).unwrap();
        assert!((y - (-11_938.5 + 256.9 * 30.0 + 339.2 * 25.0)).abs() < 1e-9);
    }

    #[test]
    fn test_width_mismatch() {
        let model = LinearModel::new(vec![1.0, 2.0], 0.0);
        assert!(matches!(
            model.predict(&[1.0]),
            Err(FormcastError::ModelInvocation(_))
        ));
    }

    #[test]
    fn test_non_finite_output() {
        let model = LinearModel::new(vec![f64::MAX, f64::MAX], 0.0);
        assert!(model.predict(&[f64::MAX, f64::MAX]).is_err());
    }

    #[test]
    fn test_logistic_probability() {
        let model = LogisticModel::new(vec![1.0], 0.0);
        assert_eq!(model.predict_proba(&[0.0]).unwrap(), 0.5);
        assert_eq!(model.predict(&[0.0]).unwrap(), 0.0);
        assert!(model.predict_proba(&[3.0]).unwrap() > 0.9);
        assert_eq!(model.predict(&[3.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_validate() {
        assert!(LinearModel::new(vec![], 0.0).validate().is_err());
        assert!(LogisticModel::new(vec![f64::NAN], 0.0).validate().is_err());
        assert!(LinearModel::new(vec![1.0], 0.0).validate().is_ok());
    }
}
