//! Tree ensembles: bagged forests and gradient-boosted trees

use serde::{Deserialize, Serialize};

use super::tree::{value_width, Tree};
use super::{argmax, check_output, check_width, sigmoid, Model, Task};
use crate::{FormcastError, Result};

fn default_classes() -> usize {
    2
}

/// Random forest: averages per-tree class distributions (or leaf values)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub task: Task,
    pub n_features: usize,
    #[serde(default = "default_classes")]
    pub n_classes: usize,
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.task == Task::Classification && self.n_classes < 2 {
            return Err("a classifier needs at least two classes".to_string());
        }
        let width = value_width(self.task, self.n_classes);
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, width)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Mean class distribution across trees
    fn class_distribution(&self, features: &[f64]) -> Result<Vec<f64>> {
        let mut mean = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (m, p) in mean.iter_mut().zip(tree.class_distribution(features)?) {
                *m += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(mean.into_iter().map(|m| m / n).collect())
    }
}

impl Model for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn task(&self) -> Task {
        self.task
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        check_width(self.name(), self.n_features, features)?;
        match self.task {
            Task::Regression => {
                let sum: f64 = self.trees.iter().map(|t| t.leaf_value(features)[0]).sum();
                check_output(self.name(), sum / self.trees.len() as f64)
            }
            Task::Classification => Ok(argmax(&self.class_distribution(features)?) as f64),
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        check_width(self.name(), self.n_features, features)?;
        if self.task != Task::Classification {
            return Err(FormcastError::ModelInvocation(
                "regression forest has no class probabilities".to_string(),
            ));
        }
        Ok(self.class_distribution(features)?[1])
    }

    fn supports_proba(&self) -> bool {
        self.task == Task::Classification
    }
}

/// Gradient-boosted trees: `init_score + Σ leaf values`, passed through a
/// sigmoid for binary classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub task: Task,
    pub n_features: usize,
    #[serde(default)]
    pub init_score: f64,
    pub trees: Vec<Tree>,
}

impl GradientBoosting {
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("booster has no trees".to_string());
        }
        if !self.init_score.is_finite() {
            return Err("init_score must be finite".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, 1)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Raw additive score before any link function
    pub fn raw_score(&self, features: &[f64]) -> Result<f64> {
        check_width(self.name(), self.n_features, features)?;
        let score = self.init_score
            + self
                .trees
                .iter()
                .map(|t| t.leaf_value(features)[0])
                .sum::<f64>();
        check_output(self.name(), score)
    }
}

impl Model for GradientBoosting {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    fn task(&self) -> Task {
        self.task
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        match self.task {
            Task::Regression => self.raw_score(features),
            Task::Classification => {
                let p = self.predict_proba(features)?;
                Ok(if p > 0.5 { 1.0 } else { 0.0 })
            }
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if self.task != Task::Classification {
            return Err(FormcastError::ModelInvocation(
                "regression booster has no class probabilities".to_string(),
            ));
        }
        Ok(sigmoid(self.raw_score(features)?))
    }

    fn supports_proba(&self) -> bool {
        self.task == Task::Classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> Tree {
        Tree {
            left: vec![1, -1, -1],
            right: vec![2, -1, -1],
            feature: vec![feature, 0, 0],
            threshold: vec![threshold, 0.0, 0.0],
            value: vec![vec![0.0; left.len()], left, right],
        }
    }

    fn forest() -> RandomForest {
        RandomForest {
            task: Task::Classification,
            n_features: 2,
            n_classes: 2,
            trees: vec![
                split(0, 0.5, vec![8.0, 2.0], vec![1.0, 9.0]),
                split(1, 10.0, vec![6.0, 4.0], vec![0.0, 10.0]),
            ],
        }
    }

    #[test]
    fn test_forest_averages_probabilities() {
        let model = forest();
        model.validate().unwrap();
        // (0.2 + 0.4) / 2
        assert!((model.predict_proba(&[0.0, 0.0]).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(model.predict(&[0.0, 0.0]).unwrap(), 0.0);
        // (0.9 + 1.0) / 2
        assert!((model.predict_proba(&[1.0, 20.0]).unwrap() - 0.95).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0, 20.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_forest_exact_tie_predicts_first_class() {
        let model = RandomForest {
            trees: vec![split(0, 0.5, vec![5.0, 5.0], vec![5.0, 5.0])],
            ..forest()
        };
        assert_eq!(model.predict_proba(&[0.0, 0.0]).unwrap(), 0.5);
        assert_eq!(model.predict(&[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_regression_forest() {
        let model = RandomForest {
            task: Task::Regression,
            n_features: 1,
            n_classes: 2,
            trees: vec![split(0, 1.0, vec![2.0], vec![4.0]), split(0, 2.0, vec![6.0], vec![8.0])],
        };
        model.validate().unwrap();
        assert_eq!(model.predict(&[1.5]).unwrap(), 5.0);
        assert!(model.predict_proba(&[1.5]).is_err());
    }

    #[test]
    fn test_boosting_sums_leaves() {
        let model = GradientBoosting {
            task: Task::Classification,
            n_features: 2,
            init_score: -1.0,
            trees: vec![
                split(0, 0.5, vec![-0.5], vec![0.75]),
                split(1, 3.0, vec![0.25], vec![1.25]),
            ],
        };
        model.validate().unwrap();
        assert_eq!(model.raw_score(&[0.0, 0.0]).unwrap(), -1.25);
        assert_eq!(model.raw_score(&[1.0, 5.0]).unwrap(), 1.0);
        let p = model.predict_proba(&[1.0, 5.0]).unwrap();
        assert!((p - sigmoid(1.0)).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0, 5.0]).unwrap(), 1.0);
        assert_eq!(model.predict(&[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_boosting_width_mismatch() {
        let model = GradientBoosting {
            task: Task::Classification,
            n_features: 2,
            init_score: 0.0,
            trees: vec![split(0, 0.5, vec![0.1], vec![0.2])],
        };
        assert!(matches!(
            model.predict_proba(&[1.0]),
            Err(FormcastError::ModelInvocation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_and_wide_leaves() {
        let mut model = forest();
        model.trees.clear();
        assert!(model.validate().is_err());

        let booster = GradientBoosting {
            task: Task::Classification,
            n_features: 2,
            init_score: 0.0,
            trees: vec![split(0, 0.5, vec![0.1, 0.2], vec![0.2, 0.3])],
        };
        assert!(booster.validate().is_err());
    }
}
