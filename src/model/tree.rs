//! Decision trees stored as flat node arrays
//!
//! Node `i` splits on `feature[i]` at `threshold[i]`: inputs with
//! `x[feature] <= threshold` go to `left[i]`, the rest to `right[i]`.
//! Leaves have `left[i] == right[i] == -1`. Children always have a larger
//! index than their parent, which rules out cycles.

use serde::{Deserialize, Serialize};

use super::{argmax, check_output, check_width, Model, Task};
use crate::{FormcastError, Result};

/// A single fitted tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub left: Vec<i64>,
    pub right: Vec<i64>,
    pub feature: Vec<usize>,
    pub threshold: Vec<f64>,
    /// Per-node output: class weights for classifiers, `[value]` for regressors
    pub value: Vec<Vec<f64>>,
}

impl Tree {
    /// A tree that is a single leaf
    pub fn leaf(value: Vec<f64>) -> Self {
        Tree {
            left: vec![-1],
            right: vec![-1],
            feature: vec![0],
            threshold: vec![0.0],
            value: vec![value],
        }
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.left[node] < 0
    }

    /// Check structural integrity against the model's input width and the
    /// expected width of each node's value
    pub fn validate(&self, n_features: usize, value_width: usize) -> std::result::Result<(), String> {
        let n = self.left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err("tree node arrays differ in length".to_string());
        }

        for i in 0..n {
            if self.value[i].len() != value_width {
                return Err(format!(
                    "node {} has {} outputs, expected {}",
                    i,
                    self.value[i].len(),
                    value_width
                ));
            }
            if self.value[i].iter().any(|v| !v.is_finite()) {
                return Err(format!("node {} has a non-finite output", i));
            }

            let (l, r) = (self.left[i], self.right[i]);
            if l < 0 || r < 0 {
                if l != -1 || r != -1 {
                    return Err(format!("node {} has exactly one child", i));
                }
                continue;
            }
            for child in [l, r] {
                if child as usize <= i || child as usize >= n {
                    return Err(format!("node {} has invalid child {}", i, child));
                }
            }
            if self.feature[i] >= n_features {
                return Err(format!(
                    "node {} splits on feature {} but the model has {} features",
                    i, self.feature[i], n_features
                ));
            }
            if !self.threshold[i].is_finite() {
                return Err(format!("node {} has a non-finite threshold", i));
            }
        }
        Ok(())
    }

    /// Walk from the root to the leaf an input falls into
    pub fn apply(&self, features: &[f64]) -> usize {
        let mut node = 0;
        while !self.is_leaf(node) {
            node = if features[self.feature[node]] <= self.threshold[node] {
                self.left[node] as usize
            } else {
                self.right[node] as usize
            };
        }
        node
    }

    /// Output stored at the leaf an input falls into
    pub fn leaf_value(&self, features: &[f64]) -> &[f64] {
        &self.value[self.apply(features)]
    }

    /// Class distribution at the leaf, normalized to sum to 1
    pub fn class_distribution(&self, features: &[f64]) -> Result<Vec<f64>> {
        let weights = self.leaf_value(features);
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(FormcastError::ModelInvocation(
                "leaf has no class weight".to_string(),
            ));
        }
        Ok(weights.iter().map(|w| w / total).collect())
    }
}

/// Number of outputs each node must carry for a task
pub(crate) fn value_width(task: Task, n_classes: usize) -> usize {
    match task {
        Task::Regression => 1,
        Task::Classification => n_classes,
    }
}

fn default_classes() -> usize {
    2
}

/// Single decision tree classifier or regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub task: Task,
    pub n_features: usize,
    #[serde(default = "default_classes")]
    pub n_classes: usize,
    pub tree: Tree,
}

impl DecisionTree {
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.task == Task::Classification && self.n_classes < 2 {
            return Err("a classifier needs at least two classes".to_string());
        }
        self.tree
            .validate(self.n_features, value_width(self.task, self.n_classes))
    }
}

impl Model for DecisionTree {
    fn name(&self) -> &'static str {
        "decision_tree"
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
            Task::Regression => check_output(self.name(), self.tree.leaf_value(features)[0]),
            Task::Classification => Ok(argmax(self.tree.leaf_value(features)) as f64),
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        check_width(self.name(), self.n_features, features)?;
        if self.task != Task::Classification {
            return Err(FormcastError::ModelInvocation(
                "regression tree has no class probabilities".to_string(),
            ));
        }
        Ok(self.tree.class_distribution(features)?[1])
    }

    fn supports_proba(&self) -> bool {
        self.task == Task::Classification
    }
}
