//! Feature schemas and the vectors encoded against them
//!
//! A schema is the ordered list of columns a model was fit on. Every encoded
//! vector carries the schema it was built for, so positions and names can
//! never drift apart.

use crate::{FormcastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered, duplicate-free list of feature columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Create a schema, rejecting duplicate column names
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if index.insert(column.clone(), i).is_some() {
                return Err(FormcastError::Config(format!(
                    "duplicate column {:?} in feature schema",
                    column
                )));
            }
        }
        Ok(FeatureSchema { columns, index })
    }

    pub fn from_names(names: &[&str]) -> Result<Self> {
        Self::new(names.iter().map(|s| s.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column in the model's input
    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = FormcastError;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        FeatureSchema::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

/// A feature vector laid out exactly as its schema prescribes
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl EncodedVector {
    /// Wrap values for a schema. The length must match exactly.
    pub fn new(schema: Arc<FeatureSchema>, values: Vec<f64>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(FormcastError::SchemaMismatch {
                expected: schema.len(),
                found: values.len(),
                detail: "encoded vector length differs from the feature schema".to_string(),
            });
        }
        Ok(EncodedVector { schema, values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub(crate) fn schema_arc(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a slot by column name
    pub fn get(&self, column: &str) -> Option<f64> {
        self.schema.position(column).map(|i| self.values[i])
    }

    /// Iterate `(column, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.schema
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_rejects_duplicates() {
        let result = FeatureSchema::from_names(&["age", "bmi", "age"]);
        assert!(matches!(result, Err(FormcastError::Config(_))));
    }

    #[test]
    fn test_schema_positions() {
        let schema = FeatureSchema::from_names(&["age", "bmi", "children"]).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.position("bmi"), Some(1));
        assert_eq!(schema.position("smoker_yes"), None);
    }

    #[test]
    fn test_schema_deserialize_checks_duplicates() {
        let ok: FeatureSchema = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(ok.columns(), ["a", "b"]);
        assert!(serde_json::from_str::<FeatureSchema>(r#"["a", "a"]"#).is_err());
    }

    #[test]
    fn test_vector_length_must_match() {
        let schema = Arc::new(FeatureSchema::from_names(&["a", "b"]).unwrap());
        let err = EncodedVector::new(schema.clone(), vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            FormcastError::SchemaMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));

        let v = EncodedVector::new(schema, vec![1.0, 2.0]).unwrap();
        assert_eq!(v.get("b"), Some(2.0));
        let pairs: Vec<_> = v.iter().collect();
        assert_eq!(pairs, vec![("a", 1.0), ("b", 2.0)]);
    }
}
