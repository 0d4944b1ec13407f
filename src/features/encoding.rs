//! Form input to feature vector encoding
//!
//! A [`FeatureEncoder`] is a list of field rules bound to a [`FeatureSchema`].
//! Binding checks that the rules produce exactly the schema's columns, so a
//! constructed encoder can only ever emit vectors the model was fit on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::bucket::BucketRule;
use super::schema::{EncodedVector, FeatureSchema};
use crate::{FieldValue, FormcastError, RawInput, Result};

/// One selectable category of a nominal field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Category code the model was trained on
    pub value: String,
    /// Output column; defaults to `{field}_{value}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Reference (dropped) level: selecting it leaves every slot at 0
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reference: bool,
    /// Human-readable labels shown in the form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl Level {
    pub fn new(value: impl Into<String>) -> Self {
        Level {
            value: value.into(),
            column: None,
            reference: false,
            aliases: Vec::new(),
        }
    }

    /// Mark as the dropped reference level
    pub fn reference(mut self) -> Self {
        self.reference = true;
        self
    }

    /// Override the output column name
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Column this level sets, or `None` for the reference level
    pub fn column_name(&self, field: &str) -> Option<String> {
        if self.reference {
            return None;
        }
        Some(
            self.column
                .clone()
                .unwrap_or_else(|| format!("{}_{}", field, self.value)),
        )
    }

    pub fn matches(&self, raw: &str) -> bool {
        self.value == raw || self.aliases.iter().any(|a| a == raw)
    }
}

/// How one form field maps onto feature slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRule {
    /// Copied unchanged into one slot
    Numeric {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Single-select category, at most one slot set
    OneHot { field: String, levels: Vec<Level> },
    /// Multi-select categories, any subset of slots set
    MultiHot { field: String, levels: Vec<Level> },
    /// Numeric value binned by a rule, then one-hot encoded
    Bucket {
        field: String,
        rule: BucketRule,
        levels: Vec<Level>,
    },
}

impl FieldRule {
    pub fn numeric(field: &str) -> Self {
        FieldRule::Numeric {
            field: field.to_string(),
            column: None,
            min: None,
            max: None,
        }
    }

    /// Numeric field with the form's declared bounds
    pub fn numeric_in(field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        FieldRule::Numeric {
            field: field.to_string(),
            column: None,
            min,
            max,
        }
    }

    pub fn one_hot(field: &str, levels: Vec<Level>) -> Self {
        FieldRule::OneHot {
            field: field.to_string(),
            levels,
        }
    }

    /// One slot per category
    pub fn one_hot_all(field: &str, values: &[&str]) -> Self {
        Self::one_hot(field, values.iter().map(|v| Level::new(*v)).collect())
    }

    /// First category is the reference level and gets no slot
    pub fn one_hot_drop_first(field: &str, values: &[&str]) -> Self {
        let levels = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let level = Level::new(*v);
                if i == 0 {
                    level.reference()
                } else {
                    level
                }
            })
            .collect();
        Self::one_hot(field, levels)
    }

    pub fn multi_hot(field: &str, values: &[&str]) -> Self {
        FieldRule::MultiHot {
            field: field.to_string(),
            levels: values.iter().map(|v| Level::new(*v)).collect(),
        }
    }

    /// Bucketed field with one slot per bucket, named `{prefix}_{label}`
    pub fn bucket(field: &str, rule: BucketRule, prefix: &str) -> Self {
        let levels = rule
            .labels()
            .map(|label| Level::new(label).column(format!("{}_{}", prefix, label)))
            .collect();
        FieldRule::Bucket {
            field: field.to_string(),
            rule,
            levels,
        }
    }

    /// Override the output column of a numeric rule
    pub fn with_column(self, column: &str) -> Self {
        match self {
            FieldRule::Numeric {
                field, min, max, ..
            } => FieldRule::Numeric {
                field,
                column: Some(column.to_string()),
                min,
                max,
            },
            other => other,
        }
    }

    /// Attach a display alias to the level with the given code
    pub fn with_alias(mut self, value: &str, alias: &str) -> Self {
        if let Some(levels) = self.levels_mut() {
            if let Some(level) = levels.iter_mut().find(|l| l.value == value) {
                level.aliases.push(alias.to_string());
            }
        }
        self
    }

    pub fn field(&self) -> &str {
        match self {
            FieldRule::Numeric { field, .. }
            | FieldRule::OneHot { field, .. }
            | FieldRule::MultiHot { field, .. }
            | FieldRule::Bucket { field, .. } => field,
        }
    }

    pub fn levels(&self) -> Option<&[Level]> {
        match self {
            FieldRule::Numeric { .. } => None,
            FieldRule::OneHot { levels, .. }
            | FieldRule::MultiHot { levels, .. }
            | FieldRule::Bucket { levels, .. } => Some(levels),
        }
    }

    fn levels_mut(&mut self) -> Option<&mut Vec<Level>> {
        match self {
            FieldRule::Numeric { .. } => None,
            FieldRule::OneHot { levels, .. }
            | FieldRule::MultiHot { levels, .. }
            | FieldRule::Bucket { levels, .. } => Some(levels),
        }
    }

    /// Short description of the rule kind
    pub fn kind(&self) -> &'static str {
        match self {
            FieldRule::Numeric { .. } => "numeric",
            FieldRule::OneHot { .. } => "one-hot",
            FieldRule::MultiHot { .. } => "multi-hot",
            FieldRule::Bucket { .. } => "bucket",
        }
    }

    /// Every column this rule can write to
    pub fn columns(&self) -> Vec<String> {
        match self {
            FieldRule::Numeric { field, column, .. } => {
                vec![column.clone().unwrap_or_else(|| field.clone())]
            }
            FieldRule::OneHot { field, levels }
            | FieldRule::MultiHot { field, levels }
            | FieldRule::Bucket { field, levels, .. } => {
                levels.iter().filter_map(|l| l.column_name(field)).collect()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let field = self.field();
        let invalid = |message: String| {
            Err(FormcastError::Config(format!("field {}: {}", field, message)))
        };

        if let FieldRule::Numeric {
            min: Some(min),
            max: Some(max),
            ..
        } = self
        {
            if min > max {
                return invalid(format!("min {} exceeds max {}", min, max));
            }
        }

        let Some(levels) = self.levels() else {
            return Ok(());
        };
        if levels.is_empty() {
            return invalid("no levels declared".to_string());
        }

        let mut seen = HashSet::new();
        for level in levels {
            if !seen.insert(level.value.as_str()) {
                return invalid(format!("level {:?} declared twice", level.value));
            }
            for alias in &level.aliases {
                if !seen.insert(alias.as_str()) {
                    return invalid(format!("alias {:?} is ambiguous", alias));
                }
            }
        }

        let references = levels.iter().filter(|l| l.reference).count();
        match self {
            FieldRule::MultiHot { .. } if references > 0 => {
                invalid("multi-select fields cannot have a reference level".to_string())
            }
            _ if references > 1 => invalid("more than one reference level".to_string()),
            FieldRule::Bucket { rule, .. } => {
                let labels: HashSet<&str> = rule.labels().collect();
                let values: HashSet<&str> = levels.iter().map(|l| l.value.as_str()).collect();
                if labels != values {
                    return invalid("levels must match the bucket labels exactly".to_string());
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Resolve a selected category to its level
    fn find_level<'a>(levels: &'a [Level], field: &str, raw: &str) -> Result<&'a Level> {
        levels
            .iter()
            .find(|l| l.matches(raw))
            .ok_or_else(|| FormcastError::UnknownCategory {
                field: field.to_string(),
                value: raw.to_string(),
            })
    }

    fn bucket_level<'a>(
        rule: &BucketRule,
        levels: &'a [Level],
        field: &str,
        x: f64,
    ) -> Result<&'a Level> {
        let label = rule.bucketize(x).ok_or_else(|| FormcastError::InvalidValue {
            field: field.to_string(),
            message: "cannot bucket NaN".to_string(),
        })?;
        Self::find_level(levels, field, label)
    }

    /// Write this rule's slots. `slots` starts zeroed.
    fn encode_into(&self, value: &FieldValue, slots: &mut [f64], schema: &FeatureSchema) -> Result<()> {
        let field = self.field();

        match self {
            FieldRule::Numeric {
                column, min, max, ..
            } => {
                let x = value.as_number(field)?;
                if min.is_some_and(|m| x < m) || max.is_some_and(|m| x > m) {
                    return Err(FormcastError::InvalidValue {
                        field: field.to_string(),
                        message: format!(
                            "{} is outside [{}, {}]",
                            x,
                            min.map_or("-inf".to_string(), |m| m.to_string()),
                            max.map_or("inf".to_string(), |m| m.to_string()),
                        ),
                    });
                }
                let column = column.as_deref().unwrap_or(field);
                if let Some(i) = schema.position(column) {
                    slots[i] = x;
                }
            }
            FieldRule::OneHot { levels, .. } => {
                let raw = value.as_category(field)?;
                let level = Self::find_level(levels, field, &raw)?;
                set_level(level, field, slots, schema);
            }
            FieldRule::MultiHot { levels, .. } => {
                for raw in value.as_selection(field)? {
                    let level = Self::find_level(levels, field, &raw)?;
                    set_level(level, field, slots, schema);
                }
            }
            FieldRule::Bucket { rule, levels, .. } => {
                let level = match value {
                    FieldValue::Number(x) => Self::bucket_level(rule, levels, field, *x)?,
                    other => {
                        let raw = other.as_category(field)?;
                        match levels.iter().find(|l| l.matches(&raw)) {
                            Some(level) => level,
                            // Numeric text goes through the rule like a number
                            None => match other.as_number(field) {
                                Ok(x) => Self::bucket_level(rule, levels, field, x)?,
                                Err(_) => Self::find_level(levels, field, &raw)?,
                            },
                        }
                    }
                };
                set_level(level, field, slots, schema);
            }
        }
        Ok(())
    }
}

fn set_level(level: &Level, field: &str, slots: &mut [f64], schema: &FeatureSchema) {
    // Reference levels own no column
    if let Some(i) = level
        .column_name(field)
        .and_then(|column| schema.position(&column))
    {
        slots[i] = 1.0;
    }
}

/// Deterministic mapping from form input to a model's feature vector
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    rules: Vec<FieldRule>,
    schema: Arc<FeatureSchema>,
}

impl FeatureEncoder {
    /// Bind rules to a schema.
    ///
    /// Fails with [`FormcastError::SchemaMismatch`] unless the rules produce
    /// every schema column exactly once and nothing else.
    pub fn new(rules: Vec<FieldRule>, schema: FeatureSchema) -> Result<Self> {
        let mut fields = HashSet::new();
        let mut produced: HashMap<String, &str> = HashMap::new();

        for rule in &rules {
            rule.validate()?;
            if !fields.insert(rule.field()) {
                return Err(FormcastError::Config(format!(
                    "field {} has more than one encoding rule",
                    rule.field()
                )));
            }
            for column in rule.columns() {
                if let Some(previous) = produced.insert(column.clone(), rule.field()) {
                    return Err(FormcastError::SchemaMismatch {
                        expected: schema.len(),
                        found: produced.len(),
                        detail: format!(
                            "column {:?} is produced by both {} and {}",
                            column,
                            previous,
                            rule.field()
                        ),
                    });
                }
            }
        }

        let mismatch = |detail: String| FormcastError::SchemaMismatch {
            expected: schema.len(),
            found: produced.len(),
            detail,
        };
        if let Some(column) = produced.keys().find(|c| !schema.contains(c)) {
            return Err(mismatch(format!("column {:?} is not in the feature schema", column)));
        }
        if let Some(column) = schema.columns().iter().find(|c| !produced.contains_key(*c)) {
            return Err(mismatch(format!("schema column {:?} has no encoding rule", column)));
        }

        Ok(FeatureEncoder {
            rules,
            schema: Arc::new(schema),
        })
    }

    /// Encode one record.
    ///
    /// Every field a rule references must be present; fields no rule
    /// references are ignored. Slots for unselected categories stay 0.
    pub fn encode(&self, input: &RawInput) -> Result<EncodedVector> {
        let mut slots = vec![0.0; self.schema.len()];

        for rule in &self.rules {
            let value = input
                .get(rule.field())
                .ok_or_else(|| FormcastError::MissingField(rule.field().to_string()))?;
            rule.encode_into(value, &mut slots, &self.schema)?;
        }

        for field in input.keys() {
            if !self.references(field) {
                log::debug!("Ignoring field {} (not used by the schema)", field);
            }
        }

        EncodedVector::new(self.schema.clone(), slots)
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    /// Field names in rule order
    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(FieldRule::field)
    }

    pub fn references(&self, field: &str) -> bool {
        self.rules.iter().any(|r| r.field() == field)
    }
}
