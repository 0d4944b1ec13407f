//! Form-driven tabular prediction
//!
//! Turns structured form input into the exact feature vector a pre-trained
//! model was fit on, runs the model, and interprets its output.

pub mod features;
pub mod model;
pub mod predict;
pub mod profiles;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single raw value collected from a form control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric input (number field, slider)
    Number(f64),
    /// Single-select category
    Text(String),
    /// Multi-select categories
    Set(Vec<String>),
}

impl FieldValue {
    /// Build a multi-select value
    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Set(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::Set(_) => "selection set",
        }
    }

    /// Interpret as a number. Text is accepted when it parses cleanly.
    pub fn as_number(&self, field: &str) -> Result<f64> {
        let value = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse::<f64>().map_err(|_| FormcastError::InvalidValue {
                field: field.to_string(),
                message: format!("expected a number, got {:?}", s),
            })?,
            FieldValue::Set(_) => {
                return Err(FormcastError::InvalidValue {
                    field: field.to_string(),
                    message: format!("expected a number, got a {}", self.kind()),
                })
            }
        };
        if !value.is_finite() {
            return Err(FormcastError::InvalidValue {
                field: field.to_string(),
                message: format!("{} is not a finite number", value),
            });
        }
        Ok(value)
    }

    /// Interpret as a single selected category
    pub fn as_category(&self, field: &str) -> Result<Cow<'_, str>> {
        match self {
            FieldValue::Text(s) => Ok(Cow::Borrowed(s.as_str())),
            FieldValue::Number(n) => Ok(Cow::Owned(n.to_string())),
            FieldValue::Set(_) => Err(FormcastError::InvalidValue {
                field: field.to_string(),
                message: format!("expected a single selection, got a {}", self.kind()),
            }),
        }
    }

    /// Interpret as a multi-select. A lone text value counts as one selection.
    pub fn as_selection(&self, field: &str) -> Result<Vec<Cow<'_, str>>> {
        match self {
            FieldValue::Set(items) => Ok(items.iter().map(|s| Cow::Borrowed(s.as_str())).collect()),
            FieldValue::Text(s) if s.is_empty() => Ok(Vec::new()),
            FieldValue::Text(s) => Ok(vec![Cow::Borrowed(s.as_str())]),
            FieldValue::Number(_) => Err(FormcastError::InvalidValue {
                field: field.to_string(),
                message: format!("expected a selection, got a {}", self.kind()),
            }),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Set(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Raw form input: human-readable field name to collected value
pub type RawInput = BTreeMap<String, FieldValue>;

/// Build a [`RawInput`] from `(field, value)` pairs
pub fn raw_input<I, K, V>(pairs: I) -> RawInput
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Parse a `field=value` assignment as typed on the command line.
///
/// An empty value is an empty selection, a comma-separated value is a
/// multi-select, anything that parses as a number is numeric, the rest is text.
pub fn parse_assignment(assignment: &str) -> Result<(String, FieldValue)> {
    let (field, value) = assignment
        .split_once('=')
        .ok_or_else(|| FormcastError::Parse(format!("expected field=value, got {:?}", assignment)))?;

    let field = field.trim();
    if field.is_empty() {
        return Err(FormcastError::Parse(format!("missing field name in {:?}", assignment)));
    }

    let value = value.trim();
    let parsed = if value.is_empty() {
        FieldValue::Set(Vec::new())
    } else if value.contains(',') {
        FieldValue::set(value.split(',').map(str::trim).filter(|s| !s.is_empty()))
    } else if let Ok(n) = value.parse::<f64>() {
        FieldValue::Number(n)
    } else {
        FieldValue::Text(value.to_string())
    };

    Ok((field.to_string(), parsed))
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FormcastError {
    #[error("Failed to load artifact {}: {message}", .path.display())]
    ArtifactLoad { path: PathBuf, message: String },

    #[error("Schema mismatch (expected {expected} columns, found {found}): {detail}")]
    SchemaMismatch {
        expected: usize,
        found: usize,
        detail: String,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown category {value:?} for field {field}")]
    UnknownCategory { field: String, value: String },

    #[error("Invalid value for field {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FormcastError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory holding one artifact directory per built-in profile
    pub artifact_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub currency_symbol: String,
    pub probability_precision: usize,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                artifact_dir: "artifacts".to_string(),
            },
            output: OutputConfig {
                currency_symbol: "$".to_string(),
                probability_precision: 2,
                format: "table".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FormcastError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| FormcastError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FormcastError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
