//! Model profiles
//!
//! A profile ties one trained model to its form fields, feature schema,
//! artifacts and result labels. The built-in profiles cover the shipped
//! models; custom ones are read from TOML.

pub mod credit_risk;
pub mod insurance;
pub mod loan_acceptance;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::features::{FeatureEncoder, FeatureSchema, FieldRule};
use crate::model::Task;
use crate::{Config, FormcastError, Result};

/// Artifact file names, relative to the profile's base directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<PathBuf>,
}

/// Display text for the two classes of a binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeLabels {
    pub negative: String,
    pub positive: String,
}

impl Default for OutcomeLabels {
    fn default() -> Self {
        OutcomeLabels {
            negative: "Negative".to_string(),
            positive: "Positive".to_string(),
        }
    }
}

/// A group of fields filled in together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormPage {
    pub title: String,
    pub fields: Vec<String>,
}

/// Everything needed to serve one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub title: String,
    pub task: Task,
    pub schema: FeatureSchema,
    pub artifacts: ArtifactPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<OutcomeLabels>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<FormPage>,
    pub fields: Vec<FieldRule>,
}

impl Profile {
    /// Read a custom profile from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FormcastError::Config(format!("Failed to read profile {}: {}", path.display(), e))
        })?;
        let profile: Profile = toml::from_str(&content).map_err(|e| {
            FormcastError::Config(format!("Failed to parse profile {}: {}", path.display(), e))
        })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check the profile is internally consistent
    pub fn validate(&self) -> Result<()> {
        let encoder = self.encoder()?;

        let mut paged = HashSet::new();
        for page in &self.pages {
            for field in &page.fields {
                if !encoder.references(field) {
                    return Err(FormcastError::Config(format!(
                        "page {:?} lists unknown field {}",
                        page.title, field
                    )));
                }
                if !paged.insert(field.as_str()) {
                    return Err(FormcastError::Config(format!(
                        "field {} appears on more than one page",
                        field
                    )));
                }
            }
        }

        if self.task == Task::Regression && self.artifacts.threshold.is_some() {
            return Err(FormcastError::Config(format!(
                "profile {} is a regression but declares a threshold",
                self.name
            )));
        }
        Ok(())
    }

    /// Bind the field rules to the schema
    pub fn encoder(&self) -> Result<FeatureEncoder> {
        FeatureEncoder::new(self.fields.clone(), self.schema.clone())
    }

    pub fn labels(&self) -> OutcomeLabels {
        self.labels.clone().unwrap_or_default()
    }

    /// Render as TOML, the format custom profiles are written in
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FormcastError::Config(format!("Failed to serialize profile: {}", e)))
    }
}

/// Names of the built-in profiles
pub fn builtin_names() -> &'static [&'static str] {
    &[
        insurance::NAME,
        credit_risk::TREE_NAME,
        credit_risk::FOREST_NAME,
        loan_acceptance::NAME,
    ]
}

/// Look up a built-in profile by name
pub fn builtin(name: &str) -> Result<Profile> {
    match name {
        insurance::NAME => insurance::profile(),
        credit_risk::TREE_NAME => credit_risk::tree_profile(),
        credit_risk::FOREST_NAME => credit_risk::forest_profile(),
        loan_acceptance::NAME => loan_acceptance::profile(),
        _ => Err(FormcastError::UnknownProfile(name.to_string())),
    }
}

/// Resolve a built-in name or a TOML path to a profile plus the directory its
/// artifact paths are relative to
pub fn resolve(selector: &str, config: &Config) -> Result<(Profile, PathBuf)> {
    if builtin_names().contains(&selector) {
        let profile = builtin(selector)?;
        let base = Path::new(&config.data.artifact_dir).join(&profile.name);
        return Ok((profile, base));
    }

    let path = Path::new(selector);
    if path.extension().is_some_and(|ext| ext == "toml") || path.is_file() {
        let profile = Profile::load(path)?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return Ok((profile, base));
    }

    Err(FormcastError::UnknownProfile(selector.to_string()))
}
