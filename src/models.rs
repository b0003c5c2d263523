//! Model registry - Short model names understood on the command line

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{JenaiError, Result};

const EMBEDDED_MODELS: &str = include_str!("../assets/models.yaml");

/// Where a model is served from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Provider of the model, e.g. "openrouter"
    pub provider: String,
    /// Author of the model, e.g. "mistralai"
    pub author: String,
    /// Model identifier, e.g. "codestral-2508"
    pub model: String,
}

impl fmt::Display for ModelSpec {
    /// Format expected by the chat client's `--model` flag
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.provider, self.author, self.model)
    }
}

/// Short name to model mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        serde_yaml::from_slice(data).map_err(JenaiError::ModelsLoad)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_yaml(&data)
    }

    /// The registry embedded at build time
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_MODELS.as_bytes())
    }

    /// Chat-client identifier for `name`.
    ///
    /// Names that already look like `provider:author/model` pass through.
    pub fn resolve(&self, name: &str) -> Result<String> {
        if name.contains(':') {
            return Ok(name.to_string());
        }
        self.models
            .get(name)
            .map(ToString::to_string)
            .ok_or_else(|| JenaiError::UnknownModel(name.to_string()))
    }

    /// Sorted short names with their full identifiers
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelSpec)> {
        self.models.iter().map(|(name, spec)| (name.as_str(), spec))
    }
}
