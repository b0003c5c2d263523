use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use jenai::chat::DEFAULT_CHAT_COMMAND;
use jenai::models::ModelRegistry;
use jenai::prompt::Library;

/// File name looked up in the config directory and the working directory
const CONFIG_FILE: &str = concat!(env!("CARGO_PKG_NAME"), ".yml");

/// Model used when neither the CLI nor the config file name one
pub const DEFAULT_MODEL: &str = "qw3";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub log_level: Option<String>,
    pub default_model: String,
    pub chat_command: String,
    /// Prompt library replacing the embedded one
    pub prompts: Option<PathBuf>,
    /// Model registry replacing the embedded one
    pub models: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            default_model: DEFAULT_MODEL.to_string(),
            chat_command: DEFAULT_CHAT_COMMAND.to_string(),
            prompts: None,
            models: None,
        }
    }
}

impl Config {
    /// Load `path` when given, else the first readable candidate, else defaults.
    ///
    /// An explicit file that fails to load is an error; a broken candidate is
    /// skipped with a warning.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        for candidate in Self::candidates() {
            if !candidate.exists() {
                continue;
            }
            match Self::from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("Skipping {}: {:#}", candidate.display(), e),
            }
        }

        log::info!("No {} found, using defaults", CONFIG_FILE);
        Ok(Self::default())
    }

    /// `~/.config/jenai/jenai.yml`, then `./jenai.yml`
    fn candidates() -> Vec<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE))
            .into_iter()
            .chain([PathBuf::from(CONFIG_FILE)])
            .collect()
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let config = serde_yaml::from_str(&content).wrap_err_with(|| format!("Failed to parse {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Prompt library: explicit path, then `~/.config/jenai/prompts.yaml`, then embedded
    pub fn library(&self) -> Result<Library> {
        if let Some(path) = self.override_path(self.prompts.as_ref(), "prompts.yaml") {
            log::info!("Loading prompt library from {}", path.display());
            return Library::from_file(&path).context(format!("Failed to load prompts from {}", path.display()));
        }
        Library::embedded().context("Failed to load embedded prompts")
    }

    /// Model registry: explicit path, then `~/.config/jenai/models.yaml`, then embedded
    pub fn registry(&self) -> Result<ModelRegistry> {
        if let Some(path) = self.override_path(self.models.as_ref(), "models.yaml") {
            log::info!("Loading model registry from {}", path.display());
            return ModelRegistry::from_file(&path).context(format!("Failed to load models from {}", path.display()));
        }
        ModelRegistry::embedded().context("Failed to load embedded models")
    }

    fn override_path(&self, explicit: Option<&PathBuf>, file_name: &str) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(file_name))
            .filter(|path| path.exists())
    }
}
