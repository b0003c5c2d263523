//! Prompt Library - Named template fragments grouped by category
//!
//! The library is deserialized once from YAML and never mutated afterwards.
//! Callers decide where the bytes come from (embedded asset or config file)
//! and pass the parsed value down.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{JenaiError, Result};

/// Default library shipped with the binary
const EMBEDDED_PROMPTS: &str = include_str!("../../assets/prompts.yaml");

/// The four fragment categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Prompt,
    Persona,
    Instruction,
    Section1,
}

impl Category {
    /// Name used in error messages and engine cache keys
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Prompt => "prompt",
            Category::Persona => "persona",
            Category::Instruction => "instruction",
            Category::Section1 => "section1",
        }
    }

    /// Text prepended to a fragment before it is evaluated
    pub fn header(self) -> &'static str {
        match self {
            Category::Persona => "# Persona\n\n",
            Category::Instruction => "# Instructions\n\n",
            Category::Prompt | Category::Section1 => "",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named template sources, one map per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub prompts: HashMap<String, String>,
    #[serde(default)]
    pub personas: HashMap<String, String>,
    #[serde(default)]
    pub instructions: HashMap<String, String>,
    #[serde(default)]
    pub section1: HashMap<String, String>,
}

impl Library {
    /// Parse a library from YAML bytes
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        serde_yaml::from_slice(data).map_err(JenaiError::LibraryLoad)
    }

    /// Parse a library from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_yaml(&data)
    }

    /// The library embedded at build time
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_PROMPTS.as_bytes())
    }

    /// Source of the named top-level prompt
    pub fn raw_prompt(&self, name: &str) -> Result<&str> {
        self.fragment(Category::Prompt, name)
    }

    /// Source of a fragment in the given category
    pub fn fragment(&self, category: Category, name: &str) -> Result<&str> {
        self.category(category)
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| JenaiError::UnknownFragment {
                category: category.as_str(),
                name: name.to_string(),
            })
    }

    /// Sorted names of the top-level prompts
    pub fn prompt_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prompts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn category(&self, category: Category) -> &HashMap<String, String> {
        match category {
            Category::Prompt => &self.prompts,
            Category::Persona => &self.personas,
            Category::Instruction => &self.instructions,
            Category::Section1 => &self.section1,
        }
    }
}
