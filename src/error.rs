//! Error types for jenai
//!
//! Centralized error handling using thiserror. Every message names the
//! operation that failed and the offending identifier.

use std::path::PathBuf;

use thiserror::Error;

/// All error types that can occur while composing prompts and handling sessions
#[derive(Debug, Error)]
pub enum JenaiError {
    /// Prompt library could not be deserialized
    #[error("failed to load prompt library from YAML: {0}")]
    LibraryLoad(#[source] serde_yaml::Error),

    /// Model registry could not be deserialized
    #[error("failed to load model registry from YAML: {0}")]
    ModelsLoad(#[source] serde_yaml::Error),

    /// Named fragment is missing from its category
    #[error("unknown {category}: {name}")]
    UnknownFragment { category: &'static str, name: String },

    /// Model short name is not registered
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Incoherent combination of flags or missing input
    #[error("{0}")]
    InvalidInvocation(String),

    /// Template could not be parsed or executed
    #[error("template: {name}: {message}")]
    Template { name: String, message: String },

    /// A builtin received a value it cannot turn into strings
    #[error("cannot flatten {0} to strings")]
    Flatten(&'static str),

    /// A builtin was called with the wrong arguments
    #[error("{function}: {message}")]
    Argument { function: &'static str, message: String },

    /// The positional cursor is already exhausted
    #[error("no positional arguments")]
    NoPositionalArguments,

    /// A fragment references itself, directly or through others
    #[error("recursive reference to {category} {name:?}")]
    RecursiveFragment { category: &'static str, name: String },

    /// External command missing or exited with a failure
    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    /// Clipboard could not be read
    #[error("failed to get clipboard content: {0}")]
    Clipboard(String),

    /// Local context source could not be read
    #[error("failed to build file context: error reading content from {path}: {source}")]
    ReadSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote context source could not be fetched
    #[error("failed to build file context: failed to download URL {url}: {reason}")]
    Download { url: String, reason: String },

    /// Directory traversal failed
    #[error("failed to build file context: failed to walk {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },

    /// Session directory could not be read or created
    #[error("session directory {path}: {source}")]
    SessionDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No session file matched the request
    #[error("no session found at {0}")]
    SessionNotFound(PathBuf),

    /// Session transcript exists but is not valid YAML
    #[error("failed to load session {path} from YAML: {source}")]
    MalformedSession {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Transcript has no message to export
    #[error("session {0} has no messages")]
    EmptyTranscript(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for jenai operations
pub type Result<T> = std::result::Result<T, JenaiError>;
