//! Chat sessions - Resolve, create and read back session transcripts
//!
//! Sessions live under `<repo root>/.jenai/session/<name>.yaml`. The chat
//! client owns and writes those files; this module only picks names and
//! reads them back.

mod tee;
mod transcript;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use log::{debug, info};

use crate::error::{JenaiError, Result};
use crate::vcs::Vcs;

pub use tee::render_tee;
pub use transcript::{Conversation, Message, Role};

/// Sentinel selecting the most recently modified session
pub const LAST_SESSION: &str = "/last";

/// Extension of session files
pub const SESSION_SUFFIX: &str = ".yaml";

/// Timestamp format of minted session names
const NAME_FORMAT: &str = "%Y-%m-%d_%Hh%M";

/// How the session was asked for on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    /// Mint a fresh timestamped name
    Unnamed,
    /// Use this exact name
    Named(String),
    /// Reuse the newest session
    Last,
}

impl SessionRequest {
    pub fn from_flag(name: Option<&str>) -> Self {
        match name {
            None | Some("") => SessionRequest::Unnamed,
            Some(LAST_SESSION) => SessionRequest::Last,
            Some(name) => SessionRequest::Named(name.to_string()),
        }
    }
}

/// Where a session lives and whether the user picked it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub dir: PathBuf,
    pub name: String,
    /// True when the session was explicitly requested
    pub requested: bool,
}

impl SessionMetadata {
    /// Resolve the request inside the default session directory
    pub fn resolve(request: &SessionRequest, vcs: &dyn Vcs) -> Result<Self> {
        Self::resolve_in(session_dir(vcs), request, Local::now())
    }

    /// Resolve the request inside `dir`, creating the directory.
    ///
    /// `now` seeds the name of unnamed sessions.
    pub fn resolve_in(dir: PathBuf, request: &SessionRequest, now: DateTime<Local>) -> Result<Self> {
        let (name, requested) = match request {
            SessionRequest::Unnamed => {
                let base = now.format(NAME_FORMAT).to_string();
                (unique_file_prefix(&dir, &base, SESSION_SUFFIX), false)
            }
            SessionRequest::Named(name) => (name.clone(), true),
            SessionRequest::Last => (most_recent_session(&dir)?, true),
        };

        fs::create_dir_all(&dir).map_err(|source| JenaiError::SessionDir {
            path: dir.clone(),
            source,
        })?;

        info!("Using session {:?} in {} (requested: {})", name, dir.display(), requested);
        Ok(Self { dir, name, requested })
    }

    /// Path of the transcript file
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}{}", self.name, SESSION_SUFFIX))
    }

    /// Read the transcript without touching it
    pub fn load(&self) -> Result<Conversation> {
        let path = self.path();
        let data = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => JenaiError::SessionNotFound(path.clone()),
            _ => JenaiError::Io(e),
        })?;
        serde_yaml::from_str(&data).map_err(|source| JenaiError::MalformedSession { path, source })
    }
}

/// `<toplevel or .>/.jenai/session`
pub fn session_dir(vcs: &dyn Vcs) -> PathBuf {
    let root = vcs.toplevel().unwrap_or_else(|| PathBuf::from("."));
    root.join(".jenai").join("session")
}

/// First of `prefix`, `prefix.1`, `prefix.2`, … with no file in `dir`
pub fn unique_file_prefix(dir: &Path, prefix: &str, suffix: &str) -> String {
    let mut unique = prefix.to_string();
    let mut counter = 1;
    while dir.join(format!("{}{}", unique, suffix)).exists() {
        unique = format!("{}.{}", prefix, counter);
        counter += 1;
    }
    unique
}

/// Name of the newest session file in `dir`; equal times go to the greatest name
pub fn most_recent_session(dir: &Path) -> Result<String> {
    let dir_error = |source| JenaiError::SessionDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut newest: Option<(SystemTime, String)> = None;
    for entry in fs::read_dir(dir).map_err(dir_error)? {
        let entry = entry.map_err(dir_error)?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(name) = file_name.strip_suffix(SESSION_SUFFIX) else {
            continue;
        };

        let metadata = entry.metadata().map_err(dir_error)?;
        if metadata.is_dir() {
            continue;
        }
        let candidate = (metadata.modified().map_err(dir_error)?, name.to_string());
        debug!("Session candidate {:?}", candidate);
        if newest.as_ref().is_none_or(|current| candidate > *current) {
            newest = Some(candidate);
        }
    }

    newest
        .map(|(_, name)| name)
        .ok_or_else(|| JenaiError::SessionNotFound(dir.to_path_buf()))
}
