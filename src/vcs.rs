//! Version-control queries used by templates and session resolution.

use std::path::PathBuf;
use std::process::Command;

use log::debug;

use crate::error::{JenaiError, Result};

/// Runs version-control queries and returns their standard output.
pub trait Vcs {
    /// Run the version-control tool with the given arguments.
    fn run(&self, args: &[String]) -> Result<String>;

    /// Top of the enclosing working tree, if there is one.
    fn toplevel(&self) -> Option<PathBuf> {
        let args = ["rev-parse".to_string(), "--show-toplevel".to_string()];
        let out = self.run(&args).ok()?;
        let root = out.trim();
        if root.is_empty() { None } else { Some(PathBuf::from(root)) }
    }
}

/// The `git` binary found on PATH.
#[derive(Debug, Clone, Default)]
pub struct Git {
    dir: Option<PathBuf>,
}

impl Git {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every query from `dir` instead of the process working directory.
    #[cfg(test)]
    fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }
}

impl Vcs for Git {
    fn run(&self, args: &[String]) -> Result<String> {
        debug!("git {:?}", args);
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| JenaiError::Command {
            command: format!("git {:?}", args),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(JenaiError::Command {
                command: format!("git {:?}", args),
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
