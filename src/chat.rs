//! Chat client - Hand the composed prompt to the external chat program
//!
//! The client streams its answer straight to the terminal and saves the
//! transcript in the session directory, where [`crate::session`] reads it.

use std::process::Command;

use log::{debug, info};

use crate::error::{JenaiError, Result};
use crate::prompt::Prompt;
use crate::session::SessionMetadata;

/// Program used when the config does not name one
pub const DEFAULT_CHAT_COMMAND: &str = "aichat";

/// Environment variable pointing the client at the session directory
const SESSIONS_DIR_ENV: &str = "AICHAT_SESSIONS_DIR";

/// Where and with which model the chat client talks
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    /// Full model identifier (`provider:author/model`)
    pub model: &'a str,
    pub session: &'a SessionMetadata,
}

/// The two ways of talking to a chat program
pub trait ChatBackend {
    /// Send one message and return once its answer is saved in the session
    fn send(&self, request: &ChatRequest<'_>, prompt: &str) -> Result<()>;

    /// Hand the terminal over to the REPL, attaching `files` as context
    fn repl(&self, request: &ChatRequest<'_>, files: &[String]) -> Result<()>;
}

/// Drive one run of the chat program.
///
/// A prompt with text is sent on its own first and `after_first` runs once
/// that answer is saved; the REPL follows only when `interactive`. A prompt
/// with nothing but context opens the REPL directly, with the context
/// sources attached instead of sent.
pub fn converse<B, F>(backend: &B, request: &ChatRequest<'_>, prompt: &Prompt, interactive: bool, after_first: F) -> Result<()>
where
    B: ChatBackend + ?Sized,
    F: FnOnce(),
{
    if prompt.is_empty() {
        info!(
            "Opening session {:?} with {} context source(s)",
            request.session.name,
            prompt.paths.len()
        );
        return backend.repl(request, &prompt.paths);
    }

    backend.send(request, &prompt.to_string())?;
    after_first();
    if interactive {
        backend.repl(request, &[])?;
    }
    Ok(())
}

/// Runs the external chat program
#[derive(Debug, Clone)]
pub struct ChatClient {
    program: String,
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_COMMAND)
    }
}

impl ChatClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self, request: &ChatRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env(SESSIONS_DIR_ENV, &request.session.dir)
            .args(["--model", request.model])
            .args(["--session", request.session.name.as_str()])
            .arg("--save-session");
        cmd
    }

    fn send_command(&self, request: &ChatRequest<'_>, prompt: &str) -> Command {
        let mut cmd = self.command(request);
        cmd.arg("--").arg(prompt);
        cmd
    }

    fn repl_command(&self, request: &ChatRequest<'_>, files: &[String]) -> Command {
        let mut cmd = self.command(request);
        for file in files {
            cmd.arg("-f").arg(file);
        }
        cmd
    }

    fn execute(&self, mut cmd: Command) -> Result<()> {
        debug!("Running {:?}", cmd);
        let status = cmd.status().map_err(|e| JenaiError::Command {
            command: self.program.clone(),
            message: e.to_string(),
        })?;

        if !status.success() {
            return Err(JenaiError::Command {
                command: self.program.clone(),
                message: status.to_string(),
            });
        }
        Ok(())
    }
}

impl ChatBackend for ChatClient {
    fn send(&self, request: &ChatRequest<'_>, prompt: &str) -> Result<()> {
        info!("Sending prompt to {} ({} bytes)", self.program, prompt.len());
        self.execute(self.send_command(request, prompt))
    }

    fn repl(&self, request: &ChatRequest<'_>, files: &[String]) -> Result<()> {
        info!("Starting interactive session {:?}", request.session.name);
        self.execute(self.repl_command(request, files))
    }
}
