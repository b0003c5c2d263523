//! Invocation - The validated settings of one run
//!
//! Turns flags and trailing words into a [`Prompt`] and a
//! [`SessionMetadata`], in that order.

use std::path::PathBuf;

use log::debug;

use crate::context::ContextConfig;
use crate::error::{JenaiError, Result};
use crate::prompt::{EvalContext, Library, Prompt};
use crate::session::{SessionMetadata, SessionRequest};
use crate::vcs::Vcs;

#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub context: ContextConfig,
    pub dry_run: bool,
    pub interactive: bool,
    pub list: bool,
    pub list_models: bool,
    pub model: String,
    pub oneshot: bool,
    pub paste: bool,
    /// Words left after the prompt name, possibly claimed by the prompt
    pub positional: Vec<String>,
    pub prompt_name: Option<String>,
    pub session_name: Option<String>,
    pub tee_file: Option<PathBuf>,

    raw_positional: Vec<String>,
    session: Option<SessionMetadata>,
}

impl Invocation {
    /// Store the trailing words; in prompt mode the first one names the prompt.
    ///
    /// Call after the mode flags are set.
    pub fn with_positional(mut self, words: Vec<String>) -> Self {
        self.raw_positional = words.clone();
        self.positional = words;
        if self.prompt_mode() && !self.positional.is_empty() {
            self.prompt_name = Some(self.positional.remove(0));
        }
        self
    }

    /// Neither paste nor one-shot
    pub fn prompt_mode(&self) -> bool {
        !self.oneshot && !self.paste
    }

    /// Reject incoherent flag combinations
    pub fn validate(&self) -> Result<()> {
        if self.list || self.list_models {
            return Ok(());
        }
        if self.paste && self.oneshot {
            return Err(JenaiError::InvalidInvocation(
                "--paste and --oneshot are mutually exclusive".to_string(),
            ));
        }
        if !self.paste && self.raw_positional.is_empty() && self.session_name.is_none() {
            return Err(JenaiError::InvalidInvocation("no positional arguments provided".to_string()));
        }
        Ok(())
    }

    /// Compose the prompt from every configured source.
    ///
    /// The clipboard is only read in paste mode, where it stands in for the
    /// named prompt. Positional words claimed by the evaluated prompt are not
    /// repeated.
    pub fn build_prompt<F>(&mut self, library: &Library, vcs: &dyn Vcs, read_clipboard: F, stdin: Option<String>) -> Result<Prompt>
    where
        F: FnOnce() -> Result<String>,
    {
        let clipboard = if self.paste { read_clipboard()? } else { String::new() };
        let primary = match &self.prompt_name {
            Some(name) => EvalContext::new(library, &mut self.positional, vcs).evaluate(name)?,
            None => String::new(),
        };

        let (context, paths) = if self.context.is_empty() {
            (String::new(), Vec::new())
        } else {
            let built = self.context.build()?;
            (built.text, built.sources)
        };
        debug!("Prompt uses {} context source(s)", paths.len());

        Ok(Prompt {
            context,
            context_above: self.context.above,
            clipboard,
            paths,
            positional: self.positional.join(" "),
            primary,
            stdin: stdin.unwrap_or_default(),
        })
    }

    /// Session for this run, resolved on first use
    pub fn session(&mut self, vcs: &dyn Vcs) -> Result<SessionMetadata> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        let request = SessionRequest::from_flag(self.session_name.as_deref());
        let session = SessionMetadata::resolve(&request, vcs)?;
        self.session = Some(session.clone());
        Ok(session)
    }
}
