//! CLI definition using clap.

use clap::Parser;
use std::path::PathBuf;

use jenai::context::ContextConfig;
use jenai::invocation::Invocation;

/// jenai - Compose a prompt and chat about it
#[derive(Parser, Debug)]
#[command(name = "jenai")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Put context files and dir above instructions
    #[arg(long)]
    pub context_above: bool,

    /// Include all files in directory as context
    #[arg(long = "dir", value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Print interpolated prompt without sending to LLM
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Include specific file(s) or URL(s) as context
    #[arg(long = "file", value_name = "FILE")]
    pub files: Vec<String>,

    /// Start an interactive chat session
    #[arg(short, long)]
    pub interactive: bool,

    /// List all available prompts
    #[arg(short, long)]
    pub list: bool,

    /// List all available models
    #[arg(long = "list-models", visible_alias = "lm")]
    pub list_models: bool,

    /// Print files with line numbers
    #[arg(long)]
    pub linum: bool,

    /// Model name (short name from --lm or provider:author/model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Use positional arguments as the prompt
    #[arg(short, long)]
    pub oneshot: bool,

    /// Use clipboard content as prompt
    #[arg(long)]
    pub paste: bool,

    /// Reuse or create specific session name (/last for most recent session)
    #[arg(long)]
    pub session: Option<String>,

    /// Output first answer to both stdout and FILE (overwritten)
    #[arg(long, value_name = "FILE")]
    pub tee: Option<PathBuf>,

    /// Prompt name followed by free-form words
    #[arg(value_name = "WORDS")]
    pub positional: Vec<String>,
}

impl Cli {
    /// Settings for this run; `default_model` applies when `--model` is absent
    pub fn invocation(&self, default_model: &str) -> Invocation {
        let mut inv = Invocation::default();
        inv.context = ContextConfig {
            files: self.files.clone(),
            dirs: self.dirs.clone(),
            above: self.context_above,
            line_numbers: self.linum,
        };
        inv.dry_run = self.dry_run;
        inv.interactive = self.interactive;
        inv.list = self.list;
        inv.list_models = self.list_models;
        inv.model = self.model.clone().unwrap_or_else(|| default_model.to_string());
        inv.oneshot = self.oneshot;
        inv.paste = self.paste;
        inv.session_name = self.session.clone();
        inv.tee_file = self.tee.clone();
        inv.with_positional(self.positional.clone())
    }
}
