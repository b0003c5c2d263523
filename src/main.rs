use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use jenai::chat::{self, ChatClient, ChatRequest};
use jenai::clipboard;
use jenai::invocation::Invocation;
use jenai::vcs::Git;

mod cli;
mod config;

use cli::Cli;
use config::Config;

/// `<data_local_dir>/jenai/logs/jenai.log`, creating the directory
fn log_file_path() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(env!("CARGO_PKG_NAME"))
        .join("logs");
    fs::create_dir_all(&dir).wrap_err_with(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir.join(concat!(env!("CARGO_PKG_NAME"), ".log")))
}

fn setup_logging(level: &str) -> Result<()> {
    let path = log_file_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("Failed to open {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();

    info!("Logging to {} at level {}", path.display(), level);
    Ok(())
}

/// Piped input, unless stdin is a terminal or the REPL needs it
fn read_stdin(interactive: bool) -> Result<Option<String>> {
    let stdin = io::stdin();
    if interactive || stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf).context("Failed to read stdin")?;
    Ok(Some(buf))
}

fn list_prompts(config: &Config) -> Result<()> {
    let library = config.library()?;
    for name in library.prompt_names() {
        println!("{}", name);
    }
    Ok(())
}

fn list_models(config: &Config) -> Result<()> {
    let registry = config.registry()?;
    for (name, spec) in registry.iter() {
        println!("{:<12} {}", name.cyan(), spec);
    }
    Ok(())
}

fn run_application(mut inv: Invocation, config: &Config) -> Result<()> {
    info!("Starting application");

    if inv.list {
        return list_prompts(config);
    }
    if inv.list_models {
        return list_models(config);
    }

    let library = config.library()?;
    let registry = config.registry()?;
    let git = Git::new();

    let stdin = read_stdin(inv.interactive)?;
    let prompt = inv
        .build_prompt(&library, &git, clipboard::read_clipboard, stdin)
        .context("Failed to build prompt")?;

    if inv.dry_run {
        println!("{}", prompt);
        return Ok(());
    }

    let session = inv.session(&git).context("Failed to resolve session")?;
    let model = registry.resolve(&inv.model)?;
    info!("Using model {} in session {:?}", model, session.name);

    if prompt.is_empty() && inv.tee_file.is_some() {
        log::warn!("No prompt to answer, --tee is ignored");
    }

    let tee = || {
        let Some(path) = &inv.tee_file else {
            return;
        };
        if let Err(e) = session.tee(path, &model, &prompt) {
            log::warn!("Failed to write {}: {}", path.display(), e);
            eprintln!("{} {}", "Warning: could not write tee file:".yellow(), e);
        }
    };

    let client = ChatClient::new(config.chat_command.as_str());
    let request = ChatRequest {
        model: &model,
        session: &session,
    };
    chat::converse(&client, &request, &prompt, inv.interactive, tee).context("Chat failed")?;

    Ok(())
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the level is known
    setup_logging(config.log_level.as_deref().unwrap_or("info")).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    let inv = cli.invocation(&config.default_model);
    inv.validate()?;

    // Run the main application logic
    run_application(inv, &config)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red(), e);
        std::process::exit(1);
    }
}
