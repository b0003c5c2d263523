//! CLI module for jenai - command-line flags and trailing words.

pub mod commands;

pub use commands::Cli;
