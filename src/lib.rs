//! jenai - Prompt composition for command-line chat sessions
//!
//! jenai assembles one prompt from named template fragments, file and URL
//! context, the clipboard, piped stdin and trailing words, then keeps the
//! resulting conversation in a session that later runs can continue.

pub mod chat;
pub mod clipboard;
pub mod context;
pub mod error;
pub mod invocation;
pub mod models;
pub mod prompt;
pub mod session;
pub mod vcs;

pub use error::{JenaiError, Result};
