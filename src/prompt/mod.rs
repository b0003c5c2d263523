//! Prompt System - Fragment library, template evaluation and assembly
//!
//! Fragments live in a [`Library`], are evaluated by an [`EvalContext`] and
//! the result is merged with the other prompt sources into a [`Prompt`].

mod assemble;
mod eval;
mod library;
mod template;

pub use assemble::Prompt;
pub use eval::{EvalContext, Value, flatten};
pub use library::{Category, Library};
pub use template::{Builtin, Template};
