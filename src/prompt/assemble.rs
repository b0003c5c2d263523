//! Prompt assembly - Merge every prompt source under a fixed order

use std::fmt;

const SEPARATOR: &str = "\n\n";

/// The composed prompt, before it is handed to the chat client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    /// Content of the included paths
    pub context: String,
    /// Put the context above the rest instead of below
    pub context_above: bool,
    /// Content read from the clipboard
    pub clipboard: String,
    /// Identifiers of the included paths
    pub paths: Vec<String>,
    /// Leftover positional arguments, space-joined
    pub positional: String,
    /// Evaluated named prompt
    pub primary: String,
    /// Piped standard input
    pub stdin: String,
}

impl Prompt {
    /// True when nothing but (possibly) context is present
    pub fn is_empty(&self) -> bool {
        self.clipboard.is_empty() && self.positional.is_empty() && self.primary.is_empty() && self.stdin.is_empty()
    }

    /// Everything except the context
    pub fn static_text(&self) -> String {
        self.static_parts().join(SEPARATOR)
    }

    fn static_parts(&self) -> Vec<&str> {
        [&self.positional, &self.primary, &self.clipboard, &self.stdin]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect()
    }

    fn parts(&self) -> Vec<&str> {
        let mut parts = self.static_parts();
        if self.context.is_empty() {
            return parts;
        }
        if self.context_above {
            parts.insert(0, &self.context);
        } else {
            parts.push(&self.context);
        }
        parts
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts().join(SEPARATOR))
    }
}
