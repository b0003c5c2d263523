//! System clipboard access for paste mode

use arboard::Clipboard;

use crate::error::{JenaiError, Result};

/// Text currently held by the system clipboard
pub fn read_clipboard() -> Result<String> {
    let mut clipboard = Clipboard::new().map_err(|e| JenaiError::Clipboard(e.to_string()))?;
    clipboard.get_text().map_err(|e| JenaiError::Clipboard(e.to_string()))
}
