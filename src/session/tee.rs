//! Tee export - Copy the latest answer of a session to a file
//!
//! The file starts with a YAML front matter describing how the prompt was
//! built, followed by the content of the last message.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;

use super::{Conversation, SessionMetadata};
use crate::error::{JenaiError, Result};
use crate::prompt::Prompt;

#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    date: String,
    model: &'a str,
    prompt: String,
    context: &'a [String],
}

/// Front matter plus the last message of `conversation`
pub fn render_tee(
    conversation: &Conversation,
    session_name: &str,
    model: &str,
    prompt: &Prompt,
    date: DateTime<Local>,
) -> Result<String> {
    let last = conversation
        .last_message()
        .ok_or_else(|| JenaiError::EmptyTranscript(session_name.to_string()))?;

    let front = FrontMatter {
        date: date.format("%Y-%m-%d %H:%M:%S").to_string(),
        model,
        prompt: prompt.static_text(),
        context: &prompt.paths,
    };

    let mut out = format!("---\n{}---\n\n{}", serde_yaml::to_string(&front)?, last.content);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

impl SessionMetadata {
    /// Write the session's latest answer to `path`, overwriting it
    pub fn tee(&self, path: &Path, model: &str, prompt: &Prompt) -> Result<()> {
        let conversation = self.load()?;
        let text = render_tee(&conversation, &self.name, model, prompt, Local::now())?;
        fs::write(path, text)?;
        info!("Wrote last answer of session {:?} to {}", self.name, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Message;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn conversation() -> Conversation {
        Conversation {
            model: "openrouter:google/gemini".to_string(),
            messages: vec![Message::user("question"), Message::assistant("first line\nsecond line")],
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            context: "# Additional context (files)\n\n...".to_string(),
            paths: vec!["src/main.rs".to_string(), "https://example.com/doc".to_string()],
            positional: "why".to_string(),
            primary: "Explain".to_string(),
            ..Default::default()
        }
    }

    fn date() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_render_front_matter_and_answer() {
        let text = render_tee(&conversation(), "chat", "gemini", &prompt(), date()).unwrap();

        assert!(text.starts_with("---\n"));
        assert!(text.ends_with("---\n\nfirst line\nsecond line\n"));
        assert!(!text.contains("Additional context"));

        let front = text.trim_start_matches("---\n").split("---\n").next().unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(front).unwrap();
        assert_eq!(value["date"].as_str(), Some("2025-06-02 09:30:00"));
        assert_eq!(value["model"].as_str(), Some("gemini"));
        assert_eq!(value["prompt"].as_str(), Some("why\n\nExplain"));
        assert_eq!(value["context"][0].as_str(), Some("src/main.rs"));
        assert_eq!(value["context"][1].as_str(), Some("https://example.com/doc"));
    }

    #[test]
    fn test_render_empty_transcript() {
        let empty = Conversation {
            model: "m".to_string(),
            messages: vec![],
        };
        let err = render_tee(&empty, "chat", "m", &prompt(), date()).unwrap_err();
        assert!(matches!(err, JenaiError::EmptyTranscript(ref name) if name == "chat"));
    }

    #[test]
    fn test_tee_overwrites_target() {
        let tmp = TempDir::new().unwrap();
        let meta = SessionMetadata {
            dir: tmp.path().to_path_buf(),
            name: "chat".to_string(),
            requested: true,
        };
        fs::write(meta.path(), serde_yaml::to_string(&conversation()).unwrap()).unwrap();

        let target = tmp.path().join("answer.md");
        fs::write(&target, "old content that must disappear").unwrap();

        meta.tee(&target, "gemini", &prompt()).unwrap();
        let written = fs::read_to_string(&target).unwrap();
        assert!(!written.contains("old content"));
        assert!(written.ends_with("first line\nsecond line\n"));
    }

    #[test]
    fn test_tee_missing_session() {
        let tmp = TempDir::new().unwrap();
        let meta = SessionMetadata {
            dir: tmp.path().to_path_buf(),
            name: "nothing".to_string(),
            requested: true,
        };
        let target = tmp.path().join("answer.md");
        assert!(matches!(meta.tee(&target, "m", &prompt()), Err(JenaiError::SessionNotFound(_))));
        assert!(!target.exists());
    }
}
