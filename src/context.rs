//! File context - Inline files, directories and URLs into the prompt
//!
//! Each source is wrapped in START/END delimiters so the model can tell
//! where one file stops and the next begins. The build is all-or-nothing.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use log::debug;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{JenaiError, Result};

/// Header that always opens a built context
pub const CONTEXT_HEADER: &str = "# Additional context (files)";

/// Which sources to include and how to render them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Local files or http(s) URLs, in order
    pub files: Vec<String>,
    /// Directories walked recursively after the files
    pub dirs: Vec<PathBuf>,
    /// Put the context above the prompt
    pub above: bool,
    /// Prefix every line with its 1-based number
    pub line_numbers: bool,
}

/// Rendered context and the identifiers of what went into it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltContext {
    pub text: String,
    pub sources: Vec<String>,
}

impl ContextConfig {
    /// No file or directory configured
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Every source identifier: files first, then directory contents.
    pub fn sources(&self) -> Result<Vec<String>> {
        let mut sources = self.files.clone();
        for dir in &self.dirs {
            for entry in WalkDir::new(dir).sort_by_file_name() {
                let entry = entry.map_err(|source| JenaiError::Walk {
                    path: source.path().unwrap_or(dir.as_path()).display().to_string(),
                    source,
                })?;
                if entry.file_type().is_dir() {
                    continue;
                }
                sources.push(entry.path().display().to_string());
            }
        }
        Ok(sources)
    }

    /// Render every source.
    ///
    /// The header is written even when no source is configured; check
    /// [`ContextConfig::is_empty`] first when that matters.
    pub fn build(&self) -> Result<BuiltContext> {
        let sources = self.sources()?;
        let mut text = String::from(CONTEXT_HEADER);
        for source in &sources {
            let content = read_source(source)?;
            append_source(&mut text, source, &content, self.line_numbers);
        }
        Ok(BuiltContext { text, sources })
    }
}

fn append_source(buf: &mut String, id: &str, content: &str, line_numbers: bool) {
    buf.push_str("\n\n====> START OF ");
    buf.push_str(id);
    buf.push_str(" <====\n\n");

    if line_numbers {
        for (i, line) in content.lines().enumerate() {
            // Writing to a String cannot fail
            let _ = writeln!(buf, "{}: {}", i + 1, line);
        }
    } else {
        buf.push_str(content);
    }

    buf.push_str("\n\n====> END OF ");
    buf.push_str(id);
    buf.push_str(" <====");
}

/// Local path or http(s) URL content
fn read_source(source: &str) -> Result<String> {
    match as_url(source) {
        Some(url) => download(url, source),
        None => {
            debug!("Reading context file {}", source);
            let bytes = fs::read(source).map_err(|e| JenaiError::ReadSource {
                path: source.to_string(),
                source: e,
            })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn as_url(source: &str) -> Option<Url> {
    let url = Url::parse(source).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    (web && url.host_str().is_some_and(|h| !h.is_empty())).then_some(url)
}

fn download(url: Url, source: &str) -> Result<String> {
    debug!("Downloading context from {}", source);
    let failure = |reason: String| JenaiError::Download {
        url: source.to_string(),
        reason,
    };

    let response = reqwest::blocking::get(url).map_err(|e| failure(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(failure(format!("status code {}", status.as_u16())));
    }
    response.text().map_err(|e| failure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_empty_config_yields_header_only() {
        let config = ContextConfig::default();
        assert!(config.is_empty());
        let built = config.build().unwrap();
        assert_eq!(built.text, "# Additional context (files)");
        assert!(built.sources.is_empty());
    }

    #[test]
    fn test_files_in_order() {
        let dir = TempDir::new().unwrap();
        let f1 = write(dir.path(), "f1", "a");
        let f2 = write(dir.path(), "f2", "b");
        let config = ContextConfig {
            files: vec![f1.clone(), f2.clone()],
            ..Default::default()
        };

        let built = config.build().unwrap();
        let expected = format!(
            "# Additional context (files)\n\n====> START OF {f1} <====\n\na\n\n====> END OF {f1} <====\
             \n\n====> START OF {f2} <====\n\nb\n\n====> END OF {f2} <===="
        );
        assert_eq!(built.text, expected);
        assert_eq!(built.sources, vec![f1, f2]);
    }

    #[test]
    fn test_line_numbers() {
        let dir = TempDir::new().unwrap();
        let f = write(dir.path(), "three.txt", "one\ntwo\nthree\n");
        let config = ContextConfig {
            files: vec![f.clone()],
            line_numbers: true,
            ..Default::default()
        };

        let built = config.build().unwrap();
        assert!(built.text.contains(&format!(
            "====> START OF {f} <====\n\n1: one\n2: two\n3: three\n\n\n====> END OF {f} <===="
        )));
    }

    #[test]
    fn test_directories_walked_after_files_sorted() {
        let dir = TempDir::new().unwrap();
        let explicit = write(dir.path(), "explicit.md", "first");
        let tree = dir.path().join("tree");
        let b = write(&tree, "b.txt", "B");
        let a = write(&tree, "a.txt", "A");
        let nested = write(&tree, "sub/c.txt", "C");

        let config = ContextConfig {
            files: vec![explicit.clone()],
            dirs: vec![tree],
            ..Default::default()
        };

        let built = config.build().unwrap();
        assert_eq!(built.sources, vec![explicit, a, b, nested]);
        let pos = |s: &str| built.text.find(s).unwrap();
        assert!(pos("first") < pos("\nA\n"));
        assert!(pos("\nA\n") < pos("\nB\n"));
        assert!(pos("\nB\n") < pos("\nC\n"));
    }

    #[test]
    fn test_missing_file_aborts_build() {
        let dir = TempDir::new().unwrap();
        let good = write(dir.path(), "good", "fine");
        let missing = dir.path().join("missing").display().to_string();
        let config = ContextConfig {
            files: vec![good, missing.clone()],
            ..Default::default()
        };

        let err = config.build().unwrap_err();
        assert!(matches!(err, JenaiError::ReadSource { ref path, .. } if *path == missing));
        assert!(err.to_string().starts_with("failed to build file context:"));
    }

    #[test]
    fn test_binary_file_in_directory_is_included() {
        let dir = TempDir::new().unwrap();
        let text = write(dir.path(), "a.txt", "hello");
        let binary = dir.path().join("b.bin");
        fs::write(&binary, [0xff, 0xfe, b'x']).unwrap();

        let config = ContextConfig {
            dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };

        let built = config.build().unwrap();
        assert_eq!(built.sources, vec![text, binary.display().to_string()]);
        assert!(built.text.contains("\n\nhello\n\n"));
        assert!(built.text.contains("\u{fffd}\u{fffd}x"));
    }

    #[test]
    fn test_missing_directory_aborts_build() {
        let dir = TempDir::new().unwrap();
        let config = ContextConfig {
            dirs: vec![dir.path().join("nope")],
            ..Default::default()
        };

        let err = config.build().unwrap_err();
        assert!(matches!(err, JenaiError::Walk { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_url_detection() {
        assert!(as_url("https://example.com/file.rs").is_some());
        assert!(as_url("http://localhost:8080/x").is_some());
        assert!(as_url("ftp://example.com/file").is_none());
        assert!(as_url("src/main.rs").is_none());
        assert!(as_url("/abs/path").is_none());
        assert!(as_url("c:/windows/path").is_none());
    }

    #[test]
    fn test_url_source() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/notes.txt")
            .with_status(200)
            .with_body("remote notes")
            .create();

        let url = format!("{}/notes.txt", server.url());
        let config = ContextConfig {
            files: vec![url.clone()],
            ..Default::default()
        };

        let built = config.build().unwrap();
        mock.assert();
        assert!(built.text.contains(&format!("====> START OF {url} <====\n\nremote notes\n\n====> END OF {url} <====")));
    }

    #[test]
    fn test_url_failure_status() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/gone").with_status(404).create();

        let url = format!("{}/gone", server.url());
        let config = ContextConfig {
            files: vec![url.clone()],
            ..Default::default()
        };

        let err = config.build().unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("failed to build file context: failed to download URL {url}: status code 404")
        );
    }
}
