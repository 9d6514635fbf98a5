//! FG-015: Output routing — deliver a successful result's data to the
//! terminal, a file, or the host clipboard.

pub mod clipboard;

use crate::core::types::OutputTarget;
use clipboard::ClipboardTool;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("output target 'file' requires a path")]
    MissingPath,

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write to stdout: {0}")]
    Stdout(String),

    #[error("no clipboard utility found (tried: {})", .tried.join(", "))]
    NoClipboard { tried: Vec<String> },

    #[error("clipboard utility {tool} failed: {message}")]
    Clipboard { tool: String, message: String },
}

/// Target-specific options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Destination for [`OutputTarget::File`]
    pub path: Option<PathBuf>,
}

impl OutputOptions {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

/// Routes result data. Every target receives pretty-printed JSON.
pub struct OutputHandler {
    stdout: Arc<Mutex<dyn Write + Send>>,
    clipboard_tools: Vec<ClipboardTool>,
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self {
            stdout: Arc::new(Mutex::new(std::io::stdout())),
            clipboard_tools: clipboard::system_tools(),
        }
    }
}

impl OutputHandler {
    /// Send stdout-targeted output to `sink` instead of the terminal.
    pub fn with_stdout(mut self, sink: Arc<Mutex<dyn Write + Send>>) -> Self {
        self.stdout = sink;
        self
    }

    pub fn with_clipboard_tools(mut self, tools: Vec<ClipboardTool>) -> Self {
        self.clipboard_tools = tools;
        self
    }

    pub fn handle(
        &self,
        data: &serde_json::Value,
        target: OutputTarget,
        options: &OutputOptions,
    ) -> Result<(), OutputError> {
        let text = pretty(data);
        match target {
            OutputTarget::Stdout => {
                let mut out = self
                    .stdout
                    .lock()
                    .map_err(|_| OutputError::Stdout("sink lock poisoned".to_string()))?;
                writeln!(out, "{}", text)
                    .and_then(|()| out.flush())
                    .map_err(|e| OutputError::Stdout(e.to_string()))
            }
            OutputTarget::File => {
                let path = options.path.as_ref().ok_or(OutputError::MissingPath)?;
                write_file(path, &text)?;
                info!(path = %path.display(), "result written");
                Ok(())
            }
            OutputTarget::Clipboard => {
                clipboard::copy_with(&self.clipboard_tools, &text)?;
                info!("result copied to clipboard");
                Ok(())
            }
        }
    }
}

fn pretty(data: &serde_json::Value) -> String {
    // Serializing a Value cannot fail.
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}

fn write_file(path: &Path, text: &str) -> Result<(), OutputError> {
    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, format!("{}\n", text)).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn buffered() -> (OutputHandler, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let handler = OutputHandler::default().with_stdout(buf.clone());
        (handler, buf)
    }

    #[test]
    fn test_fg015_stdout_pretty_json() {
        let (handler, buf) = buffered();
        handler
            .handle(&json!({"a": 1}), OutputTarget::Stdout, &OutputOptions::default())
            .unwrap();
        let text = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_fg015_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/nested/out.json");
        let (handler, buf) = buffered();
        handler
            .handle(&json!([1, 2]), OutputTarget::File, &OutputOptions::file(&path))
            .unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!([1, 2]));
        assert!(buf.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fg015_file_without_path() {
        let err = OutputHandler::default()
            .handle(&json!({}), OutputTarget::File, &OutputOptions::default())
            .unwrap_err();
        assert!(matches!(err, OutputError::MissingPath));
    }

    #[test]
    fn test_fg015_file_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let err = OutputHandler::default()
            .handle(
                &json!({}),
                OutputTarget::File,
                &OutputOptions::file(blocker.join("out.json")),
            )
            .unwrap_err();
        assert!(matches!(err, OutputError::Write { .. }));
    }

    #[test]
    fn test_fg015_clipboard_unavailable() {
        let handler = OutputHandler::default()
            .with_clipboard_tools(vec![ClipboardTool::new("frago-no-such-clipboard-tool", &[])]);
        let err = handler
            .handle(&json!({}), OutputTarget::Clipboard, &OutputOptions::default())
            .unwrap_err();
        assert!(matches!(err, OutputError::NoClipboard { .. }));
    }
}
