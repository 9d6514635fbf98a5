//! FG-015: Host clipboard via the first available copy utility on `PATH`.

use super::OutputError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// A clipboard utility that reads the text to copy on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardTool {
    pub program: String,
    pub args: Vec<String>,
}

impl ClipboardTool {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Candidates in preference order.
pub fn system_tools() -> Vec<ClipboardTool> {
    vec![
        ClipboardTool::new("pbcopy", &[]),
        ClipboardTool::new("wl-copy", &[]),
        ClipboardTool::new("xclip", &["-selection", "clipboard"]),
        ClipboardTool::new("xsel", &["--clipboard", "--input"]),
        ClipboardTool::new("clip.exe", &[]),
    ]
}

/// Resolve `program` against `PATH` (or use it as-is when it has a slash).
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

/// Copy `text` with the first tool in `tools` that is installed.
pub fn copy_with(tools: &[ClipboardTool], text: &str) -> Result<(), OutputError> {
    let Some((tool, path)) = tools
        .iter()
        .find_map(|t| find_program(&t.program).map(|p| (t, p)))
    else {
        return Err(OutputError::NoClipboard {
            tried: tools.iter().map(|t| t.program.clone()).collect(),
        });
    };
    debug!(tool = %tool.program, "copying to clipboard");

    let clipboard_err = |message: String| OutputError::Clipboard {
        tool: tool.program.clone(),
        message,
    };

    let mut child = Command::new(&path)
        .args(&tool.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| clipboard_err(e.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| clipboard_err(format!("stdin write error: {}", e)))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| clipboard_err(e.to_string()))?;
    if !output.status.success() {
        return Err(clipboard_err(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}
