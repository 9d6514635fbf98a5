//! FG-012: Shell recipes — the script is executed directly.
//!
//! The executable bit is required; a non-executable script is a permission
//! failure, never retried through `sh`.

use super::{process, ExecContext, ExecError, ExecOutput};
use std::path::Path;
use std::process::Command;

/// True if `path` is a regular file with any execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    /// Run `script` with the parameter object as its single JSON argument.
    pub fn execute(
        &self,
        script: &Path,
        params: &serde_json::Value,
        ctx: &ExecContext,
    ) -> Result<ExecOutput, ExecError> {
        if !is_executable(script) {
            return Err(ExecError::Permission {
                path: script.to_path_buf(),
            });
        }

        let mut cmd = Command::new(script);
        cmd.arg(params.to_string());
        ctx.apply(&mut cmd);

        process::run(cmd, None, ctx.limits).map_err(|e| match e {
            ExecError::Spawn { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                ExecError::Permission {
                    path: script.to_path_buf(),
                }
            }
            other => other,
        })
    }
}
