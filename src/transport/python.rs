//! FG-011: Python recipes — `<interpreter> <script> '<json params>'`.

use super::{process, ExecContext, ExecError, ExecOutput};
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct PythonExecutor {
    interpreter: String,
}

impl PythonExecutor {
    pub fn new(interpreter: &str) -> Self {
        Self {
            interpreter: interpreter.to_string(),
        }
    }

    pub fn execute(
        &self,
        script: &Path,
        params: &serde_json::Value,
        ctx: &ExecContext,
    ) -> Result<ExecOutput, ExecError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script).arg(params.to_string());
        ctx.apply(&mut cmd);
        process::run(cmd, None, ctx.limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // `sh` stands in for the interpreter: it receives the same argv shape.
    #[test]
    fn test_fg011_argv_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.py");
        std::fs::write(&path, "printf '%s' \"$1\"\n").unwrap();

        let exec = PythonExecutor::new("sh");
        let out = exec
            .execute(&path, &json!({"n": 3}), &ExecContext::default())
            .unwrap();
        assert_eq!(out.stdout, "{\"n\":3}");
    }

    #[test]
    fn test_fg011_missing_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.py");
        std::fs::write(&path, "print('{}')\n").unwrap();

        let exec = PythonExecutor::new("/nonexistent/python-frago-test");
        let err = exec
            .execute(&path, &json!({}), &ExecContext::default())
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert!(err.to_string().contains("python-frago-test"));
    }
}
