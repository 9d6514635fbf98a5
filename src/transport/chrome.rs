//! FG-013: chrome-js recipes — evaluate a script in the controlled browser.
//!
//! The browser is reached through a [`BrowserBridge`]. The default bridge is
//! an external command that reads JavaScript on stdin, evaluates it in the
//! page over the debugging protocol, and prints the value to stdout.
//! Parameters are injected ahead of the recipe source as
//! `window.__FRAGO_PARAMS__`.

use super::{process, ExecContext, ExecError, ExecOutput};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Bridge exit status: the browser could not be reached.
pub const EXIT_CONNECTION_FAILED: i32 = 10;

/// Bridge exit status: the page script threw.
pub const EXIT_SCRIPT_EXCEPTION: i32 = 11;

/// Global the recipe reads its parameters from.
pub const PARAMS_GLOBAL: &str = "window.__FRAGO_PARAMS__";

/// Evaluates JavaScript in a browser page.
pub trait BrowserBridge: Send + Sync {
    fn evaluate(&self, source: &str, ctx: &ExecContext) -> Result<ExecOutput, ExecError>;
}

/// Bridge backed by an external command (`chrome_command` in config).
#[derive(Debug, Clone)]
pub struct CommandBridge {
    command: Vec<String>,
}

impl CommandBridge {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl BrowserBridge for CommandBridge {
    fn evaluate(&self, source: &str, ctx: &ExecContext) -> Result<ExecOutput, ExecError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(ExecError::ChromeConnection(
                "no browser bridge command configured".to_string(),
            ));
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        ctx.apply(&mut cmd);

        let out = process::run(cmd, Some(source.as_bytes().to_vec()), ctx.limits).map_err(|e| match e {
            ExecError::Spawn { program, source } => {
                ExecError::ChromeConnection(format!("cannot launch bridge '{}': {}", program, source))
            }
            other => other,
        })?;
        debug!(exit_code = out.exit_code, "bridge returned");

        match out.exit_code {
            EXIT_CONNECTION_FAILED => Err(ExecError::ChromeConnection(bridge_message(&out))),
            EXIT_SCRIPT_EXCEPTION => Err(ExecError::JavaScript(bridge_message(&out))),
            _ => Ok(out),
        }
    }
}

fn bridge_message(out: &ExecOutput) -> String {
    let msg = out.stderr.trim();
    if msg.is_empty() {
        format!("bridge exited with status {}", out.exit_code)
    } else {
        msg.to_string()
    }
}

/// Prefix `source` with the parameter binding.
pub fn wrap_script(source: &str, params: &serde_json::Value) -> String {
    format!("{} = {};\n{}", PARAMS_GLOBAL, params, source)
}

pub struct ChromeJsExecutor<'a> {
    bridge: &'a dyn BrowserBridge,
}

impl<'a> ChromeJsExecutor<'a> {
    pub fn new(bridge: &'a dyn BrowserBridge) -> Self {
        Self { bridge }
    }

    pub fn execute(
        &self,
        script: &Path,
        params: &serde_json::Value,
        ctx: &ExecContext,
    ) -> Result<ExecOutput, ExecError> {
        let source = std::fs::read_to_string(script)
            .map_err(|e| ExecError::Io(format!("cannot read {}: {}", script.display(), e)))?;
        self.bridge.evaluate(&wrap_script(&source, params), ctx)
    }
}

/// Bridge that returns a canned result and records what it was asked to run.
#[cfg(test)]
pub(crate) struct FakeBridge {
    pub result: std::sync::Mutex<Option<Result<ExecOutput, ExecError>>>,
    pub seen: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl FakeBridge {
    pub fn returning(stdout: &str) -> Self {
        Self::with(Ok(ExecOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }))
    }

    pub fn with(result: Result<ExecOutput, ExecError>) -> Self {
        Self {
            result: std::sync::Mutex::new(Some(result)),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl BrowserBridge for FakeBridge {
    fn evaluate(&self, source: &str, _ctx: &ExecContext) -> Result<ExecOutput, ExecError> {
        self.seen.lock().unwrap().push(source.to_string());
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ExecError::ChromeConnection("fake bridge exhausted".into())))
    }
}
