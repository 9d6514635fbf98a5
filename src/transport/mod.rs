//! FG-010: Executors — turn a script path + parameter object into raw output.
//!
//! One closed enum with a variant per runtime. The runner picks the variant
//! from `metadata.runtime`; executors only launch and capture, the runner
//! decides what the output means.

pub mod chrome;
pub mod process;
pub mod python;
pub mod shell;

use crate::core::config::{FragoConfig, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_SECS};
use crate::core::result::ErrorKind;
use crate::core::types::Runtime;
use chrome::{BrowserBridge, ChromeJsExecutor};
use python::PythonExecutor;
use shell::ShellExecutor;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Output from a finished script.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Why an executor produced no usable output.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Io(String),

    #[error("execution timed out after {}s", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    #[error("output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("{} is not executable (chmod +x it; no interpreter fallback is attempted)", .path.display())]
    Permission { path: PathBuf },

    #[error("browser connection failed: {0}")]
    ChromeConnection(String),

    #[error("JavaScript exception: {0}")]
    JavaScript(String),
}

impl ExecError {
    /// Envelope failure class for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Spawn { .. } | Self::Io(_) => ErrorKind::Execution,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::OutputTooLarge { .. } => ErrorKind::OutputTooLarge,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::ChromeConnection(_) => ErrorKind::ChromeConnection,
            Self::JavaScript(_) => ErrorKind::JavaScript,
        }
    }
}

/// Time and size bounds for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Per-run limits and environment handed to every executor.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    pub limits: Limits,
    pub env: Vec<(String, String)>,
}

impl ExecContext {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    fn apply(&self, cmd: &mut Command) {
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
}

/// Runtime-specific executor.
pub enum Executor<'a> {
    ChromeJs(ChromeJsExecutor<'a>),
    Python(PythonExecutor),
    Shell(ShellExecutor),
}

impl<'a> Executor<'a> {
    /// The dispatch table: one variant per runtime.
    pub fn for_runtime(
        runtime: Runtime,
        config: &FragoConfig,
        bridge: &'a dyn BrowserBridge,
    ) -> Self {
        match runtime {
            Runtime::ChromeJs => Self::ChromeJs(ChromeJsExecutor::new(bridge)),
            Runtime::Python => Self::Python(PythonExecutor::new(&config.python)),
            Runtime::Shell => Self::Shell(ShellExecutor),
        }
    }

    /// Run `script` with `params`, returning raw captured output.
    pub fn execute(
        &self,
        script: &Path,
        params: &serde_json::Value,
        ctx: &ExecContext,
    ) -> Result<ExecOutput, ExecError> {
        match self {
            Self::ChromeJs(e) => e.execute(script, params, ctx),
            Self::Python(e) => e.execute(script, params, ctx),
            Self::Shell(e) => e.execute(script, params, ctx),
        }
    }
}
