//! FG-006: The uniform outcome envelope returned by every recipe run.

use super::types::Runtime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Failure class, serialized as the stable `error.type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "RecipeNotFoundError")]
    NotFound,
    #[serde(rename = "RecipeValidationError")]
    Validation,
    #[serde(rename = "RecipeExecutionError")]
    Execution,
    #[serde(rename = "TimeoutError")]
    Timeout,
    #[serde(rename = "OutputTooLargeError")]
    OutputTooLarge,
    #[serde(rename = "PermissionError")]
    Permission,
    #[serde(rename = "ChromeConnectionError")]
    ChromeConnection,
    #[serde(rename = "JavaScriptError")]
    JavaScript,
    #[serde(rename = "OutputRoutingError")]
    OutputRouting,
}

impl ErrorKind {
    /// CLI exit code for this failure class.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::NotFound => 1,
            Self::Validation => 2,
            Self::Timeout => 4,
            _ => 3,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "RecipeNotFoundError",
            Self::Validation => "RecipeValidationError",
            Self::Execution => "RecipeExecutionError",
            Self::Timeout => "TimeoutError",
            Self::OutputTooLarge => "OutputTooLargeError",
            Self::Permission => "PermissionError",
            Self::ChromeConnection => "ChromeConnectionError",
            Self::JavaScript => "JavaScriptError",
            Self::OutputRouting => "OutputRoutingError",
        };
        write!(f, "{}", name)
    }
}

/// Structured failure detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub recipe_name: String,
    pub runtime: Runtime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Offending parameter names for validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl ExecutionError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        recipe_name: &str,
        runtime: Runtime,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            recipe_name: recipe_name.to_string(),
            runtime,
            exit_code: None,
            stdout: None,
            stderr: None,
            fields: Vec::new(),
        }
    }

    /// Attach captured process output.
    pub fn with_output(mut self, exit_code: Option<i32>, stdout: &str, stderr: &str) -> Self {
        self.exit_code = exit_code;
        self.stdout = Some(stdout.to_string());
        self.stderr = Some(stderr.to_string());
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }
}

/// Outcome of one `Runner::run` call. Exactly one of `data` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ExecutionError>,
    /// Wall-clock seconds
    pub execution_time: f64,
    pub recipe_name: String,
    pub runtime: Runtime,
}

impl RecipeExecutionResult {
    pub fn succeeded(
        recipe_name: &str,
        runtime: Runtime,
        data: serde_json::Value,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            execution_time: elapsed.as_secs_f64(),
            recipe_name: recipe_name.to_string(),
            runtime,
        }
    }

    pub fn failed(error: ExecutionError, elapsed: Duration) -> Self {
        Self {
            success: false,
            data: None,
            execution_time: elapsed.as_secs_f64(),
            recipe_name: error.recipe_name.clone(),
            runtime: error.runtime,
            error: Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// CLI exit code: 0 on success, otherwise per failure class.
    pub fn exit_code(&self) -> i32 {
        self.error_kind().map_or(0, ErrorKind::exit_code)
    }
}
