//! FG-005: Recipe runner — resolve, validate, dispatch, package, route.
//!
//! Each stage short-circuits the ones after it:
//!
//! 1. resolve the name through the registry (not found is an `Err`)
//! 2. validate and coerce parameters against declared inputs
//! 3. check workflow dependencies
//! 4. dispatch to the runtime's executor under timeout and output limits
//! 5. parse stdout as one JSON value
//! 6. route the value to the requested output target
//!
//! Everything after step 1 produces a [`RecipeExecutionResult`] envelope.

use super::config::FragoConfig;
use super::errors::RecipeNotFoundError;
use super::params::validate_params;
use super::registry::Registry;
use super::result::{ErrorKind, ExecutionError, RecipeExecutionResult};
use super::types::{OutputTarget, Recipe, RecipeType, Runtime};
use crate::output::{OutputHandler, OutputOptions};
use crate::transport::chrome::{BrowserBridge, CommandBridge};
use crate::transport::{ExecContext, ExecError, Executor, Limits};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name of the recipe being run.
pub const ENV_RECIPE_NAME: &str = "FRAGO_RECIPE_NAME";

/// Search roots, joined with the platform path separator.
pub const ENV_RECIPE_PATHS: &str = "FRAGO_RECIPE_PATHS";

/// Path to the running `frago` binary, for workflows that call back in.
pub const ENV_BIN: &str = "FRAGO_BIN";

/// Project directory of the parent invocation. Nested `frago` calls search it first.
pub const ENV_PROJECT_DIR: &str = "FRAGO_PROJECT_DIR";

/// Explicit config file of the parent invocation, when one was given.
pub const ENV_CONFIG: &str = "FRAGO_CONFIG";

pub struct Runner<'r> {
    registry: &'r Registry,
    config: FragoConfig,
    timeout: Option<Duration>,
    bridge: Box<dyn BrowserBridge>,
    output: OutputHandler,
    env: Vec<(String, String)>,
}

impl<'r> Runner<'r> {
    pub fn new(registry: &'r Registry, config: FragoConfig) -> Self {
        let bridge = Box::new(CommandBridge::new(config.chrome_command.clone()));
        Self {
            registry,
            config,
            timeout: None,
            bridge,
            output: OutputHandler::default(),
            env: Vec::new(),
        }
    }

    /// Override the configured timeout for runs made by this runner.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_bridge(mut self, bridge: Box<dyn BrowserBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_output_handler(mut self, output: OutputHandler) -> Self {
        self.output = output;
        self
    }

    /// Export an extra variable to every recipe this runner starts.
    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    pub fn limits(&self) -> Limits {
        Limits {
            timeout: self.timeout.unwrap_or_else(|| self.config.timeout()),
            max_output_bytes: self.config.max_output_bytes,
        }
    }

    /// Run recipe `name` with `params`, routing its data to `target`.
    pub fn run(
        &self,
        name: &str,
        params: &Map<String, Value>,
        target: OutputTarget,
        options: &OutputOptions,
    ) -> Result<RecipeExecutionResult, RecipeNotFoundError> {
        let start = Instant::now();
        let recipe = self.registry.find(name)?;
        let runtime = recipe.runtime();
        let fail = |kind: ErrorKind, message: String| ExecutionError::new(kind, message, name, runtime);

        let params = match validate_params(&recipe.metadata, params) {
            Ok(p) => p,
            Err(e) => {
                debug!(recipe = name, fields = ?e.fields(), "parameter validation failed");
                let error = fail(ErrorKind::Validation, e.to_string()).with_fields(e.fields());
                return Ok(RecipeExecutionResult::failed(error, start.elapsed()));
            }
        };

        let unresolved = self.unresolved_dependencies(recipe);
        if !unresolved.is_empty() {
            let message = format!(
                "workflow dependencies not registered: {}",
                unresolved.join(", ")
            );
            return Ok(RecipeExecutionResult::failed(
                fail(ErrorKind::NotFound, message),
                start.elapsed(),
            ));
        }

        if !recipe.metadata.supports_target(target) {
            warn!(recipe = name, %target, "output target not declared by recipe");
        }

        let ctx = self.context(recipe);
        let executor = Executor::for_runtime(runtime, &self.config, self.bridge.as_ref());
        info!(recipe = name, %runtime, script = %recipe.script_path.display(), "dispatching");

        let output = match executor.execute(&recipe.script_path, &Value::Object(params), &ctx) {
            Ok(out) => out,
            Err(e) => {
                warn!(recipe = name, error = %e, "execution failed");
                return Ok(RecipeExecutionResult::failed(
                    exec_failure(&e, name, runtime),
                    start.elapsed(),
                ));
            }
        };

        if !output.success() {
            let error = fail(
                ErrorKind::Execution,
                format!("script exited with status {}", output.exit_code),
            )
            .with_output(Some(output.exit_code), &output.stdout, &output.stderr);
            return Ok(RecipeExecutionResult::failed(error, start.elapsed()));
        }

        let data: Value = match serde_json::from_str(output.stdout.trim()) {
            Ok(v) => v,
            Err(e) => {
                let error = fail(
                    ErrorKind::Execution,
                    format!("malformed output: stdout is not a JSON value ({})", e),
                )
                .with_output(Some(output.exit_code), &output.stdout, &output.stderr);
                return Ok(RecipeExecutionResult::failed(error, start.elapsed()));
            }
        };
        let elapsed = start.elapsed();

        if let Err(e) = self.output.handle(&data, target, options) {
            warn!(recipe = name, %target, error = %e, "output routing failed");
            let error = fail(ErrorKind::OutputRouting, e.to_string());
            return Ok(RecipeExecutionResult::failed(error, elapsed));
        }

        debug!(recipe = name, secs = elapsed.as_secs_f64(), "succeeded");
        Ok(RecipeExecutionResult::succeeded(name, runtime, data, elapsed))
    }

    fn unresolved_dependencies<'a>(&self, recipe: &'a Recipe) -> Vec<&'a str> {
        if recipe.recipe_type() != RecipeType::Workflow {
            return Vec::new();
        }
        recipe
            .metadata
            .dependencies
            .iter()
            .filter(|dep| !self.registry.contains(dep))
            .map(String::as_str)
            .collect()
    }

    fn context(&self, recipe: &Recipe) -> ExecContext {
        let roots = std::env::join_paths(self.registry.search_paths().iter().map(|r| &r.path))
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut ctx = ExecContext::new(self.limits())
            .with_env(ENV_RECIPE_NAME, recipe.name())
            .with_env(ENV_RECIPE_PATHS, roots);
        if let Ok(exe) = std::env::current_exe() {
            ctx = ctx.with_env(ENV_BIN, exe.to_string_lossy());
        }
        for (key, value) in &self.env {
            ctx = ctx.with_env(key, value.as_str());
        }
        ctx
    }
}

fn exec_failure(e: &ExecError, name: &str, runtime: Runtime) -> ExecutionError {
    ExecutionError::new(e.kind(), e.to_string(), name, runtime)
}
