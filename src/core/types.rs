//! FG-001: Recipe domain types.
//!
//! Typed recipe metadata, the recipe entity, and the small enums shared by the
//! registry, runner and CLI. Everything derives Serialize so `recipe info` can
//! render it as JSON or YAML.

use super::errors::RecipeBindError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// Enums
// ============================================================================

/// Recipe kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeType {
    /// Performs one task, no recipe-level dependencies.
    Atomic,
    /// Python script that orchestrates other recipes.
    Workflow,
}

impl fmt::Display for RecipeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atomic => write!(f, "atomic"),
            Self::Workflow => write!(f, "workflow"),
        }
    }
}

impl FromStr for RecipeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(Self::Atomic),
            "workflow" => Ok(Self::Workflow),
            other => Err(format!("unknown recipe type '{}' (expected atomic | workflow)", other)),
        }
    }
}

/// Execution environment a recipe's script requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Runtime {
    #[serde(rename = "chrome-js")]
    ChromeJs,
    #[serde(rename = "python")]
    Python,
    #[serde(rename = "shell")]
    Shell,
}

impl Runtime {
    pub const ALL: [Runtime; 3] = [Runtime::ChromeJs, Runtime::Python, Runtime::Shell];

    /// Script file extension (without the dot).
    pub fn script_extension(self) -> &'static str {
        match self {
            Self::ChromeJs => "js",
            Self::Python => "py",
            Self::Shell => "sh",
        }
    }

    /// Map a script extension back to its runtime.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.script_extension() == ext)
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChromeJs => write!(f, "chrome-js"),
            Self::Python => write!(f, "python"),
            Self::Shell => write!(f, "shell"),
        }
    }
}

impl FromStr for Runtime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chrome-js" => Ok(Self::ChromeJs),
            "python" => Ok(Self::Python),
            "shell" => Ok(Self::Shell),
            other => Err(format!(
                "unknown runtime '{}' (expected chrome-js | python | shell)",
                other
            )),
        }
    }
}

/// Destination for a successful result's data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    #[default]
    Stdout,
    File,
    Clipboard,
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::File => write!(f, "file"),
            Self::Clipboard => write!(f, "clipboard"),
        }
    }
}

impl FromStr for OutputTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(Self::Stdout),
            "file" => Ok(Self::File),
            "clipboard" => Ok(Self::Clipboard),
            other => Err(format!(
                "unknown output target '{}' (expected stdout | file | clipboard)",
                other
            )),
        }
    }
}

/// Provenance of a recipe. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecipeSource {
    Project,
    User,
    Example,
}

impl RecipeSource {
    /// Lowercase label used by CLI flags.
    pub fn label(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
            Self::Example => "example",
        }
    }
}

impl fmt::Display for RecipeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "Project"),
            Self::User => write!(f, "User"),
            Self::Example => write!(f, "Example"),
        }
    }
}

/// Declared type of a recipe input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
        }
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            other => Err(format!(
                "unknown input type '{}' (expected string | number | boolean | array | object)",
                other
            )),
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// A declared recipe input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(rename = "type")]
    pub input_type: InputType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Validated, immutable recipe contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeMetadata {
    /// Identifier, `[A-Za-z0-9_-]+`
    pub name: String,

    #[serde(rename = "type")]
    pub recipe_type: RecipeType,

    pub runtime: Runtime,

    /// `MAJOR.MINOR[.PATCH]`
    pub version: String,

    /// Parameter contract (order-preserving)
    #[serde(default)]
    pub inputs: IndexMap<String, InputSpec>,

    /// Output field name → type description
    #[serde(default)]
    pub outputs: IndexMap<String, String>,

    /// Recipes this recipe calls
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// One-line summary, at most 200 chars
    pub description: String,

    /// AI-discovery hints
    pub use_cases: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub output_targets: Vec<OutputTarget>,
}

impl RecipeMetadata {
    /// Names of inputs marked `required: true`, in declaration order.
    pub fn required_inputs(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn supports_target(&self, target: OutputTarget) -> bool {
        self.output_targets.contains(&target)
    }
}

// ============================================================================
// Recipe
// ============================================================================

/// A resolved, executable recipe.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub metadata: RecipeMetadata,
    pub script_path: PathBuf,
    pub metadata_path: PathBuf,
    pub source: RecipeSource,

    /// Markdown body following the front matter
    #[serde(skip_serializing_if = "String::is_empty")]
    pub documentation: String,

    /// Non-fatal findings recorded during the scan
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Recipe {
    /// Bind metadata to its script, checking that both files exist and that
    /// the declared name equals the script's file stem.
    pub fn bind(
        metadata: RecipeMetadata,
        script_path: &Path,
        metadata_path: &Path,
        source: RecipeSource,
    ) -> Result<Self, RecipeBindError> {
        for path in [script_path, metadata_path] {
            if !path.is_file() {
                return Err(RecipeBindError::MissingFile(path.to_path_buf()));
            }
        }

        let stem = script_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if stem != metadata.name {
            return Err(RecipeBindError::NameMismatch {
                name: metadata.name,
                stem,
            });
        }

        Ok(Self {
            metadata,
            script_path: absolute(script_path),
            metadata_path: absolute(metadata_path),
            source,
            documentation: String::new(),
            warnings: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn runtime(&self) -> Runtime {
        self.metadata.runtime
    }

    pub fn recipe_type(&self) -> RecipeType {
        self.metadata.recipe_type
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// ============================================================================
// Tests
// ============================================================================
