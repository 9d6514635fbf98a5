//! FG-007: Runner configuration and search-root resolution.
//!
//! Configuration is an optional TOML file. Lookup order: explicit `--config`,
//! `<project>/.frago/config.toml`, `~/.frago/config.toml`, built-in defaults.

use super::registry::SearchRoot;
use super::types::RecipeSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Per-project / per-user state directory name.
pub const FRAGO_DIR: &str = ".frago";
pub const RECIPES_DIR: &str = "recipes";
pub const CONFIG_FILE: &str = "config.toml";

/// Overrides `examples_dir` when set.
pub const EXAMPLES_ENV: &str = "FRAGO_EXAMPLES_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Runner limits and collaborator commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragoConfig {
    /// Per-run timeout in seconds
    pub timeout_secs: u64,

    /// Ceiling on captured stdout, in bytes
    pub max_output_bytes: usize,

    /// Interpreter for python recipes
    pub python: String,

    /// Browser bridge command; receives the script on stdin
    pub chrome_command: Vec<String>,

    /// User-global recipe root (default `~/.frago/recipes`)
    pub user_dir: Option<PathBuf>,

    /// Bundled example recipes
    pub examples_dir: Option<PathBuf>,
}

impl Default for FragoConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            python: "python3".to_string(),
            chrome_command: vec![
                "frago-cdp".to_string(),
                "exec-js".to_string(),
                "-".to_string(),
            ],
            user_dir: None,
            examples_dir: None,
        }
    }
}

impl FragoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load a config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find and load the effective config for `project_dir`.
    pub fn discover(explicit: Option<&Path>, project_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let mut candidates = vec![project_dir.join(FRAGO_DIR).join(CONFIG_FILE)];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(FRAGO_DIR).join(CONFIG_FILE));
        }

        for candidate in candidates {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    /// `<project>/.frago/recipes`
    pub fn project_recipes_dir(project_dir: &Path) -> PathBuf {
        project_dir.join(FRAGO_DIR).join(RECIPES_DIR)
    }

    /// Configured user root, else `~/.frago/recipes`.
    pub fn user_recipes_dir(&self) -> Option<PathBuf> {
        self.user_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(FRAGO_DIR).join(RECIPES_DIR)))
    }

    /// Examples root: `$FRAGO_EXAMPLES_DIR`, else the configured one.
    pub fn examples_recipes_dir(&self) -> Option<PathBuf> {
        std::env::var_os(EXAMPLES_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.examples_dir.clone())
    }

    /// Search roots in priority order: project, user, examples.
    pub fn search_roots(&self, project_dir: &Path) -> Vec<SearchRoot> {
        build_roots(
            Self::project_recipes_dir(project_dir),
            self.user_recipes_dir(),
            self.examples_recipes_dir(),
        )
    }
}

fn build_roots(project: PathBuf, user: Option<PathBuf>, examples: Option<PathBuf>) -> Vec<SearchRoot> {
    let mut roots = vec![SearchRoot::new(project, RecipeSource::Project)];
    for (path, source) in [(user, RecipeSource::User), (examples, RecipeSource::Example)] {
        let Some(path) = path else { continue };
        // Running from $HOME makes the project and user roots coincide.
        if roots.iter().any(|r| r.path == path) {
            continue;
        }
        roots.push(SearchRoot::new(path, source));
    }
    roots
}
