//! FG-003: Recipe registry — priority-ordered discovery across search roots.
//!
//! Every root uses the same layout:
//!
//! ```text
//! <root>/atomic/chrome/<name>.js   + <name>.md
//! <root>/atomic/system/<name>.py   + <name>.md   (or .sh)
//! <root>/workflows/<name>.py       + <name>.md
//! ```
//!
//! Roots are scanned in priority order and the first root to register a name
//! keeps it. The table is rebuilt from scratch on every scan.
//!
//! Workflows are Python recipes. A workflow declared with another runtime is
//! still registered and runnable, with a warning attached.

use super::errors::RecipeNotFoundError;
use super::metadata::{parse_descriptor_file, validate_metadata};
use super::types::{Recipe, RecipeSource, RecipeType, Runtime};
use crate::transport::shell::is_executable;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Conventional recipe directories under each root, in scan order.
pub const RECIPE_DIRS: [&str; 3] = ["atomic/chrome", "atomic/system", "workflows"];

/// A search root and the source tag its recipes receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRoot {
    pub path: PathBuf,
    pub source: RecipeSource,
}

impl SearchRoot {
    pub fn new(path: impl Into<PathBuf>, source: RecipeSource) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// A script whose descriptor could not be registered.
#[derive(Debug, Clone, Serialize)]
pub struct ScanDiagnostic {
    pub path: PathBuf,
    pub source: RecipeSource,
    pub reason: String,
}

/// A recipe hidden by a same-named recipe from a higher-priority root.
#[derive(Debug, Clone, Serialize)]
pub struct ShadowedRecipe {
    pub name: String,
    pub in_effect: RecipeSource,
    pub in_effect_path: PathBuf,
    pub shadowed: RecipeSource,
    pub shadowed_path: PathBuf,
}

/// Name-indexed recipe table.
#[derive(Debug, Default)]
pub struct Registry {
    search_paths: Vec<SearchRoot>,
    recipes: IndexMap<String, Recipe>,
    diagnostics: Vec<ScanDiagnostic>,
    shadowed: Vec<ShadowedRecipe>,
}

impl Registry {
    /// Create an empty registry. Call [`Registry::scan`] to populate it.
    pub fn new(search_paths: Vec<SearchRoot>) -> Self {
        Self {
            search_paths,
            ..Self::default()
        }
    }

    /// Create and scan in one step.
    pub fn scanned(search_paths: Vec<SearchRoot>) -> Self {
        let mut registry = Self::new(search_paths);
        registry.scan();
        registry
    }

    pub fn search_paths(&self) -> &[SearchRoot] {
        &self.search_paths
    }

    /// Rebuild the table from disk.
    pub fn scan(&mut self) {
        let mut recipes: IndexMap<String, Recipe> = IndexMap::new();
        let mut diagnostics = Vec::new();
        let mut shadowed = Vec::new();

        for root in &self.search_paths {
            if !root.path.is_dir() {
                debug!(root = %root.path.display(), "search root missing, skipping");
                continue;
            }

            for sub in RECIPE_DIRS {
                for script in list_scripts(&root.path.join(sub)) {
                    match load_recipe(&script, root.source) {
                        Ok(None) => {
                            debug!(script = %script.display(), "no descriptor, skipping");
                        }
                        Ok(Some(recipe)) => {
                            if let Some(existing) = recipes.get(recipe.name()) {
                                debug!(
                                    name = recipe.name(),
                                    kept = %existing.source,
                                    dropped = %recipe.source,
                                    "recipe shadowed"
                                );
                                shadowed.push(ShadowedRecipe {
                                    name: recipe.name().to_string(),
                                    in_effect: existing.source,
                                    in_effect_path: existing.script_path.clone(),
                                    shadowed: recipe.source,
                                    shadowed_path: recipe.script_path,
                                });
                            } else {
                                recipes.insert(recipe.name().to_string(), recipe);
                            }
                        }
                        Err(reason) => {
                            warn!(script = %script.display(), %reason, "recipe skipped");
                            diagnostics.push(ScanDiagnostic {
                                path: script,
                                source: root.source,
                                reason,
                            });
                        }
                    }
                }
            }
        }

        check_dependencies(&mut recipes);

        info!(
            recipes = recipes.len(),
            skipped = diagnostics.len(),
            shadowed = shadowed.len(),
            "recipe scan complete"
        );
        self.recipes = recipes;
        self.diagnostics = diagnostics;
        self.shadowed = shadowed;
    }

    /// Look up a recipe by name.
    pub fn find(&self, name: &str) -> Result<&Recipe, RecipeNotFoundError> {
        self.recipes.get(name).ok_or_else(|| RecipeNotFoundError {
            name: name.to_string(),
            searched: self.search_paths.iter().map(|r| r.path.clone()).collect(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    /// All recipes, ordered by source priority then name.
    pub fn list_all(&self) -> Vec<&Recipe> {
        let mut all: Vec<&Recipe> = self.recipes.values().collect();
        all.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.name().cmp(b.name()))
        });
        all
    }

    /// Recipes matching an optional source and type, in `list_all` order.
    pub fn filter(
        &self,
        source: Option<RecipeSource>,
        recipe_type: Option<RecipeType>,
    ) -> Vec<&Recipe> {
        self.list_all()
            .into_iter()
            .filter(|r| source.is_none_or(|s| r.source == s))
            .filter(|r| recipe_type.is_none_or(|t| r.recipe_type() == t))
            .collect()
    }

    /// Scripts skipped during the last scan, with the reason.
    pub fn diagnostics(&self) -> &[ScanDiagnostic] {
        &self.diagnostics
    }

    /// Name collisions resolved during the last scan.
    pub fn shadowed(&self) -> &[ShadowedRecipe] {
        &self.shadowed
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// Scripts with a runtime extension directly inside `dir`, sorted.
fn list_scripts(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut scripts: Vec<PathBuf> = Runtime::ALL
        .iter()
        .filter_map(|rt| glob::glob(&format!("{}/*.{}", base, rt.script_extension())).ok())
        .flat_map(|paths| paths.filter_map(Result::ok))
        .filter(|p| p.is_file())
        .collect();
    scripts.sort();
    scripts
}

/// Load the recipe for `script`. `Ok(None)` when it has no descriptor.
fn load_recipe(script: &Path, source: RecipeSource) -> Result<Option<Recipe>, String> {
    let metadata_path = script.with_extension("md");
    if !metadata_path.is_file() {
        return Ok(None);
    }

    let descriptor = parse_descriptor_file(&metadata_path)
        .map_err(|e| format!("{}: {}", metadata_path.display(), e))?;
    let metadata = validate_metadata(&descriptor.metadata)
        .map_err(|e| format!("{}: {}", metadata_path.display(), e))?;

    let ext = script
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    if metadata.runtime.script_extension() != ext {
        return Err(format!(
            "runtime '{}' expects a .{} script, found .{}",
            metadata.runtime,
            metadata.runtime.script_extension(),
            ext
        ));
    }

    let mut recipe =
        Recipe::bind(metadata, script, &metadata_path, source).map_err(|e| e.to_string())?;
    recipe.documentation = descriptor.documentation;

    if recipe.runtime() == Runtime::Shell && !is_executable(&recipe.script_path) {
        recipe.warnings.push(format!(
            "shell script is not executable (chmod +x {})",
            recipe.script_path.display()
        ));
    }
    if recipe.recipe_type() == RecipeType::Workflow && recipe.runtime() != Runtime::Python {
        recipe.warnings.push(format!(
            "workflow uses the '{}' runtime; workflows are expected to be python",
            recipe.runtime()
        ));
    }

    Ok(Some(recipe))
}

/// Attach a warning to each workflow whose dependencies are not registered.
fn check_dependencies(recipes: &mut IndexMap<String, Recipe>) {
    let known: HashSet<String> = recipes.keys().cloned().collect();
    for recipe in recipes.values_mut() {
        if recipe.recipe_type() != RecipeType::Workflow {
            continue;
        }
        let missing: Vec<String> = recipe
            .metadata
            .dependencies
            .iter()
            .filter(|dep| !known.contains(*dep))
            .cloned()
            .collect();
        for dep in missing {
            warn!(workflow = recipe.name(), dependency = %dep, "unresolved dependency");
            recipe
                .warnings
                .push(format!("dependency '{}' is not registered", dep));
        }
    }
}
