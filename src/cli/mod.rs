//! FG-017: CLI subcommands — recipe list, info, run, copy, validate.

use crate::core::config::FragoConfig;
use crate::core::metadata::{parse_descriptor_file, validate_metadata};
use crate::core::registry::{Registry, ShadowedRecipe};
use crate::core::result::{ErrorKind, RecipeExecutionResult};
use crate::core::runner::{Runner, ENV_CONFIG, ENV_PROJECT_DIR};
use crate::core::types::{
    InputType, OutputTarget, Recipe, RecipeMetadata, RecipeSource, RecipeType, Runtime,
};
use crate::output::OutputOptions;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: <project>/.frago/config.toml, then ~/.frago/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project directory whose .frago/recipes is searched first (default: current)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover, inspect and run recipes
    #[command(subcommand)]
    Recipe(RecipeCommand),
}

#[derive(Subcommand, Debug)]
pub enum RecipeCommand {
    /// List available recipes
    List {
        /// Only recipes from this root
        #[arg(long, value_enum, default_value = "all")]
        source: SourceFilter,

        /// Only atomic recipes or only workflows
        #[arg(long = "type", value_enum, default_value = "all")]
        recipe_type: TypeFilter,

        #[arg(long, value_enum, default_value = "table")]
        format: ListFormat,
    },

    /// Show a recipe's metadata and documentation
    Info {
        name: String,

        #[arg(long, value_enum, default_value = "text")]
        format: InfoFormat,
    },

    /// Run a recipe and print its JSON result
    Run(RunArgs),

    /// Copy a recipe into the user or project root for customization
    Copy {
        name: String,

        /// Destination root
        #[arg(long, value_enum, default_value = "user")]
        dest: CopyDest,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Check one descriptor, or every recipe in the search roots
    Validate {
        /// Descriptor (.md) or script path; omit to scan all roots
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    pub name: String,

    /// Parameters as a JSON object
    #[arg(long, conflicts_with = "params_file")]
    pub params: Option<String>,

    /// Read parameters from a JSON file
    #[arg(long)]
    pub params_file: Option<PathBuf>,

    /// Write the result to this file instead of stdout
    #[arg(long, conflicts_with = "output_clipboard")]
    pub output_file: Option<PathBuf>,

    /// Copy the result to the clipboard instead of stdout
    #[arg(long)]
    pub output_clipboard: bool,

    /// Timeout in seconds (default from config: 300)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFilter {
    Project,
    User,
    Example,
    All,
}

impl SourceFilter {
    fn source(self) -> Option<RecipeSource> {
        match self {
            Self::Project => Some(RecipeSource::Project),
            Self::User => Some(RecipeSource::User),
            Self::Example => Some(RecipeSource::Example),
            Self::All => None,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeFilter {
    Atomic,
    Workflow,
    All,
}

impl TypeFilter {
    fn recipe_type(self) -> Option<RecipeType> {
        match self {
            Self::Atomic => Some(RecipeType::Atomic),
            Self::Workflow => Some(RecipeType::Workflow),
            Self::All => None,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListFormat {
    Table,
    Json,
    Names,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoFormat {
    Text,
    Json,
    Yaml,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyDest {
    User,
    Project,
}

/// Effective config, project directory, and a freshly scanned registry.
pub struct Session {
    pub config: FragoConfig,
    pub config_path: Option<PathBuf>,
    pub project_dir: PathBuf,
    pub registry: Registry,
}

impl Session {
    /// Flags win, then the variables a parent `frago` exports to its recipes,
    /// then the current directory and default config lookup.
    pub fn open(global: &GlobalArgs) -> Result<Self, String> {
        let env = |key: &str| std::env::var_os(key).map(PathBuf::from);
        let project_dir = match inherited(global.project_dir.as_ref(), ENV_PROJECT_DIR, env) {
            Some(dir) => dir,
            None => std::env::current_dir()
                .map_err(|e| format!("cannot determine current directory: {}", e))?,
        };
        let config_path = inherited(global.config.as_ref(), ENV_CONFIG, env);
        let config = FragoConfig::discover(config_path.as_deref(), &project_dir)
            .map_err(|e| e.to_string())?;
        let mut session = Self::with_config(config, absolute(project_dir));
        session.config_path = config_path.map(absolute);
        Ok(session)
    }

    pub fn with_config(config: FragoConfig, project_dir: PathBuf) -> Self {
        let registry = Registry::scanned(config.search_roots(&project_dir));
        Self {
            config,
            config_path: None,
            project_dir,
            registry,
        }
    }

    /// Runner whose recipes resolve nested `frago` calls against this session.
    fn runner(&self) -> Runner<'_> {
        let mut runner = Runner::new(&self.registry, self.config.clone())
            .with_env(ENV_PROJECT_DIR, self.project_dir.to_string_lossy());
        if let Some(ref path) = self.config_path {
            runner = runner.with_env(ENV_CONFIG, path.to_string_lossy());
        }
        runner
    }
}

fn inherited(
    flag: Option<&PathBuf>,
    var: &str,
    lookup: impl Fn(&str) -> Option<PathBuf>,
) -> Option<PathBuf> {
    flag.cloned()
        .or_else(|| lookup(var).filter(|p| !p.as_os_str().is_empty()))
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

/// Dispatch a CLI command, returning the process exit code.
pub fn dispatch(cmd: Commands, global: &GlobalArgs) -> Result<i32, String> {
    let Commands::Recipe(action) = cmd;
    let session = Session::open(global)?;
    match action {
        RecipeCommand::List {
            source,
            recipe_type,
            format,
        } => cmd_list(&session, source, recipe_type, format).map(|()| 0),
        RecipeCommand::Info { name, format } => cmd_info(&session, &name, format).map(|()| 0),
        RecipeCommand::Run(args) => cmd_run(&session, &args),
        RecipeCommand::Copy { name, dest, force } => {
            cmd_copy(&session, &name, dest, force).map(|()| 0)
        }
        RecipeCommand::Validate { path: Some(path) } => cmd_validate_file(&path).map(|()| 0),
        RecipeCommand::Validate { path: None } => cmd_validate_all(&session).map(|()| 0),
    }
}

// ============================================================================
// list
// ============================================================================

fn cmd_list(
    session: &Session,
    source: SourceFilter,
    recipe_type: TypeFilter,
    format: ListFormat,
) -> Result<(), String> {
    let recipes = session
        .registry
        .filter(source.source(), recipe_type.recipe_type());
    println!("{}", render_list(&recipes, format)?);
    Ok(())
}

#[derive(Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    recipe_type: RecipeType,
    runtime: Runtime,
    source: &'static str,
    version: &'a str,
    description: &'a str,
    tags: &'a [String],
}

fn render_list(recipes: &[&Recipe], format: ListFormat) -> Result<String, String> {
    match format {
        ListFormat::Names => Ok(recipes
            .iter()
            .map(|r| r.name())
            .collect::<Vec<_>>()
            .join("\n")),
        ListFormat::Json => {
            let entries: Vec<ListEntry> = recipes
                .iter()
                .map(|r| ListEntry {
                    name: r.name(),
                    recipe_type: r.recipe_type(),
                    runtime: r.runtime(),
                    source: r.source.label(),
                    version: &r.metadata.version,
                    description: &r.metadata.description,
                    tags: &r.metadata.tags,
                })
                .collect();
            serde_json::to_string_pretty(&entries).map_err(|e| format!("JSON error: {}", e))
        }
        ListFormat::Table => {
            if recipes.is_empty() {
                return Ok("No recipes found.".to_string());
            }
            let width = recipes
                .iter()
                .map(|r| r.name().len())
                .max()
                .unwrap_or(0)
                .max(4);
            let mut lines = vec![format!(
                "{:<width$}  {:<8}  {:<9}  {:<7}  {:<7}  DESCRIPTION",
                "NAME", "TYPE", "RUNTIME", "SOURCE", "VERSION"
            )];
            for r in recipes {
                lines.push(format!(
                    "{:<width$}  {:<8}  {:<9}  {:<7}  {:<7}  {}",
                    r.name(),
                    r.recipe_type().to_string(),
                    r.runtime().to_string(),
                    r.source.label(),
                    r.metadata.version,
                    r.metadata.description
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

// ============================================================================
// info
// ============================================================================

fn cmd_info(session: &Session, name: &str, format: InfoFormat) -> Result<(), String> {
    let recipe = session.registry.find(name).map_err(|e| e.to_string())?;
    println!(
        "{}",
        render_info(recipe, session.registry.shadowed(), format)?
    );
    Ok(())
}

fn render_info(
    recipe: &Recipe,
    shadowed: &[ShadowedRecipe],
    format: InfoFormat,
) -> Result<String, String> {
    match format {
        InfoFormat::Json => {
            serde_json::to_string_pretty(recipe).map_err(|e| format!("JSON error: {}", e))
        }
        InfoFormat::Yaml => {
            serde_yaml_ng::to_string(recipe).map_err(|e| format!("YAML error: {}", e))
        }
        InfoFormat::Text => Ok(render_info_text(recipe, shadowed)),
    }
}

fn render_info_text(recipe: &Recipe, shadowed: &[ShadowedRecipe]) -> String {
    let meta = &recipe.metadata;
    let mut lines = vec![
        format!("{} v{}", meta.name, meta.version),
        format!("  {}", meta.description),
        String::new(),
        format!("  Type:     {}", meta.recipe_type),
        format!("  Runtime:  {}", meta.runtime),
        format!("  Source:   {}", recipe.source),
        format!("  Script:   {}", recipe.script_path.display()),
        format!("  Metadata: {}", recipe.metadata_path.display()),
        format!(
            "  Targets:  {}",
            meta.output_targets
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    ];
    if !meta.tags.is_empty() {
        lines.push(format!("  Tags:     {}", meta.tags.join(", ")));
    }

    lines.push(String::new());
    lines.push("Use cases:".to_string());
    lines.extend(meta.use_cases.iter().map(|u| format!("  - {}", u)));

    if !meta.inputs.is_empty() {
        lines.push(String::new());
        lines.push("Inputs:".to_string());
        for (name, spec) in &meta.inputs {
            let mut line = format!("  {} ({}", name, spec.input_type);
            if spec.required {
                line.push_str(", required");
            }
            if let Some(ref default) = spec.default {
                line.push_str(&format!(", default {}", default));
            }
            line.push(')');
            if let Some(ref desc) = spec.description {
                line.push_str(&format!(": {}", desc));
            }
            lines.push(line);
        }
    }

    if !meta.outputs.is_empty() {
        lines.push(String::new());
        lines.push("Outputs:".to_string());
        lines.extend(meta.outputs.iter().map(|(k, v)| format!("  {}: {}", k, v)));
    }

    if !meta.dependencies.is_empty() {
        lines.push(String::new());
        lines.push(format!("Dependencies: {}", meta.dependencies.join(", ")));
    }

    for w in &recipe.warnings {
        lines.push(format!("  WARN: {}", w));
    }
    for s in shadowed.iter().filter(|s| s.name == meta.name) {
        lines.push(format!(
            "  NOTE: shadows {} copy at {}",
            s.shadowed.label(),
            s.shadowed_path.display()
        ));
    }

    lines.push(String::new());
    lines.push(format!("Example: {}", example_invocation(meta)));

    if !recipe.documentation.is_empty() {
        lines.push(String::new());
        lines.push(recipe.documentation.clone());
    }
    lines.join("\n")
}

/// `frago recipe run <name> --params '{...}'` with placeholders for every
/// required input.
fn example_invocation(meta: &RecipeMetadata) -> String {
    let placeholders: Map<String, Value> = meta
        .inputs
        .iter()
        .filter(|(_, spec)| spec.required)
        .map(|(name, spec)| (name.clone(), placeholder(spec.input_type)))
        .collect();
    if placeholders.is_empty() {
        return format!("frago recipe run {}", meta.name);
    }
    format!(
        "frago recipe run {} --params '{}'",
        meta.name,
        Value::Object(placeholders)
    )
}

fn placeholder(input_type: InputType) -> Value {
    match input_type {
        InputType::String => Value::String("...".to_string()),
        InputType::Number => Value::from(0),
        InputType::Boolean => Value::Bool(false),
        InputType::Array => Value::Array(Vec::new()),
        InputType::Object => Value::Object(Map::new()),
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(session: &Session, args: &RunArgs) -> Result<i32, String> {
    let params = match read_params(args.params.as_deref(), args.params_file.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ErrorKind::Validation.exit_code());
        }
    };

    let (target, options) = match (&args.output_file, args.output_clipboard) {
        (Some(path), _) => (OutputTarget::File, OutputOptions::file(path)),
        (None, true) => (OutputTarget::Clipboard, OutputOptions::default()),
        (None, false) => (OutputTarget::Stdout, OutputOptions::default()),
    };

    let mut runner = session.runner();
    if let Some(secs) = args.timeout {
        runner = runner.with_timeout(Duration::from_secs(secs));
    }

    let result = match runner.run(&args.name, &params, target, &options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("hint: `frago recipe list` shows available recipes");
            return Ok(ErrorKind::NotFound.exit_code());
        }
    };

    // Stdout-targeted data was already printed by the output handler.
    if !result.success || target != OutputTarget::Stdout {
        let envelope =
            serde_json::to_string_pretty(&result).map_err(|e| format!("JSON error: {}", e))?;
        println!("{}", envelope);
    }

    if result.success {
        match target {
            OutputTarget::File => {
                if let Some(ref path) = options.path {
                    eprintln!("{}: result written to {}", result.recipe_name, path.display());
                }
            }
            OutputTarget::Clipboard => {
                eprintln!("{}: result copied to clipboard", result.recipe_name)
            }
            OutputTarget::Stdout => {}
        }
    } else {
        let recipe = session.registry.find(&args.name).ok();
        eprint!("{}", failure_report(&result, recipe));
    }
    Ok(result.exit_code())
}

/// Parameters from `--params` or `--params-file`; must be a JSON object.
fn read_params(params: Option<&str>, params_file: Option<&Path>) -> Result<Map<String, Value>, String> {
    let text = match (params, params_file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?,
        (None, None) => return Ok(Map::new()),
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!(
            "parameters must be a JSON object, got {}",
            json_kind(&other)
        )),
        Err(e) => Err(format!("invalid parameters JSON: {}", e)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

const STDERR_TAIL_LINES: usize = 20;
const STDOUT_HEAD_CHARS: usize = 500;

/// Human summary of a failed run: cause, output excerpts, remediation.
fn failure_report(result: &RecipeExecutionResult, recipe: Option<&Recipe>) -> String {
    let Some(ref error) = result.error else {
        return String::new();
    };
    let mut lines = vec![format!(
        "error: [{}] {} (recipe: {}, runtime: {})",
        error.kind, error.message, error.recipe_name, error.runtime
    )];

    if let Some(stderr) = error.stderr.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push("stderr (last lines):".to_string());
        lines.extend(tail_lines(stderr, STDERR_TAIL_LINES).map(|l| format!("  {}", l)));
    }
    if let Some(stdout) = error.stdout.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(format!("stdout (first {} chars):", STDOUT_HEAD_CHARS));
        let head: String = stdout.chars().take(STDOUT_HEAD_CHARS).collect();
        lines.extend(head.lines().map(|l| format!("  {}", l)));
    }

    match error.kind {
        ErrorKind::Validation => {
            if let Some(recipe) = recipe {
                for field in &error.fields {
                    if let Some(spec) = recipe.metadata.inputs.get(field) {
                        lines.push(format!(
                            "  {} ({}): {}",
                            field,
                            spec.input_type,
                            spec.description.as_deref().unwrap_or("no description")
                        ));
                    }
                }
                lines.push(format!("hint: {}", example_invocation(&recipe.metadata)));
            }
        }
        ErrorKind::Timeout => lines.push(
            "hint: raise the limit with --timeout <seconds> or timeout_secs in config.toml"
                .to_string(),
        ),
        ErrorKind::OutputTooLarge => lines.push(
            "hint: write large results to a file from the script and print its path instead"
                .to_string(),
        ),
        ErrorKind::Permission => {
            if let Some(recipe) = recipe {
                lines.push(format!("hint: chmod +x {}", recipe.script_path.display()));
            }
        }
        ErrorKind::ChromeConnection => lines.push(
            "hint: start Chrome with --remote-debugging-port and check chrome_command in config.toml"
                .to_string(),
        ),
        ErrorKind::JavaScript => lines.push(
            "hint: the page script threw; check that the page is loaded and selectors still match"
                .to_string(),
        ),
        ErrorKind::Execution if error.message.starts_with("malformed output") => lines.push(
            "hint: print exactly one JSON value on stdout and send logs to stderr".to_string(),
        ),
        ErrorKind::NotFound => lines.push(
            "hint: install the missing recipes, or `frago recipe copy` them into this project"
                .to_string(),
        ),
        ErrorKind::OutputRouting => lines.push(
            "hint: check the output path, or install pbcopy, wl-copy, xclip or xsel".to_string(),
        ),
        ErrorKind::Execution => {}
    }

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

fn tail_lines(text: &str, n: usize) -> impl Iterator<Item = &str> {
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(n);
    lines.into_iter().skip(skip)
}

// ============================================================================
// copy
// ============================================================================

fn cmd_copy(session: &Session, name: &str, dest: CopyDest, force: bool) -> Result<(), String> {
    let recipe = session.registry.find(name).map_err(|e| e.to_string())?;

    let (dest_root, dest_source) = match dest {
        CopyDest::Project => (
            FragoConfig::project_recipes_dir(&session.project_dir),
            RecipeSource::Project,
        ),
        CopyDest::User => (
            session
                .config
                .user_recipes_dir()
                .ok_or("cannot determine home directory for user recipes")?,
            RecipeSource::User,
        ),
    };
    if recipe.source == dest_source {
        return Err(format!(
            "{} is already a {} recipe ({})",
            name,
            dest_source.label(),
            recipe.script_path.display()
        ));
    }

    let target_dir = dest_root.join(recipe_subdir(&session.registry, recipe));
    let mut planned = Vec::new();
    for src in [&recipe.script_path, &recipe.metadata_path] {
        let file_name = src
            .file_name()
            .ok_or_else(|| format!("invalid recipe path {}", src.display()))?;
        let dst = target_dir.join(file_name);
        if dst.exists() && !force {
            return Err(format!(
                "{} already exists (use --force to overwrite)",
                dst.display()
            ));
        }
        planned.push((src, dst));
    }

    std::fs::create_dir_all(&target_dir)
        .map_err(|e| format!("cannot create {}: {}", target_dir.display(), e))?;
    for (src, dst) in &planned {
        std::fs::copy(src, dst).map_err(|e| {
            format!("cannot copy {} to {}: {}", src.display(), dst.display(), e)
        })?;
    }

    println!(
        "Copied {} ({}) to {}",
        name,
        recipe.source.label(),
        target_dir.display()
    );
    Ok(())
}

/// Directory of `recipe` relative to its search root, e.g. `atomic/chrome`.
fn recipe_subdir(registry: &Registry, recipe: &Recipe) -> PathBuf {
    let parent = recipe.script_path.parent();
    registry
        .search_paths()
        .iter()
        .filter(|root| root.source == recipe.source)
        .filter_map(|root| std::fs::canonicalize(&root.path).ok())
        .find_map(|root| parent?.strip_prefix(&root).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(conventional_subdir(recipe)))
}

fn conventional_subdir(recipe: &Recipe) -> &'static str {
    match (recipe.recipe_type(), recipe.runtime()) {
        (RecipeType::Workflow, _) => "workflows",
        (RecipeType::Atomic, Runtime::ChromeJs) => "atomic/chrome",
        (RecipeType::Atomic, _) => "atomic/system",
    }
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate_file(path: &Path) -> Result<(), String> {
    let is_script = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(Runtime::from_extension)
        .is_some();
    let descriptor_path = if is_script {
        path.with_extension("md")
    } else {
        path.to_path_buf()
    };

    let descriptor = parse_descriptor_file(&descriptor_path).map_err(|e| e.to_string())?;
    match validate_metadata(&descriptor.metadata) {
        Ok(meta) => {
            println!(
                "OK: {} ({}, {}, v{})",
                meta.name, meta.recipe_type, meta.runtime, meta.version
            );
            Ok(())
        }
        Err(e) => {
            for err in &e.errors {
                eprintln!("  ERROR: {}", err);
            }
            Err(format!("{} validation error(s)", e.errors.len()))
        }
    }
}

fn cmd_validate_all(session: &Session) -> Result<(), String> {
    let registry = &session.registry;
    for d in registry.diagnostics() {
        eprintln!("  ERROR: {}: {}", d.path.display(), d.reason);
    }
    for recipe in registry.list_all() {
        for w in &recipe.warnings {
            eprintln!("  WARN: {}: {}", recipe.name(), w);
        }
    }
    for s in registry.shadowed() {
        eprintln!(
            "  NOTE: {} from {} shadows {} copy at {}",
            s.name,
            s.in_effect.label(),
            s.shadowed.label(),
            s.shadowed_path.display()
        );
    }

    let invalid = registry.diagnostics().len();
    if invalid > 0 {
        return Err(format!("{} invalid recipe(s)", invalid));
    }
    println!(
        "OK: {} recipe(s) across {} root(s)",
        registry.len(),
        registry.search_paths().len()
    );
    Ok(())
}
