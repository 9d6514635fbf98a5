//! FG-002: Recipe descriptor parsing and validation.
//!
//! A descriptor is a markdown file whose YAML front matter carries the recipe
//! contract:
//!
//! ```text
//! ---
//! name: open_page
//! type: atomic
//! runtime: chrome-js
//! version: "1.0"
//! ...
//! ---
//! # free-form documentation
//! ```
//!
//! Parsing only requires the front matter to be a YAML mapping. Every field
//! stays a raw YAML value until validation, so a wrong shape in one field is
//! reported next to every other violation instead of aborting the parse.

use super::errors::{FieldError, MetadataParseError, RecipeValidationError};
use super::types::*;
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_yaml_ng::Value as Yaml;
use std::path::Path;
use std::sync::LazyLock;

/// Upper bound on `description`, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 200;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("invalid recipe name regex"));

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("invalid version regex"));

/// Front matter as written, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMetadata {
    pub name: Option<Yaml>,
    #[serde(rename = "type")]
    pub recipe_type: Option<Yaml>,
    pub runtime: Option<Yaml>,
    pub version: Option<Yaml>,
    pub inputs: Option<Yaml>,
    pub outputs: Option<Yaml>,
    pub dependencies: Option<Yaml>,
    pub description: Option<Yaml>,
    pub use_cases: Option<Yaml>,
    pub tags: Option<Yaml>,
    pub output_targets: Option<Yaml>,
}

/// A parsed descriptor: front matter plus the markdown body.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub metadata: RawMetadata,
    pub documentation: String,
}

/// Parse a descriptor file from disk.
pub fn parse_descriptor_file(path: &Path) -> Result<Descriptor, MetadataParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| MetadataParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_descriptor(&content)
}

/// Parse a descriptor from its text.
pub fn parse_descriptor(text: &str) -> Result<Descriptor, MetadataParseError> {
    let (yaml, body) = split_front_matter(text)?;

    let metadata = if yaml.trim().is_empty() {
        RawMetadata::default()
    } else {
        serde_yaml_ng::from_str(yaml).map_err(|e| MetadataParseError::Malformed(e.to_string()))?
    };

    Ok(Descriptor {
        metadata,
        documentation: body.trim().to_string(),
    })
}

/// Split `---\n<yaml>---\n<body>` into its two halves.
fn split_front_matter(text: &str) -> Result<(&str, &str), MetadataParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');

    let first = lines.next().ok_or(MetadataParseError::MissingFrontMatter)?;
    if first.trim_end() != "---" {
        return Err(MetadataParseError::MissingFrontMatter);
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return Ok((&text[start..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(MetadataParseError::UnterminatedFrontMatter)
}

/// Validate raw front matter into typed metadata.
///
/// Every violation is collected; the error lists all of them.
pub fn validate_metadata(raw: &RawMetadata) -> Result<RecipeMetadata, RecipeValidationError> {
    let mut errors = Vec::new();

    let name = match required_str("name", raw.name.as_ref(), &mut errors) {
        Some(n) if !NAME_RE.is_match(n) => {
            errors.push(FieldError::new(
                "name",
                format!("'{}' must match ^[A-Za-z0-9_-]+$", n),
            ));
            None
        }
        other => other.map(str::to_string),
    };

    let recipe_type = parse_enum::<RecipeType>("type", raw.recipe_type.as_ref(), &mut errors);
    let runtime = parse_enum::<Runtime>("runtime", raw.runtime.as_ref(), &mut errors);
    let version = validate_version(raw.version.as_ref(), &mut errors);
    let inputs = validate_inputs(raw.inputs.as_ref(), &mut errors);
    let outputs = validate_outputs(raw.outputs.as_ref(), &mut errors);

    let description = match raw.description.as_ref() {
        None | Some(Yaml::Null) => {
            errors.push(FieldError::new("description", "is required"));
            None
        }
        Some(Yaml::String(d)) if d.chars().count() > MAX_DESCRIPTION_LEN => {
            errors.push(FieldError::new(
                "description",
                format!(
                    "must be at most {} characters (got {})",
                    MAX_DESCRIPTION_LEN,
                    d.chars().count()
                ),
            ));
            None
        }
        Some(Yaml::String(d)) => Some(d.clone()),
        Some(other) => {
            errors.push(FieldError::new(
                "description",
                format!("must be a string, got {}", yaml_kind(other)),
            ));
            None
        }
    };

    let use_cases = string_list("use_cases", raw.use_cases.as_ref(), &mut errors);
    if use_cases.as_ref().is_some_and(Vec::is_empty) {
        errors.push(FieldError::new("use_cases", "must list at least one use case"));
    }
    let tags = string_list("tags", raw.tags.as_ref(), &mut errors);
    let dependencies = string_list("dependencies", raw.dependencies.as_ref(), &mut errors);

    let mut output_targets = Vec::new();
    match string_list("output_targets", raw.output_targets.as_ref(), &mut errors) {
        Some(targets) if targets.is_empty() => errors.push(FieldError::new(
            "output_targets",
            "must list at least one of stdout | file | clipboard",
        )),
        Some(targets) => {
            for (i, t) in targets.iter().enumerate() {
                match t.parse::<OutputTarget>() {
                    Ok(target) => output_targets.push(target),
                    Err(e) => errors.push(FieldError::new(format!("output_targets[{}]", i), e)),
                }
            }
        }
        None => {}
    }

    match (name, recipe_type, runtime, version, description) {
        (Some(name), Some(recipe_type), Some(runtime), Some(version), Some(description))
            if errors.is_empty() =>
        {
            Ok(RecipeMetadata {
                name,
                recipe_type,
                runtime,
                version,
                inputs,
                outputs,
                dependencies: dependencies.unwrap_or_default(),
                description,
                use_cases: use_cases.unwrap_or_default(),
                tags: tags.unwrap_or_default(),
                output_targets,
            })
        }
        _ => Err(RecipeValidationError { errors }),
    }
}

/// Parse then validate a descriptor file.
pub fn load_metadata(path: &Path) -> Result<(RecipeMetadata, String), String> {
    let descriptor = parse_descriptor_file(path).map_err(|e| e.to_string())?;
    let metadata = validate_metadata(&descriptor.metadata).map_err(|e| e.to_string())?;
    Ok((metadata, descriptor.documentation))
}

/// A required non-empty string field.
fn required_str<'a>(field: &str, value: Option<&'a Yaml>, errors: &mut Vec<FieldError>) -> Option<&'a str> {
    match value {
        None | Some(Yaml::Null) => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(Yaml::String(s)) if s.is_empty() => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(Yaml::String(s)) => Some(s),
        Some(other) => {
            errors.push(FieldError::new(
                field,
                format!("must be a string, got {}", yaml_kind(other)),
            ));
            None
        }
    }
}

fn parse_enum<T>(field: &str, value: Option<&Yaml>, errors: &mut Vec<FieldError>) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    let text = required_str(field, value, errors)?;
    match text.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.push(FieldError::new(field, e));
            None
        }
    }
}

/// Unquoted `1.10` is a YAML float and would come back as `1.1`, so only
/// strings are accepted.
fn validate_version(value: Option<&Yaml>, errors: &mut Vec<FieldError>) -> Option<String> {
    match value {
        Some(Yaml::Number(_)) => {
            errors.push(FieldError::new("version", "quote the version, e.g. \"1.10\""));
            None
        }
        other => {
            let raw = required_str("version", other, errors)?;
            if VERSION_RE.is_match(raw) {
                Some(raw.to_string())
            } else {
                errors.push(FieldError::new(
                    "version",
                    format!("'{}' must look like MAJOR.MINOR[.PATCH]", raw),
                ));
                None
            }
        }
    }
}

/// Optional list of strings. `None` when the field has the wrong shape.
fn string_list(field: &str, value: Option<&Yaml>, errors: &mut Vec<FieldError>) -> Option<Vec<String>> {
    let items = match value {
        None | Some(Yaml::Null) => return Some(Vec::new()),
        Some(Yaml::Sequence(items)) => items,
        Some(other) => {
            errors.push(FieldError::new(
                field,
                format!("must be a list of strings, got {}", yaml_kind(other)),
            ));
            return None;
        }
    };

    let mut out = Vec::with_capacity(items.len());
    let mut ok = true;
    for (i, item) in items.iter().enumerate() {
        match item {
            Yaml::String(s) => out.push(s.clone()),
            other => {
                errors.push(FieldError::new(
                    format!("{}[{}]", field, i),
                    format!("must be a string, got {}", yaml_kind(other)),
                ));
                ok = false;
            }
        }
    }
    ok.then_some(out)
}

fn validate_inputs(value: Option<&Yaml>, errors: &mut Vec<FieldError>) -> IndexMap<String, InputSpec> {
    let mut inputs = IndexMap::new();
    let decls = match value {
        None | Some(Yaml::Null) => return inputs,
        Some(Yaml::Mapping(decls)) => decls,
        Some(other) => {
            errors.push(FieldError::new(
                "inputs",
                format!("must map input names to declarations, got {}", yaml_kind(other)),
            ));
            return inputs;
        }
    };

    for (key, decl) in decls {
        let Some(input_name) = key.as_str() else {
            errors.push(FieldError::new("inputs", "input names must be strings"));
            continue;
        };
        if !decl.is_mapping() {
            errors.push(FieldError::new(
                format!("inputs.{}", input_name),
                format!("must be a mapping with a type, got {}", yaml_kind(decl)),
            ));
            continue;
        }

        let field = |suffix: &str| format!("inputs.{}.{}", input_name, suffix);
        let input_type = parse_enum::<InputType>(&field("type"), decl.get("type"), errors);
        let required = match decl.get("required") {
            None | Some(Yaml::Null) => Some(false),
            Some(Yaml::Bool(b)) => Some(*b),
            Some(other) => {
                errors.push(FieldError::new(
                    field("required"),
                    format!("must be true or false, got {}", yaml_kind(other)),
                ));
                None
            }
        };
        let default = match decl.get("default") {
            None | Some(Yaml::Null) => Some(None),
            Some(v) => match serde_json::to_value(v) {
                Ok(json) => Some(Some(json)),
                Err(e) => {
                    errors.push(FieldError::new(field("default"), e.to_string()));
                    None
                }
            },
        };
        let description = match decl.get("description") {
            None | Some(Yaml::Null) => Some(None),
            Some(Yaml::String(d)) => Some(Some(d.clone())),
            Some(other) => {
                errors.push(FieldError::new(
                    field("description"),
                    format!("must be a string, got {}", yaml_kind(other)),
                ));
                None
            }
        };

        if let (Some(input_type), Some(required), Some(default), Some(description)) =
            (input_type, required, default, description)
        {
            inputs.insert(
                input_name.to_string(),
                InputSpec {
                    input_type,
                    required,
                    default,
                    description,
                },
            );
        }
    }
    inputs
}

fn validate_outputs(value: Option<&Yaml>, errors: &mut Vec<FieldError>) -> IndexMap<String, String> {
    let mut outputs = IndexMap::new();
    let fields = match value {
        None | Some(Yaml::Null) => return outputs,
        Some(Yaml::Mapping(fields)) => fields,
        Some(other) => {
            errors.push(FieldError::new(
                "outputs",
                format!("must map field names to type descriptions, got {}", yaml_kind(other)),
            ));
            return outputs;
        }
    };

    for (key, desc) in fields {
        let Some(field_name) = key.as_str() else {
            errors.push(FieldError::new("outputs", "field names must be strings"));
            continue;
        };
        let text = match desc {
            Yaml::String(s) => s.clone(),
            Yaml::Number(n) => n.to_string(),
            Yaml::Bool(b) => b.to_string(),
            other => {
                errors.push(FieldError::new(
                    format!("outputs.{}", field_name),
                    format!("must be a type description, got {}", yaml_kind(other)),
                ));
                continue;
            }
        };
        outputs.insert(field_name.to_string(), text);
    }
    outputs
}

fn yaml_kind(value: &Yaml) -> &'static str {
    match value {
        Yaml::Null => "null",
        Yaml::Bool(_) => "a boolean",
        Yaml::Number(_) => "a number",
        Yaml::String(_) => "a string",
        Yaml::Sequence(_) => "a list",
        Yaml::Mapping(_) => "a mapping",
        Yaml::Tagged(_) => "a tagged value",
    }
}

/// True when `name` is a legal recipe identifier.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DESCRIPTOR: &str = r#"---
name: open_page
type: atomic
runtime: chrome-js
version: "1.2.0"
description: "Open a URL in the active tab"
use_cases:
  - "Navigate before scraping"
tags: [browser, navigation]
output_targets: [stdout, file]
inputs:
  url:
    type: string
    required: true
    description: "Page to open"
  wait_ms:
    type: number
    default: 500
outputs:
  title: string
  loaded: boolean
dependencies: []
---
# open_page

Opens a page and reports its title.
"#;

    fn raw(text: &str) -> RawMetadata {
        parse_descriptor(text).unwrap().metadata
    }

    #[test]
    fn test_fg002_parse_and_validate() {
        let descriptor = parse_descriptor(DESCRIPTOR).unwrap();
        assert!(descriptor.documentation.starts_with("# open_page"));

        let meta = validate_metadata(&descriptor.metadata).unwrap();
        assert_eq!(meta.name, "open_page");
        assert_eq!(meta.recipe_type, RecipeType::Atomic);
        assert_eq!(meta.runtime, Runtime::ChromeJs);
        assert_eq!(meta.version, "1.2.0");
        assert_eq!(meta.inputs.len(), 2);
        assert!(meta.inputs["url"].required);
        assert_eq!(meta.inputs["wait_ms"].default, Some(serde_json::json!(500)));
        assert_eq!(meta.outputs["title"], "string");
        assert_eq!(
            meta.output_targets,
            vec![OutputTarget::Stdout, OutputTarget::File]
        );
        assert_eq!(meta.tags, vec!["browser", "navigation"]);
    }

    #[test]
    fn test_fg002_missing_front_matter() {
        let err = parse_descriptor("# just docs\n").unwrap_err();
        assert!(matches!(err, MetadataParseError::MissingFrontMatter));
    }

    #[test]
    fn test_fg002_unterminated_front_matter() {
        let err = parse_descriptor("---\nname: x\n").unwrap_err();
        assert!(matches!(err, MetadataParseError::UnterminatedFrontMatter));
    }

    #[test]
    fn test_fg002_malformed_yaml() {
        let err = parse_descriptor("---\nname: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, MetadataParseError::Malformed(_)));
    }

    #[test]
    fn test_fg002_front_matter_must_be_mapping() {
        let err = parse_descriptor("---\n- a\n- b\n---\n").unwrap_err();
        assert!(matches!(err, MetadataParseError::Malformed(_)));
    }

    #[test]
    fn test_fg002_bom_and_crlf() {
        let text = "\u{feff}---\r\nname: a\r\n---\r\nbody\r\n";
        let descriptor = parse_descriptor(text).unwrap();
        let name = descriptor.metadata.name.as_ref().and_then(Yaml::as_str);
        assert_eq!(name, Some("a"));
        assert_eq!(descriptor.documentation, "body");
    }

    #[test]
    fn test_fg002_empty_front_matter_reports_all_required() {
        let err = validate_metadata(&raw("---\n---\n")).unwrap_err();
        let fields = err.fields();
        for expected in [
            "name",
            "type",
            "runtime",
            "version",
            "description",
            "use_cases",
            "output_targets",
        ] {
            assert!(fields.contains(&expected), "missing {} in {:?}", expected, fields);
        }
    }

    #[test]
    fn test_fg002_unquoted_version_rejected() {
        let text = DESCRIPTOR.replace("version: \"1.2.0\"", "version: 1.10");
        let err = validate_metadata(&raw(&text)).unwrap_err();
        assert_eq!(err.fields(), vec!["version"]);
        assert!(err.errors[0].message.contains("quote the version"));
    }

    #[test]
    fn test_fg002_wrong_shapes_reported_with_other_fields() {
        let text = DESCRIPTOR
            .replace("use_cases:\n  - \"Navigate before scraping\"", "use_cases: just one")
            .replace("version: \"1.2.0\"", "version: v1")
            .replace("tags: [browser, navigation]", "tags: [browser, 7]")
            .replace("required: true", "required: maybe");
        let descriptor = parse_descriptor(&text).unwrap();
        let err = validate_metadata(&descriptor.metadata).unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["version", "inputs.url.required", "use_cases", "tags[1]"]
        );
    }

    #[test]
    fn test_fg002_non_mapping_inputs_and_outputs() {
        let text = DESCRIPTOR
            .replace("dependencies: []", "dependencies: step_one")
            .replace("outputs:\n  title: string\n  loaded: boolean\n", "outputs: [title]\n");
        let err = validate_metadata(&raw(&text)).unwrap_err();
        assert_eq!(err.fields(), vec!["outputs", "dependencies"]);
    }

    #[test]
    fn test_fg002_scalar_name_rejected() {
        let text = DESCRIPTOR.replace("name: open_page", "name: 42");
        let err = validate_metadata(&raw(&text)).unwrap_err();
        assert_eq!(err.fields(), vec!["name"]);
        assert!(err.errors[0].message.contains("a number"));
    }

    #[test]
    fn test_fg002_bad_version() {
        let text = DESCRIPTOR.replace("version: \"1.2.0\"", "version: \"v1\"");
        let err = validate_metadata(&raw(&text)).unwrap_err();
        assert_eq!(err.fields(), vec!["version"]);
    }

    #[test]
    fn test_fg002_bad_enums_all_reported() {
        let text = DESCRIPTOR
            .replace("type: atomic", "type: pipeline")
            .replace("runtime: chrome-js", "runtime: ruby")
            .replace("output_targets: [stdout, file]", "output_targets: [stdout, printer]");
        let err = validate_metadata(&raw(&text)).unwrap_err();
        assert_eq!(err.fields(), vec!["type", "runtime", "output_targets[1]"]);
    }

    #[test]
    fn test_fg002_bad_input_type() {
        let text = DESCRIPTOR.replace("type: number", "type: integer");
        let err = validate_metadata(&raw(&text)).unwrap_err();
        assert_eq!(err.fields(), vec!["inputs.wait_ms.type"]);
    }

    #[test]
    fn test_fg002_description_length_boundary() {
        let ok = DESCRIPTOR.replace(
            "\"Open a URL in the active tab\"",
            &format!("\"{}\"", "d".repeat(MAX_DESCRIPTION_LEN)),
        );
        assert!(validate_metadata(&raw(&ok)).is_ok());

        let long = DESCRIPTOR.replace(
            "\"Open a URL in the active tab\"",
            &format!("\"{}\"", "d".repeat(MAX_DESCRIPTION_LEN + 1)),
        );
        let err = validate_metadata(&raw(&long)).unwrap_err();
        assert_eq!(err.fields(), vec!["description"]);
    }

    #[test]
    fn test_fg002_empty_use_cases_and_targets() {
        let text = DESCRIPTOR
            .replace("use_cases:\n  - \"Navigate before scraping\"", "use_cases: []")
            .replace("output_targets: [stdout, file]", "output_targets: []");
        let err = validate_metadata(&raw(&text)).unwrap_err();
        assert_eq!(err.fields(), vec!["use_cases", "output_targets"]);
    }

    #[test]
    fn test_fg002_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("open_page.md");
        std::fs::write(&path, DESCRIPTOR).unwrap();
        let (meta, docs) = load_metadata(&path).unwrap();
        assert_eq!(meta.name, "open_page");
        assert!(docs.contains("reports its title"));
    }

    #[test]
    fn test_fg002_parse_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_descriptor_file(&dir.path().join("nope.md")).unwrap_err();
        assert!(matches!(err, MetadataParseError::Io { .. }));
        assert!(err.to_string().contains("nope.md"));
    }

    proptest! {
        #[test]
        fn prop_fg002_valid_names_accepted(name in "[A-Za-z0-9_-]{1,32}") {
            let text = DESCRIPTOR.replace("name: open_page", &format!("name: \"{}\"", name));
            let meta = validate_metadata(&raw(&text)).unwrap();
            prop_assert_eq!(meta.name, name);
        }

        #[test]
        fn prop_fg002_names_with_illegal_chars_rejected(
            prefix in "[a-z]{1,8}",
            bad in "[ ./:@!]",
        ) {
            let name = format!("{}{}x", prefix, bad);
            let text = DESCRIPTOR.replace("name: open_page", &format!("name: \"{}\"", name));
            let err = validate_metadata(&raw(&text)).unwrap_err();
            prop_assert_eq!(err.fields(), vec!["name"]);
        }

        #[test]
        fn prop_fg002_semver_versions_accepted(
            major in 0u32..100,
            minor in 0u32..100,
            patch in proptest::option::of(0u32..100),
        ) {
            let version = match patch {
                Some(p) => format!("{}.{}.{}", major, minor, p),
                None => format!("{}.{}", major, minor),
            };
            let text = DESCRIPTOR.replace("\"1.2.0\"", &format!("\"{}\"", version));
            let meta = validate_metadata(&raw(&text)).unwrap();
            prop_assert_eq!(meta.version, version);
        }
    }
}
