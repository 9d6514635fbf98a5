//! FG-004: Parameter validation and coercion against a recipe's declared inputs.
//!
//! Required inputs must be present and non-empty. Present values are coerced
//! toward their declared type: numeric strings become numbers, JSON strings
//! become arrays/objects, booleans and strings pass through. Absent optional
//! inputs take their declared default. Undeclared parameters are forwarded
//! untouched.

use super::types::{InputType, RecipeMetadata};
use serde_json::{Map, Value};
use std::fmt;

/// A single rejected parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamIssue {
    Missing { field: String },
    WrongType { field: String, expected: InputType, detail: String },
}

impl ParamIssue {
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field } | Self::WrongType { field, .. } => field,
        }
    }
}

impl fmt::Display for ParamIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "missing required parameter '{}'", field),
            Self::WrongType {
                field,
                expected,
                detail,
            } => write!(f, "parameter '{}' must be {} ({})", field, expected, detail),
        }
    }
}

/// All parameter problems found for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.issues))]
pub struct ParamError {
    pub issues: Vec<ParamIssue>,
}

impl ParamError {
    /// Offending field names: missing ones first, then type failures.
    pub fn fields(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.field().to_string()).collect()
    }

    pub fn missing(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter_map(|i| match i {
                ParamIssue::Missing { field } => Some(field.as_str()),
                ParamIssue::WrongType { .. } => None,
            })
            .collect()
    }
}

fn summarize(issues: &[ParamIssue]) -> String {
    let missing: Vec<&str> = issues
        .iter()
        .filter_map(|i| match i {
            ParamIssue::Missing { field } => Some(field.as_str()),
            ParamIssue::WrongType { .. } => None,
        })
        .collect();

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!(
            "missing required parameter(s): {}",
            missing.join(", ")
        ));
    }
    for issue in issues {
        if matches!(issue, ParamIssue::WrongType { .. }) {
            parts.push(issue.to_string());
        }
    }
    parts.join("; ")
}

/// Validate `provided` against `metadata.inputs`, returning the coerced map
/// that is handed to the executor.
pub fn validate_params(
    metadata: &RecipeMetadata,
    provided: &Map<String, Value>,
) -> Result<Map<String, Value>, ParamError> {
    let mut missing = Vec::new();
    let mut wrong = Vec::new();
    let mut resolved = Map::new();

    for (name, spec) in &metadata.inputs {
        match provided.get(name).filter(|v| !is_empty(v)) {
            Some(value) => match coerce(spec.input_type, value) {
                Ok(v) => {
                    resolved.insert(name.clone(), v);
                }
                Err(detail) => wrong.push(ParamIssue::WrongType {
                    field: name.clone(),
                    expected: spec.input_type,
                    detail,
                }),
            },
            None if spec.required => missing.push(ParamIssue::Missing {
                field: name.clone(),
            }),
            None => {
                if let Some(ref default) = spec.default {
                    resolved.insert(name.clone(), default.clone());
                }
            }
        }
    }

    if !missing.is_empty() || !wrong.is_empty() {
        missing.extend(wrong);
        return Err(ParamError { issues: missing });
    }

    for (name, value) in provided {
        if !metadata.inputs.contains_key(name) {
            resolved.insert(name.clone(), value.clone());
        }
    }

    Ok(resolved)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Coerce one value toward its declared type.
fn coerce(expected: InputType, value: &Value) -> Result<Value, String> {
    match expected {
        InputType::String | InputType::Boolean => Ok(value.clone()),
        InputType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => parse_number(s.trim())
                .ok_or_else(|| format!("'{}' is not numeric", s)),
            other => Err(format!("got {}", kind(other))),
        },
        InputType::Array => decode_structured(value, "array", Value::is_array),
        InputType::Object => decode_structured(value, "object", Value::is_object),
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn decode_structured(
    value: &Value,
    label: &str,
    is_kind: fn(&Value) -> bool,
) -> Result<Value, String> {
    if is_kind(value) {
        return Ok(value.clone());
    }
    match value {
        Value::String(s) => {
            let decoded: Value =
                serde_json::from_str(s).map_err(|e| format!("invalid JSON: {}", e))?;
            if is_kind(&decoded) {
                Ok(decoded)
            } else {
                Err(format!("JSON decodes to {}, not {}", kind(&decoded), label))
            }
        }
        other => Err(format!("got {}", kind(other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::{parse_descriptor, validate_metadata};
    use serde_json::json;

    fn metadata() -> RecipeMetadata {
        let text = r#"---
name: fill_form
type: atomic
runtime: python
version: "1.0"
description: "Fill a form"
use_cases: ["forms"]
output_targets: [stdout]
inputs:
  url:
    type: string
    required: true
  count:
    type: number
    default: 3
  fields:
    type: object
  selectors:
    type: array
  headless:
    type: boolean
    default: true
---
"#;
        validate_metadata(&parse_descriptor(text).unwrap().metadata).unwrap()
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_fg004_defaults_applied() {
        let out = validate_params(&metadata(), &params(json!({"url": "https://x"}))).unwrap();
        assert_eq!(out["url"], json!("https://x"));
        assert_eq!(out["count"], json!(3));
        assert_eq!(out["headless"], json!(true));
        assert!(!out.contains_key("fields"));
    }

    #[test]
    fn test_fg004_missing_required() {
        let err = validate_params(&metadata(), &Map::new()).unwrap_err();
        assert_eq!(err.fields(), vec!["url"]);
        assert_eq!(err.missing(), vec!["url"]);
        assert!(err.to_string().contains("missing required parameter(s): url"));
    }

    #[test]
    fn test_fg004_empty_string_counts_as_missing() {
        let err = validate_params(&metadata(), &params(json!({"url": ""}))).unwrap_err();
        assert_eq!(err.missing(), vec!["url"]);
        let err = validate_params(&metadata(), &params(json!({"url": null}))).unwrap_err();
        assert_eq!(err.missing(), vec!["url"]);
    }

    #[test]
    fn test_fg004_numeric_string_coerced() {
        let out =
            validate_params(&metadata(), &params(json!({"url": "u", "count": "42"}))).unwrap();
        assert_eq!(out["count"], json!(42));
        let out =
            validate_params(&metadata(), &params(json!({"url": "u", "count": "2.5"}))).unwrap();
        assert_eq!(out["count"], json!(2.5));
    }

    #[test]
    fn test_fg004_non_numeric_rejected() {
        let err = validate_params(&metadata(), &params(json!({"url": "u", "count": "many"})))
            .unwrap_err();
        assert_eq!(err.fields(), vec!["count"]);
        assert!(err.to_string().contains("must be number"));
    }

    #[test]
    fn test_fg004_structured_strings_decoded() {
        let out = validate_params(
            &metadata(),
            &params(json!({
                "url": "u",
                "fields": "{\"a\": 1}",
                "selectors": "[\"#a\", \"#b\"]"
            })),
        )
        .unwrap();
        assert_eq!(out["fields"], json!({"a": 1}));
        assert_eq!(out["selectors"], json!(["#a", "#b"]));
    }

    #[test]
    fn test_fg004_structured_wrong_shape() {
        let err = validate_params(
            &metadata(),
            &params(json!({"url": "u", "fields": "[1, 2]", "selectors": "not json"})),
        )
        .unwrap_err();
        assert_eq!(err.fields(), vec!["fields", "selectors"]);
        let msg = err.to_string();
        assert!(msg.contains("not object"));
        assert!(msg.contains("invalid JSON"));
    }

    #[test]
    fn test_fg004_missing_and_wrong_reported_together() {
        let err =
            validate_params(&metadata(), &params(json!({"count": "x"}))).unwrap_err();
        assert_eq!(err.fields(), vec!["url", "count"]);
    }

    #[test]
    fn test_fg004_boolean_and_extra_pass_through() {
        let out = validate_params(
            &metadata(),
            &params(json!({"url": "u", "headless": "false", "trace": true})),
        )
        .unwrap();
        assert_eq!(out["headless"], json!("false"));
        assert_eq!(out["trace"], json!(true));
    }
}
