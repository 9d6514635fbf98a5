//! FG-008: Discovery and lookup errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// A descriptor could not be read as front matter + YAML.
#[derive(Debug, thiserror::Error)]
pub enum MetadataParseError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("missing front-matter block (expected a leading `---` line)")]
    MissingFrontMatter,

    #[error("front-matter block is not closed by a `---` line")]
    UnterminatedFrontMatter,

    #[error("front matter is not well-formed key/value data: {0}")]
    Malformed(String),
}

/// One violated metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every metadata field that failed validation, collected in one pass.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid recipe metadata ({} error(s)): {}", .errors.len(), join_fields(.errors))]
pub struct RecipeValidationError {
    pub errors: Vec<FieldError>,
}

impl RecipeValidationError {
    /// Names of the offending fields, in report order.
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Metadata could not be bound to its script.
#[derive(Debug, thiserror::Error)]
pub enum RecipeBindError {
    #[error("recipe name '{name}' does not match script file name '{stem}'")]
    NameMismatch { name: String, stem: String },

    #[error("{} does not exist or is not a file", .0.display())]
    MissingFile(PathBuf),
}

/// Lookup of an unknown recipe name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("recipe '{name}' not found (searched: {})", display_paths(.searched))]
pub struct RecipeNotFoundError {
    pub name: String,
    pub searched: Vec<PathBuf>,
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no search paths".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fg008_validation_error_lists_every_field() {
        let err = RecipeValidationError {
            errors: vec![
                FieldError::new("name", "must match ^[A-Za-z0-9_-]+$"),
                FieldError::new("version", "must look like MAJOR.MINOR[.PATCH]"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 error(s)"));
        assert!(msg.contains("name: must match"));
        assert!(msg.contains("version: must look like"));
        assert_eq!(err.fields(), vec!["name", "version"]);
    }

    #[test]
    fn test_fg008_not_found_lists_roots() {
        let err = RecipeNotFoundError {
            name: "ghost".to_string(),
            searched: vec![PathBuf::from("/a"), PathBuf::from("/b")],
        };
        assert_eq!(
            err.to_string(),
            "recipe 'ghost' not found (searched: /a, /b)"
        );
    }

    #[test]
    fn test_fg008_not_found_without_roots() {
        let err = RecipeNotFoundError {
            name: "ghost".to_string(),
            searched: vec![],
        };
        assert!(err.to_string().contains("no search paths"));
    }
}
