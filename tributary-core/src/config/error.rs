//! Configuration errors
//!
//! Validation failures carry the dotted path of the offending field so a bad
//! adapter file can be fixed without guessing.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config from '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in '{path}' at line {}, column {}: {message}",
            .line.unwrap_or(0), .column.unwrap_or(0))]
    ParseError {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("Unsupported config format '{extension}' for '{path}' (expected yaml, yml or json)")]
    UnsupportedFormat { path: String, extension: String },

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Environment variable '{var}' not found")]
    EnvVarNotFound { var: String },
}

/// A rejected field, e.g. `stream.sentinel`
#[derive(Debug, Error)]
pub struct ValidationError {
    pub field_path: String,
    pub kind: ValidationErrorKind,
    /// Hint for fixing the value
    pub hint: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.field_path, self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("required field is missing or empty")]
    Missing,

    #[error("value out of range: {message}")]
    OutOfRange { message: String },

    #[error("invalid value: {message}")]
    Invalid { message: String },

    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("unsupported config version: expected {expected}, got {actual}")]
    InvalidVersion { expected: String, actual: String },

    #[error("unresolved environment variable placeholder '${{{var}}}'")]
    UnresolvedPlaceholder { var: String },
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn missing(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::Missing)
    }

    pub fn out_of_range(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::OutOfRange {
                message: message.into(),
            },
        )
    }

    pub fn invalid(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::Invalid {
                message: message.into(),
            },
        )
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::missing("stream.sentinel").with_hint("use \"[DONE]\"");
        assert_eq!(
            err.to_string(),
            "'stream.sentinel': required field is missing or empty (use \"[DONE]\")"
        );
    }

    #[test]
    fn test_placeholder_display() {
        let err = ValidationError::new(
            "api_key",
            ValidationErrorKind::UnresolvedPlaceholder {
                var: "OPENAI_API_KEY".into(),
            },
        );
        assert!(err.to_string().contains("${OPENAI_API_KEY}"));
    }
}
