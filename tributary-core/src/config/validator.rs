//! Configuration validation utilities

use super::env::env_var_pattern;
use super::error::{ValidationError, ValidationErrorKind};
use super::schema::AdapterConfig;

/// Rules that span several fields, run after the per-section checks
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &AdapterConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_unresolved_placeholders(config)?;
        self.validate_framing(config)?;

        Ok(())
    }

    /// Placeholders that survived interpolation mean the file was not loaded
    /// through the interpolating loaders
    fn validate_unresolved_placeholders(
        &self,
        config: &AdapterConfig,
    ) -> Result<(), ValidationError> {
        if let Some(api_key) = &config.api_key {
            check_placeholder("api_key", api_key.expose_secret())?;
        }
        check_placeholder("base_url", &config.base_url)?;
        check_placeholder("default_model", &config.default_model)?;
        if let Some(model) = &config.analysis.model {
            check_placeholder("analysis.model", model)?;
        }

        Ok(())
    }

    /// The data prefix must not be swallowed by an ignored prefix, and the
    /// sentinel must not itself look like framing
    fn validate_framing(&self, config: &AdapterConfig) -> Result<(), ValidationError> {
        let stream = &config.stream;

        for (i, ignored) in stream.ignored_prefixes.iter().enumerate() {
            if ignored.is_empty() {
                return Err(ValidationError::invalid(
                    format!("stream.ignored_prefixes[{}]", i),
                    "empty prefix would ignore every line",
                ));
            }

            if !stream.data_prefix.is_empty() && stream.data_prefix.starts_with(ignored.as_str()) {
                return Err(ValidationError::invalid(
                    format!("stream.ignored_prefixes[{}]", i),
                    format!("'{}' shadows the data prefix '{}'", ignored, stream.data_prefix),
                ));
            }
        }

        if !stream.data_prefix.is_empty() && stream.sentinel.starts_with(&stream.data_prefix) {
            return Err(ValidationError::invalid(
                "stream.sentinel",
                "sentinel must be given without the data prefix",
            ));
        }

        Ok(())
    }
}

fn check_placeholder(field: &str, value: &str) -> Result<(), ValidationError> {
    match env_var_pattern().captures(value) {
        Some(caps) => Err(ValidationError::new(
            field,
            ValidationErrorKind::UnresolvedPlaceholder {
                var: caps[1].to_string(),
            },
        )),
        None => Ok(()),
    }
}
