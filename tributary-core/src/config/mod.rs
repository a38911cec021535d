//! Configuration module
//!
//! This module provides the configuration schema, file loaders, validation,
//! secret handling and the [`ConfigStore`] collaborator the adapter reads its
//! settings and API key from.

mod env;
mod error;
mod schema;
mod secrets;
mod store;
mod validator;

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    AdapterConfig, AnalysisConfig, ConnectionConfig, StreamConfig, CONFIG_VERSION,
};
pub use secrets::{SafeLogging, SecretString};
pub use store::{terminal_prompt, ConfigStore, MemoryConfigStore, TerminalPrompt, API_KEY};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<AdapterConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    let interpolated = env::interpolate_env_vars(&content)?;

    let mut config: AdapterConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    env::interpolate_config_env_vars(&mut config)?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<AdapterConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    let interpolated = env::interpolate_env_vars(&content)?;

    let mut config: AdapterConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    env::interpolate_config_env_vars(&mut config)?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration, picking the format from the file extension.
///
/// Files without an extension are read as YAML.
pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<AdapterConfig> {
    let path = path.as_ref();
    match path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()) {
        Some(ext) if ext == "json" => load_from_json(path),
        Some(ext) if ext == "yaml" || ext == "yml" => load_from_yaml(path),
        None => load_from_yaml(path),
        Some(ext) => Err(ConfigError::UnsupportedFormat {
            path: path.to_string_lossy().to_string(),
            extension: ext,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
version: "0.1"
default_model: gpt-4o
stream:
  sentinel: "[DONE]"
"#;
        let config: AdapterConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.stream.data_prefix, "data:");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        match load("adapter.toml") {
            Err(ConfigError::UnsupportedFormat { extension, .. }) => assert_eq!(extension, "toml"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "version: \"0.1\"\nretry_policy: aggressive\n";
        let config: Result<AdapterConfig, _> = serde_yaml::from_str(yaml);
        assert!(config.is_err());
    }
}
