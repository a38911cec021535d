//! Environment variable interpolation for configuration files
//!
//! Only `${VAR}` references written explicitly in a configuration file are
//! resolved. The adapter never probes the environment on its own.

use super::error::ConfigError;
use super::schema::AdapterConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Pattern matching `${VAR}` placeholders
pub(crate) fn env_var_pattern() -> &'static Regex {
    &ENV_VAR_PATTERN
}

/// Interpolate environment variables in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = content.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];

        match env::var(var_name) {
            Ok(value) => {
                result = result.replace(full_match, &value);
            }
            Err(_) => {
                return Err(ConfigError::EnvVarNotFound {
                    var: var_name.to_string(),
                });
            }
        }
    }

    Ok(result)
}

/// Interpolate any placeholder left in the string fields of a loaded config
pub fn interpolate_config_env_vars(config: &mut AdapterConfig) -> Result<(), ConfigError> {
    if let Some(api_key) = &config.api_key {
        let raw = api_key.expose_secret();
        if ENV_VAR_PATTERN.is_match(raw) {
            config.api_key = Some(SecretString::new(interpolate_env_vars(raw)?));
        }
    }

    if ENV_VAR_PATTERN.is_match(&config.base_url) {
        config.base_url = interpolate_env_vars(&config.base_url)?;
    }

    if let Some(org) = &config.organization_id {
        if ENV_VAR_PATTERN.is_match(org) {
            config.organization_id = Some(interpolate_env_vars(org)?);
        }
    }

    Ok(())
}
