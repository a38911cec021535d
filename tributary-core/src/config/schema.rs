//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::{SafeLogging, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema version understood by this crate
pub const CONFIG_VERSION: &str = "0.1";

/// Root configuration structure for the adapter
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfig {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: String,

    /// API key (supports environment variable interpolation in files)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Base URL for the provider API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional organization header value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// Model used when a call does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Stream framing settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Code analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Custom metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds (whole-response calls)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,

    /// Maximum size of a whole-response body in bytes
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

/// Wire framing of the streaming protocol.
///
/// Providers differ slightly in how they frame server-sent events, so the
/// prefix and the termination token are configurable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Prefix stripped from each data line
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,

    /// Payload that terminates the stream (case-sensitive)
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Line prefixes that carry no data (comments, event names, ids)
    #[serde(default = "default_ignored_prefixes")]
    pub ignored_prefixes: Vec<String>,

    /// Longest line accepted from the wire before the transport fails
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            data_prefix: default_data_prefix(),
            sentinel: default_sentinel(),
            ignored_prefixes: default_ignored_prefixes(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

/// Settings for the structured code analysis mode
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Model override for analysis calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum tokens for the analysis answer
    #[serde(default = "default_analysis_max_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature for analysis calls
    #[serde(default)]
    pub temperature: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: default_analysis_max_tokens(),
            temperature: 0.0,
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            api_key: None,
            base_url: default_base_url(),
            organization_id: None,
            default_model: default_model(),
            connection: ConnectionConfig::default(),
            stream: StreamConfig::default(),
            analysis: AnalysisConfig::default(),
            metadata: HashMap::new(),
        }
    }
}

// Default value functions for serde
fn default_version() -> String { CONFIG_VERSION.to_string() }
fn default_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_connect_timeout() -> u64 { 10_000 }
fn default_request_timeout() -> u64 { 120_000 }
fn default_max_idle() -> usize { 10 }
fn default_max_response_bytes() -> usize { 10 * 1024 * 1024 }
fn default_data_prefix() -> String { "data:".to_string() }
fn default_sentinel() -> String { "[DONE]".to_string() }
fn default_ignored_prefixes() -> Vec<String> {
    [":", "event:", "id:", "retry:"].iter().map(|p| p.to_string()).collect()
}
fn default_max_line_bytes() -> usize { 1024 * 1024 }
fn default_analysis_max_tokens() -> usize { 2048 }

impl AdapterConfig {
    /// Builder-style API key setter
    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Builder-style base URL setter
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder-style default model setter
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Model used for code analysis calls
    pub fn analysis_model(&self) -> &str {
        self.analysis
            .model
            .as_deref()
            .unwrap_or(&self.default_model)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::missing("version"));
        }

        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: CONFIG_VERSION.to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        if self.base_url.is_empty() {
            return Err(ValidationError::missing("base_url"));
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::new(
                        "base_url",
                        ValidationErrorKind::InvalidUrl {
                            message: format!(
                                "URL scheme must be http or https, got: {}",
                                url.scheme()
                            ),
                        },
                    ));
                }
            }
            Err(e) => {
                return Err(ValidationError::new(
                    "base_url",
                    ValidationErrorKind::InvalidUrl {
                        message: e.to_string(),
                    },
                ));
            }
        }

        if self.default_model.trim().is_empty() {
            return Err(ValidationError::missing("default_model"));
        }

        self.connection.validate("connection")?;
        self.stream.validate("stream")?;
        self.analysis.validate("analysis")?;

        Ok(())
    }
}

impl ConnectionConfig {
    /// Validate connection settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.connect_timeout_ms", path),
                "Must be greater than 0",
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.request_timeout_ms", path),
                "Must be greater than 0",
            ));
        }

        if self.max_response_bytes == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_response_bytes", path),
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl StreamConfig {
    /// Validate stream framing
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.sentinel.trim().is_empty() {
            return Err(ValidationError::missing(format!("{}.sentinel", path))
                .with_hint("set the end-of-stream marker, e.g. [DONE]"));
        }

        if self.max_line_bytes == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_line_bytes", path),
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl AnalysisConfig {
    /// Validate analysis settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.max_tokens == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_tokens", path),
                "Must be greater than 0",
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::out_of_range(
                format!("{}.temperature", path),
                "Must be between 0.0 and 2.0",
            ));
        }

        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(ValidationError::invalid(
                    format!("{}.model", path),
                    "Must not be blank when set",
                ));
            }
        }

        Ok(())
    }
}

impl SafeLogging for AdapterConfig {
    fn safe_for_logging(&self) -> String {
        let key = self
            .api_key
            .as_ref()
            .map(|k| k.partial_redact())
            .unwrap_or_else(|| "[NONE]".to_string());
        format!(
            "base_url={} default_model={} api_key={} sentinel={:?}",
            self.base_url, self.default_model, key, self.stream.sentinel
        )
    }
}
