//! OpenAI provider implementation

use super::converter::{from_openai_response, to_openai_body};
use crate::config::{AdapterConfig, SecretString};
use crate::protocol::{CompletionRequest, CompletionText};
use crate::providers::{Provider, ProviderResult};
use serde_json::Value;

/// Default OpenAI API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI (and OpenAI-compatible) chat completions provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    base_url: String,
    organization_id: Option<String>,
}

impl OpenAIProvider {
    /// Create a provider for the public OpenAI API
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a provider for an OpenAI-compatible endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            organization_id: None,
        }
    }

    /// Create a provider from adapter settings
    pub fn from_config(config: &AdapterConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            organization_id: config.organization_id.clone(),
        }
    }

    /// Send requests on behalf of an organization
    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self, api_key: &SecretString) -> Vec<(String, String)> {
        let mut headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", api_key.expose_secret()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];

        if let Some(org) = self.organization_id.as_deref().filter(|o| !o.is_empty()) {
            headers.push(("OpenAI-Organization".to_string(), org.to_string()));
        }

        headers
    }

    fn encode_request(&self, request: &CompletionRequest) -> ProviderResult<Value> {
        to_openai_body(request)
    }

    fn decode_response(&self, body: &str) -> ProviderResult<CompletionText> {
        from_openai_response(body)
    }
}
