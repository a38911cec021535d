//! Provider adapter trait
//!
//! A provider knows where its API lives, how to authenticate, and how to move
//! canonical requests and responses to and from its wire format.

use crate::config::SecretString;
use crate::http::{CallKind, HttpRequest};
use crate::protocol::{CompletionRequest, CompletionText};
use crate::providers::ProviderResult;
use serde_json::Value;

/// Core provider trait that all LLM providers must implement
pub trait Provider: Send + Sync {
    /// Get the provider's name
    fn name(&self) -> &str;

    /// Get the base URL for this provider
    fn base_url(&self) -> &str;

    /// Get the endpoint path for a specific call kind
    fn endpoint(&self, call_kind: CallKind) -> &str {
        call_kind.endpoint()
    }

    /// Get headers required for this provider
    fn headers(&self, api_key: &SecretString) -> Vec<(String, String)>;

    /// Encode a canonical request as the provider's JSON body
    fn encode_request(&self, request: &CompletionRequest) -> ProviderResult<Value>;

    /// Decode a successful whole-response body
    fn decode_response(&self, body: &str) -> ProviderResult<CompletionText>;

    /// Assemble the HTTP request for a call
    fn build_http_request(
        &self,
        call_kind: CallKind,
        request: &CompletionRequest,
        api_key: &SecretString,
    ) -> ProviderResult<HttpRequest> {
        let url = format!(
            "{}{}",
            self.base_url().trim_end_matches('/'),
            self.endpoint(call_kind)
        );
        let body = self.encode_request(request)?;

        Ok(self
            .headers(api_key)
            .into_iter()
            .fold(HttpRequest::post(url, body), |req, (name, value)| {
                req.with_header(name, value)
            }))
    }
}
