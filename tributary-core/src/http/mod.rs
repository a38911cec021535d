//! HTTP transport layer
//!
//! The adapter talks to the network only through the [`Transport`] trait:
//! - `send` performs a whole-response round trip
//! - `open_stream` returns a [`StreamHandle`] that yields one
//!   [`RawStreamUnit`] (wire line) per pull and can be closed explicitly
//!
//! [`client::HttpClient`] is the `reqwest` implementation. Tests substitute
//! in-memory transports.

pub mod client;
pub mod error;

use crate::providers::ProviderResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Type of API call being made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// Chat completion request
    Chat,
}

impl CallKind {
    /// Get the endpoint path for this call kind
    pub fn endpoint(&self) -> &'static str {
        match self {
            CallKind::Chat => "/chat/completions",
        }
    }
}

/// A request ready to be put on the wire
#[derive(Clone)]
pub struct HttpRequest {
    /// Full URL
    pub url: String,

    /// Header name/value pairs
    pub headers: Vec<(String, String)>,

    /// JSON body
    pub body: serde_json::Value,

    /// Correlation id, also sent as `X-Request-ID`
    pub request_id: Uuid,

    /// Round-trip timeout for whole-response calls
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Create a POST request with a fresh request id
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the round-trip timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Look up a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("request_id", &self.request_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A whole response as received
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Headers, names lowercased
    pub headers: HashMap<String, String>,

    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Response with a status and body and no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One unit of the streaming wire protocol (a single line)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStreamUnit(String);

impl RawStreamUnit {
    /// Wrap a line
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    /// Decode a line from bytes, replacing invalid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Line text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawStreamUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RawStreamUnit {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}

/// An open streaming response
#[async_trait]
pub trait StreamHandle: Send {
    /// Pull the next unit. `None` means the transport is exhausted.
    async fn next_unit(&mut self) -> Option<ProviderResult<RawStreamUnit>>;

    /// Release the underlying connection
    fn close(&mut self);
}

/// Network collaborator used by the adapter
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a whole-response request. Non-2xx statuses are returned, not
    /// raised.
    async fn send(&self, request: HttpRequest) -> ProviderResult<HttpResponse>;

    /// Open a streaming request. Non-2xx statuses are mapped to errors.
    async fn open_stream(&self, request: HttpRequest) -> ProviderResult<Box<dyn StreamHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest::post("http://x", json!({}))
            .with_header("Authorization", "Bearer k");
        assert_eq!(request.header("authorization"), Some("Bearer k"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn test_debug_hides_header_values() {
        let request = HttpRequest::post("http://x", json!({}))
            .with_header("Authorization", "Bearer sk-secret");
        let debug = format!("{:?}", request);
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_raw_unit_lossy_decoding() {
        let unit = RawStreamUnit::from_bytes(b"data: \xff{}");
        assert!(unit.as_str().starts_with("data: "));
        assert!(unit.as_str().ends_with("{}"));
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(CallKind::Chat.endpoint(), "/chat/completions");
    }
}
