//! HTTP error mapping utilities

use crate::providers::ProviderError;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Map a non-success status and its body to a ProviderError
pub fn map_http_error(
    status: u16,
    headers: &HashMap<String, String>,
    body: Option<&str>,
    request_id: Uuid,
) -> ProviderError {
    let error_details = body
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_details(&v));

    let error_message = error_details
        .as_ref()
        .map(|d| d.message.clone())
        .or_else(|| body.filter(|b| !b.trim().is_empty()).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP error {}", status));

    let message_with_id = format!("{} [request_id: {}]", error_message, request_id);

    match status {
        401 | 403 => ProviderError::Authentication(message_with_id),

        429 => {
            let retry_after = headers
                .get("retry-after")
                .and_then(|v| parse_retry_after(v))
                .or_else(|| {
                    error_details
                        .as_ref()
                        .and_then(|d| d.retry_after_seconds)
                        .map(Duration::from_secs)
                });
            ProviderError::RateLimit { retry_after }
        }

        400 | 422 => ProviderError::InvalidRequest(message_with_id),

        404 => ProviderError::ModelNotFound(
            extract_model_from_error(&error_message).unwrap_or(message_with_id),
        ),

        408 | 504 => ProviderError::Timeout,

        500..=599 => ProviderError::ServerError {
            status,
            message: message_with_id,
        },

        _ => ProviderError::Api {
            code: error_details
                .and_then(|d| d.code)
                .unwrap_or_else(|| format!("HTTP_{}", status)),
            message: message_with_id,
        },
    }
}

/// Error details extracted from response body
struct ErrorDetails {
    message: String,
    code: Option<String>,
    retry_after_seconds: Option<u64>,
}

/// Extract error details from JSON response
fn extract_error_details(json: &Value) -> Option<ErrorDetails> {
    // { "error": { "message": "...", "type": "...", "code": "..." } }
    if let Some(error) = json.get("error") {
        if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
            let code = error
                .get("code")
                .and_then(|v| v.as_str())
                .or_else(|| error.get("type").and_then(|v| v.as_str()))
                .map(str::to_string);
            return Some(ErrorDetails {
                message: message.to_string(),
                code,
                retry_after_seconds: error.get("retry_after").and_then(|v| v.as_u64()),
            });
        }

        if let Some(message) = error.as_str() {
            return Some(ErrorDetails {
                message: message.to_string(),
                code: None,
                retry_after_seconds: None,
            });
        }
    }

    // { "message": "..." }
    json.get("message")
        .and_then(|v| v.as_str())
        .map(|message| ErrorDetails {
            message: message.to_string(),
            code: None,
            retry_after_seconds: json.get("retry_after").and_then(|v| v.as_u64()),
        })
}

/// Try to extract model name from error message
fn extract_model_from_error(message: &str) -> Option<String> {
    for quote in ['\'', '"', '`'] {
        let needle = format!("model {}", quote);
        if let Some(start) = message.find(&needle) {
            let start = start + needle.len();
            if let Some(end) = message[start..].find(quote) {
                return Some(message[start..start + end].to_string());
            }
        }
    }

    None
}

/// Parse Retry-After header value given in seconds
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    header_value
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
