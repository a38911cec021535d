//! Per-unit decoding of the line-framed streaming protocol

use crate::config::StreamConfig;
use crate::http::RawStreamUnit;
use crate::providers::openai::types::{OpenAIError, OpenAIStreamChunk};
use serde::Deserialize;
use thiserror::Error;

/// Line framing of a streamed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFraming {
    data_prefix: String,
    sentinel: String,
    ignored_prefixes: Vec<String>,
}

impl StreamFraming {
    /// Framing with the given data prefix and end-of-stream sentinel.
    ///
    /// Uses the default ignored prefixes.
    pub fn new(data_prefix: impl Into<String>, sentinel: impl Into<String>) -> Self {
        Self {
            data_prefix: data_prefix.into(),
            sentinel: sentinel.into(),
            ignored_prefixes: StreamConfig::default().ignored_prefixes,
        }
    }

    /// Replace the list of line prefixes that carry no payload
    pub fn with_ignored_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn data_prefix(&self) -> &str {
        &self.data_prefix
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    fn is_ignored(&self, line: &str) -> bool {
        self.ignored_prefixes
            .iter()
            .any(|p| !p.is_empty() && line.starts_with(p.as_str()))
    }
}

impl Default for StreamFraming {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for StreamFraming {
    fn from(config: &StreamConfig) -> Self {
        Self {
            data_prefix: config.data_prefix.clone(),
            sentinel: config.sentinel.clone(),
            ignored_prefixes: config.ignored_prefixes.clone(),
        }
    }
}

/// A unit that carried a payload which could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct DecodeError {
    /// The offending unit
    pub raw: RawStreamUnit,

    /// What went wrong
    pub reason: String,
}

/// Outcome of decoding one unit that carried something
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedChunk {
    /// A non-empty text fragment
    Text(String),
    /// End-of-stream sentinel
    End,
    /// Malformed or error payload
    DecodeError(DecodeError),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StreamPayload {
    Chunk(OpenAIStreamChunk),
    Error(OpenAIError),
}

/// Decode one wire unit.
///
/// Returns `None` for units with nothing to surface: blank lines, comments,
/// control fields and deltas without text.
pub fn decode_unit(framing: &StreamFraming, unit: &RawStreamUnit) -> Option<DecodedChunk> {
    let line = unit.as_str().trim();
    if line.is_empty() {
        return None;
    }

    let payload = match line.strip_prefix(framing.data_prefix.as_str()) {
        Some(rest) if !framing.data_prefix.is_empty() => rest.trim(),
        _ if framing.is_ignored(line) => return None,
        _ => line,
    };

    if payload.is_empty() {
        return None;
    }

    if payload == framing.sentinel {
        return Some(DecodedChunk::End);
    }

    let malformed = |reason: String| {
        Some(DecodedChunk::DecodeError(DecodeError {
            raw: unit.clone(),
            reason,
        }))
    };

    match serde_json::from_str::<StreamPayload>(payload) {
        Ok(StreamPayload::Chunk(chunk)) => chunk
            .choices
            .into_iter()
            .find(|choice| choice.index == 0)
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
            .map(DecodedChunk::Text),
        Ok(StreamPayload::Error(err)) => {
            malformed(format!("provider error in stream: {}", err.error.message))
        }
        Err(e) => malformed(format!("invalid stream payload: {}", e)),
    }
}
