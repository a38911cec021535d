//! OpenAI provider implementation
//!
//! Translates between the canonical protocol and the OpenAI chat completions
//! wire format. The streaming chunk types here are also what the stream
//! decoder reads.

mod client;
pub mod converter;
pub mod types;

pub use client::{OpenAIProvider, DEFAULT_BASE_URL};
pub use types::{OpenAIRequest, OpenAIResponse, OpenAIStreamChunk};
