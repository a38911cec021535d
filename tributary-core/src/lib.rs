//! Tributary Core Library
//!
//! A client-side adapter for OpenAI-compatible chat completion APIs:
//!
//! - whole-response and incrementally streamed completions behind one call,
//!   [`ChatClient::chat_completion`]
//! - text and image message content
//! - a code analysis mode that extracts a JSON answer from the model reply
//!
//! Streaming results are lazy [`ChatStream`]s. Each poll reads at most one
//! line from the connection, and the connection is released exactly once:
//! at the end-of-stream sentinel, on exhaustion, on a transport error, or
//! when the stream is dropped.
//!
//! ```no_run
//! use futures::StreamExt;
//! use tributary_core::{AdapterConfig, ChatClient, CompletionOptions, Message};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::builder(AdapterConfig::default())
//!     .api_key("sk-...")
//!     .build()?;
//!
//! let mut stream = client
//!     .stream(vec![Message::user("hi")], None, CompletionOptions::default())
//!     .await?;
//! while let Some(fragment) = stream.next().await {
//!     print!("{}", fragment?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod capabilities;
pub mod client;
pub mod config;
pub mod credentials;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod streaming;

#[cfg(test)]
mod test_support;

pub use analysis::{parse_analysis, AnalysisResult};
pub use capabilities::{Modality, ModelInfo};
pub use client::{ChatClient, ChatClientBuilder, CompletionResult};
pub use config::{AdapterConfig, ConfigStore, MemoryConfigStore, SecretString};
pub use credentials::CredentialResolver;
pub use http::{HttpRequest, HttpResponse, RawStreamUnit, StreamHandle, Transport};
pub use protocol::{
    CompletionOptions, CompletionRequest, CompletionText, ContentPart, Message, MessageRole,
    RequestBuilder, ResponseFormat,
};
pub use providers::{ProviderError, ProviderResult};
pub use streaming::{decode_stream, ChatStream, StreamFraming};

/// Returns the version of the Tributary Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
