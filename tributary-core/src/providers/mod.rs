//! Provider abstraction and error types
//!
//! Providers turn canonical requests into HTTP requests and whole-response
//! bodies back into canonical results.

pub mod adapter;
pub mod error;
pub mod openai;

pub use adapter::Provider;
pub use error::{ProviderError, ProviderResult};

// Re-export concrete providers
pub use openai::OpenAIProvider;
