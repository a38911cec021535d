//! Protocol module for chat completion request/response structures
//!
//! This module defines the canonical, provider-agnostic data model:
//! - ordered conversations of text or multimodal messages
//! - typed completion options with a passthrough map
//! - the immutable [`CompletionRequest`] produced by [`RequestBuilder`]

mod builder;
pub mod types;

pub use builder::RequestBuilder;
pub use types::{
    CompletionOptions, CompletionRequest, CompletionText, CompletionUsage, ContentPart,
    ImageDetail, ImageSource, IntoMessage, Message, MessageContent, MessageRole, ResponseFormat,
};
