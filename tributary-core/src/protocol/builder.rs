//! Request builder
//!
//! Assembles a [`CompletionRequest`] and enforces the invariants the wire
//! converters rely on: a non-empty conversation, non-empty content blocks and
//! in-range sampling options.

use super::types::{
    CompletionOptions, CompletionRequest, ContentPart, ImageSource, IntoMessage, Message,
    MessageContent,
};
use crate::providers::{ProviderError, ProviderResult};

/// Request fields that `extra` must not override
pub const RESERVED_FIELDS: &[&str] = &[
    "model",
    "messages",
    "stream",
    "temperature",
    "max_tokens",
    "top_p",
    "stop",
    "presence_penalty",
    "frequency_penalty",
    "response_format",
    "user",
];

/// Builder for [`CompletionRequest`]
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: CompletionOptions,
}

impl RequestBuilder {
    /// Start a request for the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Append one message
    pub fn message(mut self, message: impl IntoMessage) -> Self {
        self.messages.push(message.into_message());
        self
    }

    /// Append messages, keeping their order
    pub fn messages<I>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = Message>,
    {
        self.messages.extend(messages);
        self
    }

    /// Request a streamed response
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Replace the option set
    pub fn options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate and freeze the request
    pub fn build(self) -> ProviderResult<CompletionRequest> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "model name must not be empty".to_string(),
            ));
        }

        if self.messages.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "at least one message is required".to_string(),
            ));
        }

        for (i, message) in self.messages.iter().enumerate() {
            validate_content(i, &message.content)?;
        }

        validate_options(&self.options)?;

        Ok(CompletionRequest {
            model: self.model,
            messages: self.messages,
            stream: self.stream,
            options: self.options,
        })
    }
}

fn validate_content(index: usize, content: &MessageContent) -> ProviderResult<()> {
    let parts = match content {
        MessageContent::Text(_) => return Ok(()),
        MessageContent::Parts(parts) => parts,
    };

    if parts.is_empty() {
        return Err(ProviderError::InvalidRequest(format!(
            "messages[{}]: multimodal content needs at least one block",
            index
        )));
    }

    for (j, part) in parts.iter().enumerate() {
        let empty = match part {
            ContentPart::Text { .. } => false,
            ContentPart::Image {
                source: ImageSource::Url { url },
                ..
            } => url.trim().is_empty(),
            ContentPart::Image {
                source: ImageSource::Base64 { media_type, data },
                ..
            } => media_type.trim().is_empty() || data.trim().is_empty(),
        };
        if empty {
            return Err(ProviderError::InvalidRequest(format!(
                "messages[{}].content[{}]: image reference is empty",
                index, j
            )));
        }
    }

    Ok(())
}

fn validate_options(options: &CompletionOptions) -> ProviderResult<()> {
    if let Some(t) = options.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(ProviderError::InvalidRequest(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                t
            )));
        }
    }

    if let Some(p) = options.top_p {
        if !(0.0..=1.0).contains(&p) {
            return Err(ProviderError::InvalidRequest(format!(
                "top_p must be between 0.0 and 1.0, got {}",
                p
            )));
        }
    }

    if let Some(max_tokens) = options.max_tokens {
        if max_tokens == 0 || u32::try_from(max_tokens).is_err() {
            return Err(ProviderError::InvalidRequest(format!(
                "max_tokens must be between 1 and {}, got {}",
                u32::MAX,
                max_tokens
            )));
        }
    }

    if let Some(name) = options
        .extra
        .keys()
        .find(|name| RESERVED_FIELDS.contains(&name.as_str()))
    {
        return Err(ProviderError::InvalidRequest(format!(
            "extra option '{}' would override a request field",
            name
        )));
    }

    for (name, value) in [
        ("presence_penalty", options.presence_penalty),
        ("frequency_penalty", options.frequency_penalty),
    ] {
        if let Some(v) = value {
            if !(-2.0..=2.0).contains(&v) {
                return Err(ProviderError::InvalidRequest(format!(
                    "{} must be between -2.0 and 2.0, got {}",
                    name, v
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageRole;
    use test_case::test_case;

    #[test]
    fn test_builds_request_in_order() {
        let request = RequestBuilder::new("gpt-4o")
            .message(Message::system("sys"))
            .message("hi")
            .stream(true)
            .options(CompletionOptions::default().with_temperature(0.2))
            .build()
            .unwrap();

        assert_eq!(request.model(), "gpt-4o");
        assert!(request.is_stream());
        assert_eq!(request.messages()[0].role, MessageRole::System);
        assert_eq!(request.messages()[1].content.as_text(), Some("hi"));
        assert_eq!(request.options().temperature, Some(0.2));
    }

    #[test]
    fn test_empty_messages_rejected() {
        let err = RequestBuilder::new("gpt-4o").build().unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn test_empty_parts_rejected() {
        let err = RequestBuilder::new("gpt-4o")
            .message(Message::with_parts(MessageRole::User, vec![]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("at least one block"));
    }

    #[test]
    fn test_empty_image_rejected() {
        let err = RequestBuilder::new("gpt-4o")
            .message(Message::with_parts(
                MessageRole::User,
                vec![ContentPart::text("look"), ContentPart::image_url(" ")],
            ))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("content[1]"));
    }

    #[test]
    fn test_out_of_range_options_rejected() {
        let result = RequestBuilder::new("gpt-4o")
            .message("hi")
            .options(CompletionOptions::default().with_temperature(3.5))
            .build();
        assert!(result.is_err());

        let result = RequestBuilder::new("gpt-4o")
            .message("hi")
            .options(CompletionOptions::default().with_max_tokens(0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_max_tokens_beyond_u32_rejected() {
        let err = RequestBuilder::new("gpt-4o")
            .message("hi")
            .options(CompletionOptions::default().with_max_tokens(u32::MAX as usize + 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(ref m) if m.contains("max_tokens")));

        let request = RequestBuilder::new("gpt-4o")
            .message("hi")
            .options(CompletionOptions::default().with_max_tokens(u32::MAX as usize))
            .build();
        assert!(request.is_ok());
    }

    #[test_case("model" ; "model")]
    #[test_case("messages" ; "messages")]
    #[test_case("stream" ; "stream")]
    #[test_case("max_tokens" ; "max tokens")]
    #[test_case("response_format" ; "response format")]
    fn test_reserved_extra_rejected(name: &str) {
        let err = RequestBuilder::new("gpt-4o")
            .message("hi")
            .stream(true)
            .options(CompletionOptions::default().with_extra(name, serde_json::json!(false)))
            .build()
            .unwrap_err();
        match err {
            ProviderError::InvalidRequest(message) => assert!(message.contains(name)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unreserved_extra_accepted() {
        let request = RequestBuilder::new("gpt-4o")
            .message("hi")
            .options(CompletionOptions::default().with_extra("seed", serde_json::json!(7)))
            .build()
            .unwrap();
        assert_eq!(request.options().extra["seed"], 7);
    }
}
