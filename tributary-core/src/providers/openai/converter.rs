//! Conversion between the canonical protocol and the OpenAI wire format

use super::types::*;
use crate::protocol::{
    CompletionRequest, CompletionText, CompletionUsage, ContentPart, ImageDetail, ImageSource,
    Message, MessageContent, ResponseFormat,
};
use crate::providers::{ProviderError, ProviderResult};
use serde_json::Value;

/// Convert a CompletionRequest to OpenAI format
pub fn to_openai_request(request: &CompletionRequest) -> OpenAIRequest {
    let options = request.options();

    OpenAIRequest {
        model: request.model().to_string(),
        messages: request.messages().iter().map(to_openai_message).collect(),
        temperature: options.temperature,
        max_tokens: options
            .max_tokens
            .map(|t| u32::try_from(t).unwrap_or(u32::MAX)),
        top_p: options.top_p,
        stop: options.stop.clone(),
        stream: request.is_stream().then_some(true),
        frequency_penalty: options.frequency_penalty,
        presence_penalty: options.presence_penalty,
        user: options.user.clone(),
        response_format: options.response_format.map(to_openai_response_format),
        extra: options
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

/// Serialize a CompletionRequest to the JSON request body
pub fn to_openai_body(request: &CompletionRequest) -> ProviderResult<Value> {
    Ok(serde_json::to_value(to_openai_request(request))?)
}

fn to_openai_message(message: &Message) -> OpenAIMessage {
    OpenAIMessage {
        role: message.role.as_str().to_string(),
        content: Some(to_openai_content(&message.content)),
        name: message.name.clone(),
    }
}

fn to_openai_content(content: &MessageContent) -> OpenAIContent {
    match content {
        MessageContent::Text(text) => OpenAIContent::Text(text.clone()),
        MessageContent::Parts(parts) => {
            OpenAIContent::Parts(parts.iter().map(to_openai_part).collect())
        }
    }
}

fn to_openai_part(part: &ContentPart) -> OpenAIContentPart {
    match part {
        ContentPart::Text { text } => OpenAIContentPart::Text { text: text.clone() },
        ContentPart::Image { source, detail } => {
            let url = match source {
                ImageSource::Url { url } => url.clone(),
                ImageSource::Base64 { media_type, data } => {
                    format!("data:{};base64,{}", media_type, data)
                }
            };

            OpenAIContentPart::ImageUrl {
                image_url: OpenAIImageUrl {
                    url,
                    detail: detail.map(detail_name),
                },
            }
        }
    }
}

fn detail_name(detail: ImageDetail) -> String {
    match detail {
        ImageDetail::Auto => "auto",
        ImageDetail::Low => "low",
        ImageDetail::High => "high",
    }
    .to_string()
}

fn to_openai_response_format(format: ResponseFormat) -> OpenAIResponseFormat {
    let format_type = match format {
        ResponseFormat::Text => "text",
        ResponseFormat::JsonObject => "json_object",
    };

    OpenAIResponseFormat {
        format_type: format_type.to_string(),
    }
}

/// Parse a whole-response body into the completion text.
///
/// The text is the first choice's message content. Multimodal content parts
/// are joined; a missing content is an empty string.
pub fn from_openai_response(body: &str) -> ProviderResult<CompletionText> {
    let raw: Value = serde_json::from_str(body)?;
    let response: OpenAIResponse = serde_json::from_value(raw.clone())?;

    let choice = response
        .choices
        .into_iter()
        .min_by_key(|choice| choice.index)
        .ok_or_else(|| ProviderError::Parse("response contains no choices".to_string()))?;

    let text = match choice.message.content {
        Some(OpenAIContent::Text(text)) => text,
        Some(OpenAIContent::Parts(parts)) => parts
            .into_iter()
            .filter_map(|part| match part {
                OpenAIContentPart::Text { text } => Some(text),
                OpenAIContentPart::ImageUrl { .. } => None,
            })
            .collect(),
        None => String::new(),
    };

    Ok(CompletionText {
        text,
        model: response.model.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: response.usage.map(from_openai_usage),
        raw,
    })
}

fn from_openai_usage(usage: OpenAIUsage) -> CompletionUsage {
    CompletionUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}
