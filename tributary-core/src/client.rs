//! Chat completion client
//!
//! [`ChatClient`] is the entry point of the adapter. It resolves the API key
//! and the model, builds the provider request, and then either returns a lazy
//! [`ChatStream`] over the open response or waits for the whole response.

use crate::analysis::{analysis_messages, parse_analysis, AnalysisResult};
use crate::capabilities::{self, Modality, ModelInfo};
use crate::config::{AdapterConfig, ConfigStore, ConfigValidator, SafeLogging, SecretString};
use crate::credentials::CredentialResolver;
use crate::http::client::HttpClient;
use crate::http::error::map_http_error;
use crate::http::{CallKind, Transport};
use crate::protocol::{
    CompletionOptions, CompletionText, Message, RequestBuilder, ResponseFormat,
};
use crate::providers::{OpenAIProvider, Provider, ProviderError, ProviderResult};
use crate::streaming::{decode_stream, ChatStream, StreamFraming};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a chat completion call
pub enum CompletionResult {
    /// Whole response
    Complete(CompletionText),
    /// Lazy stream of text fragments
    Stream(ChatStream),
}

impl CompletionResult {
    pub fn is_stream(&self) -> bool {
        matches!(self, CompletionResult::Stream(_))
    }

    /// The whole response, if this was not a streaming call
    pub fn into_complete(self) -> Option<CompletionText> {
        match self {
            CompletionResult::Complete(text) => Some(text),
            CompletionResult::Stream(_) => None,
        }
    }

    /// The fragment stream, if this was a streaming call
    pub fn into_stream(self) -> Option<ChatStream> {
        match self {
            CompletionResult::Complete(_) => None,
            CompletionResult::Stream(stream) => Some(stream),
        }
    }

    /// Full text, draining the stream if there is one.
    ///
    /// Stops at the first transport error.
    pub async fn into_text(self) -> ProviderResult<String> {
        match self {
            CompletionResult::Complete(completion) => Ok(completion.text),
            CompletionResult::Stream(mut stream) => {
                let mut text = String::new();
                while let Some(fragment) = stream.next().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }
}

impl fmt::Debug for CompletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionResult::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            CompletionResult::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Builder for [`ChatClient`]
pub struct ChatClientBuilder {
    config: AdapterConfig,
    api_key: Option<SecretString>,
    store: Option<Box<dyn ConfigStore>>,
    transport: Option<Arc<dyn Transport>>,
    provider: Option<Arc<dyn Provider>>,
}

impl ChatClientBuilder {
    fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            api_key: None,
            store: None,
            transport: None,
            provider: None,
        }
    }

    /// Use this key ahead of anything the store holds
    pub fn api_key(mut self, key: impl Into<SecretString>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Resolve the key from this store instead of the config itself
    pub fn store(mut self, store: impl ConfigStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Use a custom transport instead of the reqwest client
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom provider instead of OpenAI
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Validate the configuration, resolve the key and assemble the client
    pub fn build(self) -> ProviderResult<ChatClient> {
        let config = self.config;
        ConfigValidator::new()
            .validate(&config)
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        debug!(config = %config.safe_for_logging(), "building chat client");

        let credentials = match &self.store {
            Some(store) => CredentialResolver::resolve(self.api_key, store.as_ref()),
            None => CredentialResolver::resolve(self.api_key, &config),
        };
        if !credentials.validate_api_key() {
            warn!(
                code = "NO_API_KEY",
                "client created without an API key; calls will fail until one is set"
            );
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HttpClient::with_config(&config.connection)?
                    .with_max_line_bytes(config.stream.max_line_bytes),
            ),
        };

        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(OpenAIProvider::from_config(&config)));

        info!(
            provider = provider.name(),
            base_url = %provider.base_url(),
            default_model = %config.default_model,
            "chat client ready"
        );

        Ok(ChatClient {
            framing: Arc::new(StreamFraming::from(&config.stream)),
            config: Arc::new(config),
            credentials,
            transport,
            provider,
        })
    }
}

/// Chat completion client
#[derive(Clone)]
pub struct ChatClient {
    config: Arc<AdapterConfig>,
    credentials: CredentialResolver,
    transport: Arc<dyn Transport>,
    provider: Arc<dyn Provider>,
    framing: Arc<StreamFraming>,
}

impl ChatClient {
    /// Client with the default transport and provider
    pub fn new(config: AdapterConfig) -> ProviderResult<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: AdapterConfig) -> ChatClientBuilder {
        ChatClientBuilder::new(config)
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Whether an API key is present. No network call is made.
    pub fn validate_api_key(&self) -> bool {
        self.credentials.validate_api_key()
    }

    /// Supply or replace the API key
    pub fn set_api_key(&mut self, key: impl Into<SecretString>) {
        self.credentials.set_api_key(key);
    }

    /// Capabilities of a model; unknown models get conservative defaults
    pub fn get_model_info(&self, model: &str) -> ModelInfo {
        capabilities::model_info(model)
    }

    /// Run a chat completion.
    ///
    /// With `stream` set, the returned stream is lazy: nothing past the
    /// response headers is read until the caller polls it. Dropping it
    /// releases the connection.
    pub async fn chat_completion(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        stream: bool,
        options: CompletionOptions,
    ) -> ProviderResult<CompletionResult> {
        if messages.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "at least one message is required".to_string(),
            ));
        }

        let api_key = self.credentials.require()?;

        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.config.default_model);
        let info = capabilities::model_info(model);

        let request = RequestBuilder::new(model)
            .messages(messages)
            .stream(stream)
            .options(options)
            .build()?;

        if info.known && request.has_images() && !info.supports(Modality::Image) {
            warn!(
                code = "MODALITY_UNSUPPORTED",
                model,
                "request contains images but the model does not accept image input"
            );
        }

        let http_request = self
            .provider
            .build_http_request(CallKind::Chat, &request, api_key)?;
        let request_id = http_request.request_id;
        debug!(%request_id, model, stream, messages = request.messages().len(), "dispatching chat completion");

        if stream {
            let handle = self.transport.open_stream(http_request).await?;
            return Ok(CompletionResult::Stream(decode_stream(
                handle,
                self.framing.clone(),
            )));
        }

        let timeout = Duration::from_millis(self.config.connection.request_timeout_ms);
        let response = self
            .transport
            .send(http_request.with_timeout(timeout))
            .await?;

        if !response.is_success() {
            warn!(%request_id, status = response.status, "chat completion failed");
            return Err(map_http_error(
                response.status,
                &response.headers,
                Some(response.body.as_str()),
                request_id,
            ));
        }

        let completion = self.provider.decode_response(&response.body)?;
        debug!(%request_id, chars = completion.text.len(), "chat completion received");
        Ok(CompletionResult::Complete(completion))
    }

    /// Whole-response completion
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: CompletionOptions,
    ) -> ProviderResult<CompletionText> {
        match self.chat_completion(messages, model, false, options).await? {
            CompletionResult::Complete(completion) => Ok(completion),
            CompletionResult::Stream(_) => Err(ProviderError::Parse(
                "expected a whole response, got a stream".to_string(),
            )),
        }
    }

    /// Streaming completion
    pub async fn stream(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: CompletionOptions,
    ) -> ProviderResult<ChatStream> {
        match self.chat_completion(messages, model, true, options).await? {
            CompletionResult::Stream(stream) => Ok(stream),
            CompletionResult::Complete(_) => Err(ProviderError::Parse(
                "expected a stream, got a whole response".to_string(),
            )),
        }
    }

    /// Ask the model to analyze `code` and parse its JSON answer.
    ///
    /// Replies that are not JSON come back as [`AnalysisResult::Fallback`];
    /// only authentication and transport failures are errors.
    pub async fn analyze_code(
        &self,
        code: &str,
        instructions: &str,
    ) -> ProviderResult<AnalysisResult> {
        let model = self.config.analysis_model();

        let mut options = CompletionOptions::default()
            .with_temperature(self.config.analysis.temperature)
            .with_max_tokens(self.config.analysis.max_tokens);
        if capabilities::lookup(model).is_some_and(|info| info.json_mode) {
            options = options.with_response_format(ResponseFormat::JsonObject);
        }

        let completion = self
            .complete(analysis_messages(code, instructions), Some(model), options)
            .await?;

        let result = parse_analysis(&completion.text);
        debug!(parsed = result.is_parsed(), "code analysis finished");
        Ok(result)
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("provider", &self.provider.name())
            .field("base_url", &self.provider.base_url())
            .field("default_model", &self.config.default_model)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
