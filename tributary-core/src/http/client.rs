//! HTTP transport implementation using reqwest

use crate::config::ConnectionConfig;
use crate::http::error::map_http_error;
use crate::http::{HttpRequest, HttpResponse, RawStreamUnit, StreamHandle, Transport};
use crate::providers::{ProviderError, ProviderResult};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default user agent
const USER_AGENT: &str = concat!("tributary/", env!("CARGO_PKG_VERSION"));

/// Longest accepted stream line unless configured otherwise
const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Maximum whole-response size to prevent OOM
    max_response_size: usize,

    /// Maximum length of a single stream line
    max_line_bytes: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> ProviderResult<Self> {
        Self::with_config(&ConnectionConfig::default())
    }

    /// Create a new HTTP client from connection settings
    pub fn with_config(config: &ConnectionConfig) -> ProviderResult<Self> {
        // No client-wide timeout: it would also cap how long a stream may run.
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: config.max_response_bytes,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        })
    }

    /// Override the maximum stream line length
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    fn build(&self, request: &HttpRequest) -> RequestBuilder {
        let mut builder = self.client.post(&request.url).json(&request.body);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder.header("X-Request-ID", request.request_id.to_string())
    }

    async fn execute(&self, builder: RequestBuilder, request_id: Uuid) -> ProviderResult<Response> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(%request_id, "request timed out");
                ProviderError::Timeout
            } else if e.is_connect() {
                error!(%request_id, "connection error: {}", e);
                ProviderError::Network(format!("Connection failed: {} [request_id: {}]", e, request_id))
            } else {
                error!(%request_id, "request error: {}", e);
                ProviderError::Network(format!("{} [request_id: {}]", e, request_id))
            }
        })
    }

    /// Check response size to prevent OOM
    fn check_content_length(&self, response: &Response) -> ProviderResult<()> {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(ProviderError::ResponseTooLarge {
                    size: content_length as usize,
                    limit: self.max_response_size,
                });
            }
        }

        Ok(())
    }
}

fn collect_headers(response: &Response) -> HashMap<String, String> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: HttpRequest) -> ProviderResult<HttpResponse> {
        let request_id = request.request_id;
        info!(%request_id, url = %request.url, "executing request");

        let mut builder = self.build(&request);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = self.execute(builder, request_id).await?;
        let status = response.status().as_u16();
        debug!(%request_id, status, "response received");

        self.check_content_length(&response)?;
        let headers = collect_headers(&response);

        let body = response.text().await.map_err(|e| {
            ProviderError::Network(format!(
                "Failed to read response body: {} [request_id: {}]",
                e, request_id
            ))
        })?;

        if body.len() > self.max_response_size {
            return Err(ProviderError::ResponseTooLarge {
                size: body.len(),
                limit: self.max_response_size,
            });
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn open_stream(&self, request: HttpRequest) -> ProviderResult<Box<dyn StreamHandle>> {
        let request_id = request.request_id;
        info!(%request_id, url = %request.url, "opening stream");

        let builder = self
            .build(&request)
            .header("Accept", "text/event-stream");
        let response = self.execute(builder, request_id).await?;

        let status = response.status();
        if !status.is_success() {
            let headers = collect_headers(&response);
            let body = response.text().await.ok();
            warn!(%request_id, status = status.as_u16(), "stream request failed");
            return Err(map_http_error(
                status.as_u16(),
                &headers,
                body.as_deref(),
                request_id,
            ));
        }

        debug!(%request_id, "stream opened");
        Ok(Box::new(LineStream::new(
            response.bytes_stream().boxed(),
            self.max_line_bytes,
            request_id,
        )))
    }
}

/// Splits a response body into lines, one pull at a time.
///
/// Holds at most one partial line plus the chunk that completed it.
pub struct LineStream {
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    buffer: BytesMut,
    max_line_bytes: usize,
    request_id: Uuid,
}

impl LineStream {
    fn new(
        body: BoxStream<'static, reqwest::Result<Bytes>>,
        max_line_bytes: usize,
        request_id: Uuid,
    ) -> Self {
        Self {
            body: Some(body),
            buffer: BytesMut::new(),
            max_line_bytes,
            request_id,
        }
    }

    fn take_line(&mut self) -> Option<RawStreamUnit> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let line = self.buffer.split_to(pos + 1);
        Some(RawStreamUnit::from_bytes(&line[..pos]))
    }
}

#[async_trait]
impl StreamHandle for LineStream {
    async fn next_unit(&mut self) -> Option<ProviderResult<RawStreamUnit>> {
        loop {
            if let Some(unit) = self.take_line() {
                return Some(Ok(unit));
            }

            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.extend_from_slice(&chunk);
                    if self.buffer.len() > self.max_line_bytes && !self.buffer.contains(&b'\n') {
                        let size = self.buffer.len();
                        self.close();
                        return Some(Err(ProviderError::ResponseTooLarge {
                            size,
                            limit: self.max_line_bytes,
                        }));
                    }
                }
                Some(Err(e)) => {
                    error!(request_id = %self.request_id, "stream read error: {}", e);
                    self.close();
                    return Some(Err(ProviderError::Network(format!(
                        "Stream read failed: {} [request_id: {}]",
                        e, self.request_id
                    ))));
                }
                None => {
                    self.body = None;
                    if self.buffer.is_empty() {
                        return None;
                    }
                    let rest = self.buffer.split();
                    return Some(Ok(RawStreamUnit::from_bytes(&rest)));
                }
            }
        }
    }

    fn close(&mut self) {
        if self.body.take().is_some() {
            debug!(request_id = %self.request_id, "stream connection released");
        }
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn line_stream(chunks: Vec<&'static str>, max: usize) -> LineStream {
        let body = stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<Bytes, reqwest::Error>(Bytes::from_static(c.as_bytes()))),
        )
        .boxed();
        LineStream::new(body, max, Uuid::nil())
    }

    async fn drain(handle: &mut LineStream) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(unit) = handle.next_unit().await {
            lines.push(unit.unwrap().as_str().to_string());
        }
        lines
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let mut handle = line_stream(vec!["data: {\"a\"", ":1}\n\nda", "ta: [DONE]\n"], 1024);
        let lines = drain(&mut handle).await;
        assert_eq!(lines, vec!["data: {\"a\":1}", "", "data: [DONE]"]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let mut handle = line_stream(vec!["one\ntwo"], 1024);
        assert_eq!(drain(&mut handle).await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_overlong_line_fails() {
        let mut handle = line_stream(vec!["aaaaaaaaaa", "bbbbbbbbbb"], 8);
        let first = handle.next_unit().await.unwrap();
        assert!(matches!(first, Err(ProviderError::ResponseTooLarge { .. })));
        assert!(handle.next_unit().await.is_none());
    }

    #[tokio::test]
    async fn test_close_stops_reading() {
        let mut handle = line_stream(vec!["a\n", "b\n"], 1024);
        assert_eq!(handle.next_unit().await.unwrap().unwrap().as_str(), "a");
        handle.close();
        assert!(handle.next_unit().await.is_none());
    }
}
