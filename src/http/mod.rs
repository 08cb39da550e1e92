use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::LLMError;

/// Enumerates HTTP methods used by the adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Minimal HTTP request representation shared across providers.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Builds a POST request with a JSON request body.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_gateway::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec());
    /// assert_eq!(request.method, HttpMethod::Post);
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Some(body),
        }
    }

    /// Builds a body-less GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Merges headers into the request, replacing existing values.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use kotoba_gateway::http::HttpRequest;
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec())
    ///     .with_headers(HashMap::from([("Authorization".into(), "Bearer test".into())]));
    /// assert_eq!(request.headers.get("Authorization"), Some(&"Bearer test".to_string()));
    /// assert!(request.headers.contains_key("Content-Type"));
    /// ```
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Minimal HTTP response representation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP response that carries a streaming body.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

/// Alias for the body stream returned by [`HttpTransport::send_stream`].
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LLMError>> + Send>>;

/// Transport abstraction used to decouple providers from the concrete HTTP client.
///
/// Implementations do not need to know about cancellation: the helpers in this
/// module race every call against the caller's [`CancellationToken`] and drop
/// the in-flight future (closing the connection) when it fires.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves when the full response is available.
    ///
    /// # Errors
    ///
    /// Implementations should map network failures to [`LLMError::Transport`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError>;

    /// Sends a request and returns a streaming body.
    ///
    /// # Errors
    ///
    /// Implementations should map network failures to [`LLMError::Transport`].
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

/// Sends a request, giving up with [`LLMError::Cancelled`] when `cancel` fires.
pub async fn send_cancellable(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    cancel: &CancellationToken,
) -> Result<HttpResponse, LLMError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LLMError::Cancelled),
        response = transport.send(request) => response,
    }
}

/// Streaming counterpart of [`send_cancellable`]; only covers header receipt.
pub async fn send_stream_cancellable(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    cancel: &CancellationToken,
) -> Result<HttpStreamResponse, LLMError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LLMError::Cancelled),
        response = transport.send_stream(request) => response,
    }
}

/// Issues a GET request with the given headers.
pub async fn get_with_headers(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    cancel: &CancellationToken,
) -> Result<HttpResponse, LLMError> {
    let request = HttpRequest::get(url).with_headers(headers);
    send_cancellable(transport, request, cancel).await
}

/// Serializes `body` into a POST request without sending it.
pub fn build_post_json<T: Serialize>(
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
) -> Result<HttpRequest, LLMError> {
    let payload = serde_json::to_vec(body).map_err(|err| LLMError::Serialization {
        message: err.to_string(),
    })?;
    Ok(HttpRequest::post_json(url, payload).with_headers(headers))
}

/// Drains a streaming body into a string, typically to read an error envelope.
pub async fn collect_body_text(
    mut body: HttpBodyStream,
    cancel: &CancellationToken,
) -> Result<String, LLMError> {
    let mut bytes = Vec::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LLMError::Cancelled),
            next = body.next() => next,
        };
        match next {
            Some(chunk) => bytes.extend_from_slice(&chunk?),
            None => break,
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub mod reqwest;

#[cfg(test)]
pub(crate) mod mock;
