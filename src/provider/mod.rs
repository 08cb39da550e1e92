use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{LLMError, ProviderError};
use crate::http::{
    DynHttpTransport, HttpRequest, HttpResponse, collect_body_text, send_stream_cancellable,
};
use crate::stream::{ChatStream, DecodeFn, forward_frames};
use crate::types::{
    CapabilityDescriptor, ChatRequest, ChatResponse, Message, Model, ProviderKind, Role,
    StreamChunk,
};

pub mod anthropic_messages;
pub mod google_gemini;
pub mod model_cache;
pub mod openai_chat;
pub mod retry;

use retry::retry_after_from_headers;

/// Output token limit used when neither the request nor the model declares one.
pub const FALLBACK_MAX_TOKENS: u32 = 4096;

/// Sampling temperature used by adapters that support it when the request has none.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// 统一的 Provider Trait，所有供应商实现该接口即可接入
///
/// 每个网络操作都接受调用方的 [`CancellationToken`]。
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// 提交完整请求并等待完整响应
    async fn chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, LLMError>;

    /// 立即返回两个接收通道，网络交互在后台任务中完成
    ///
    /// Must be called from within a tokio runtime.
    fn chat_stream(&self, request: ChatRequest, cancel: CancellationToken) -> ChatStream;

    /// 返回可用模型列表；动态目录在获取失败时回退到内置列表
    async fn get_models(&self, cancel: &CancellationToken) -> Vec<Model>;

    /// 以最小代价的认证请求检查凭据，401/403 映射为 [`LLMError::InvalidCredential`]
    async fn validate_credentials(&self, cancel: &CancellationToken) -> Result<(), LLMError>;

    /// 描述支持的能力范围
    fn capabilities(&self) -> CapabilityDescriptor;

    /// 供应商标识
    fn kind(&self) -> ProviderKind;
}

/// 线程安全 Provider
pub type DynProvider = Arc<dyn LLMProvider>;

/// Vendor-specific mapping from a non-2xx body to a [`ProviderError`].
pub(crate) type ErrorParser = fn(u16, &str, Option<Duration>) -> ProviderError;

/// Rejects blank credentials before any I/O happens.
pub(crate) fn require_credential(
    provider: ProviderKind,
    api_key: impl Into<String>,
) -> Result<String, LLMError> {
    let api_key = api_key.into();
    if api_key.trim().is_empty() {
        return Err(LLMError::MissingCredential { provider });
    }
    Ok(api_key)
}

/// Request override, then the model's declared limit, then [`FALLBACK_MAX_TOKENS`].
pub(crate) fn resolve_max_tokens(request: &ChatRequest) -> u32 {
    request
        .max_tokens
        .filter(|limit| *limit > 0)
        .or_else(|| Some(request.model.max_tokens).filter(|limit| *limit > 0))
        .unwrap_or(FALLBACK_MAX_TOKENS)
}

pub(crate) fn resolve_temperature(request: &ChatRequest) -> f64 {
    request.temperature.unwrap_or(DEFAULT_TEMPERATURE)
}

/// Lifts system messages out of the conversation.
///
/// Returns the first system message's text and the remaining turns in their
/// original order. Further system messages are dropped.
pub(crate) fn split_system_message(
    messages: &[Message],
    provider: ProviderKind,
) -> (Option<&str>, Vec<&Message>) {
    let mut system = None;
    let mut dropped = 0usize;
    let mut conversation = Vec::with_capacity(messages.len());

    for message in messages {
        if message.role == Role::System {
            if system.is_none() {
                system = Some(message.content.as_str());
            } else {
                dropped += 1;
            }
        } else {
            conversation.push(message);
        }
    }

    if dropped > 0 {
        tracing::warn!(
            provider = %provider,
            dropped,
            "only the first system message is sent; extra system messages were dropped"
        );
    }

    (system, conversation)
}

/// Fails requests that carry no user or assistant turn.
pub(crate) fn ensure_conversation(
    conversation: &[&Message],
    provider: ProviderKind,
) -> Result<(), LLMError> {
    if conversation.is_empty() {
        return Err(LLMError::Validation {
            message: format!("{provider} request needs at least one user or assistant message"),
        });
    }
    Ok(())
}

/// Joins `path` onto a base URL, inserting the API version segment unless the
/// base already ends with it.
pub(crate) fn versioned_url(base_url: &str, version: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let segment = format!("/{version}");
    if base.ends_with(&segment) {
        format!("{base}{path}")
    } else {
        format!("{base}{segment}{path}")
    }
}

/// Passes 2xx responses through and normalizes everything else.
pub(crate) fn ensure_success(
    response: HttpResponse,
    parse_error: ErrorParser,
) -> Result<HttpResponse, LLMError> {
    if response.is_success() {
        return Ok(response);
    }
    let retry_after = retry_after_from_headers(&response.headers);
    let body = String::from_utf8_lossy(&response.body);
    Err(parse_error(response.status, &body, retry_after).into())
}

/// Decodes a 2xx JSON body into the vendor's response type.
pub(crate) fn decode_json<T: DeserializeOwned>(
    provider: ProviderKind,
    body: &[u8],
) -> Result<T, LLMError> {
    serde_json::from_slice(body).map_err(|err| {
        LLMError::decode(provider, format!("failed to parse {provider} response: {err}"))
    })
}

/// Parameters of one streaming call, shared by every adapter.
pub(crate) struct StreamCall {
    pub(crate) transport: DynHttpTransport,
    pub(crate) provider: ProviderKind,
    pub(crate) decode: DecodeFn,
    pub(crate) parse_error: ErrorParser,
}

impl StreamCall {
    /// Spawns the producer task and hands back the receiving channels.
    ///
    /// A request that could not be built is reported on the error channel so
    /// callers see a single failure path.
    pub(crate) fn spawn(
        self,
        request: Result<HttpRequest, LLMError>,
        cancel: CancellationToken,
    ) -> ChatStream {
        let request = match request {
            Ok(request) => request,
            Err(err) => return ChatStream::failed(err),
        };

        let (sender, stream) = ChatStream::channel();
        tokio::spawn(async move {
            let result = self.run(request, &sender.chunks, &cancel).await;
            if let Err(err) = &result {
                tracing::debug!(provider = %self.provider, error = %err, "stream ended with error");
            }
            sender.finish(result).await;
        });
        stream
    }

    async fn run(
        &self,
        request: HttpRequest,
        chunks: &tokio::sync::mpsc::Sender<StreamChunk>,
        cancel: &CancellationToken,
    ) -> Result<(), LLMError> {
        let response = send_stream_cancellable(self.transport.as_ref(), request, cancel).await?;
        if !(200..300).contains(&response.status) {
            let retry_after = retry_after_from_headers(&response.headers);
            let body = collect_body_text(response.body, cancel).await?;
            return Err((self.parse_error)(response.status, &body, retry_after).into());
        }
        forward_frames(response.body, self.provider, self.decode, chunks, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(max_tokens: u32) -> Model {
        Model::new("m", "M", ProviderKind::Anthropic, max_tokens, 0)
    }

    #[test]
    fn max_tokens_precedence() {
        let request = ChatRequest::new(model(8192), vec![Message::user("hi")]);
        assert_eq!(resolve_max_tokens(&request), 8192);

        let request = request.with_max_tokens(256);
        assert_eq!(resolve_max_tokens(&request), 256);

        let request = ChatRequest::new(model(0), vec![Message::user("hi")]);
        assert_eq!(resolve_max_tokens(&request), FALLBACK_MAX_TOKENS);

        let request = ChatRequest::new(model(0), vec![Message::user("hi")]).with_max_tokens(0);
        assert_eq!(resolve_max_tokens(&request), FALLBACK_MAX_TOKENS);
    }

    #[test]
    fn system_split_keeps_first_and_order() {
        let messages = vec![
            Message::system("first"),
            Message::user("a"),
            Message::system("second"),
            Message::assistant("b"),
            Message::user("c"),
        ];
        let (system, conversation) = split_system_message(&messages, ProviderKind::Gemini);
        assert_eq!(system, Some("first"));
        let contents: Vec<_> = conversation.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
    }

    #[test]
    fn blank_credentials_are_rejected() {
        for key in ["", "   "] {
            assert!(matches!(
                require_credential(ProviderKind::OpenAi, key),
                Err(LLMError::MissingCredential {
                    provider: ProviderKind::OpenAi
                })
            ));
        }
        assert_eq!(
            require_credential(ProviderKind::OpenAi, "sk-test").expect("key"),
            "sk-test"
        );
    }

    #[test]
    fn versioned_url_tolerates_existing_segment() {
        assert_eq!(
            versioned_url("https://api.example.com/", "v1", "/messages"),
            "https://api.example.com/v1/messages"
        );
        assert_eq!(
            versioned_url("https://proxy.example.com/v1", "v1", "/messages"),
            "https://proxy.example.com/v1/messages"
        );
    }
}
