use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, HttpRequest, build_post_json, send_cancellable};
use crate::provider::{
    LLMProvider, StreamCall, decode_json, ensure_success, require_credential, versioned_url,
};
use crate::stream::ChatStream;
use crate::types::{
    CapabilityDescriptor, ChatRequest, ChatResponse, Message, Model, ProviderKind,
};

use super::error::parse_anthropic_error;
use super::models::anthropic_models;
use super::request::build_anthropic_body;
use super::response::map_response;
use super::stream::decode_frame;
use super::types::AnthropicMessageResponse;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";
const PROBE_MODEL: &str = "claude-haiku-4-5";

/// Anthropic Messages Provider
pub struct AnthropicMessagesProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) version: String,
    pub(crate) beta: Option<String>,
}

impl AnthropicMessagesProvider {
    /// 使用默认 base_url 与 anthropic-version 创建 Provider，空凭据直接报错
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Result<Self, LLMError> {
        Ok(Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: require_credential(ProviderKind::Anthropic, api_key)?,
            version: DEFAULT_VERSION.to_string(),
            beta: None,
        })
    }

    /// 自定义 base_url，便于接入代理或兼容层
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 自定义 Anthropic API 版本（anthropic-version）
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 设置 anthropic-beta 头，支持逗号分隔的 beta 列表
    pub fn with_beta(mut self, beta: impl Into<String>) -> Self {
        self.beta = Some(beta.into());
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        versioned_url(&self.base_url, "v1", "/messages")
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), self.api_key.clone());
        headers.insert("anthropic-version".to_string(), self.version.clone());
        if let Some(beta) = &self.beta {
            headers.insert("anthropic-beta".to_string(), beta.clone());
        }
        headers
    }

    /// Translates a chat request into the HTTP call the Messages API expects.
    pub(crate) fn build_request(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<HttpRequest, LLMError> {
        let body = build_anthropic_body(request, stream)?;
        build_post_json(self.endpoint(), self.build_headers(), &body)
    }
}

#[async_trait]
impl LLMProvider for AnthropicMessagesProvider {
    async fn chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, LLMError> {
        let http_request = self.build_request(&request, false)?;
        let response = send_cancellable(self.transport.as_ref(), http_request, cancel).await?;
        let response = ensure_success(response, parse_anthropic_error)?;
        let parsed: AnthropicMessageResponse = decode_json(self.kind(), &response.body)?;
        Ok(map_response(parsed))
    }

    fn chat_stream(&self, request: ChatRequest, cancel: CancellationToken) -> ChatStream {
        StreamCall {
            transport: self.transport.clone(),
            provider: self.kind(),
            decode: decode_frame,
            parse_error: parse_anthropic_error,
        }
        .spawn(self.build_request(&request, true), cancel)
    }

    async fn get_models(&self, _cancel: &CancellationToken) -> Vec<Model> {
        anthropic_models()
    }

    /// Anthropic has no free authenticated endpoint, so the probe is a one-token chat.
    async fn validate_credentials(&self, cancel: &CancellationToken) -> Result<(), LLMError> {
        let model = anthropic_models()
            .into_iter()
            .find(|model| model.id == PROBE_MODEL)
            .unwrap_or_else(|| Model::new(PROBE_MODEL, PROBE_MODEL, self.kind(), 0, 0));
        let probe = ChatRequest::new(model, vec![Message::user("ping")]).with_max_tokens(1);
        self.chat(probe, cancel)
            .await
            .map(|_| ())
            .map_err(LLMError::into_credential_error)
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_temperature: true,
            supports_web_search: true,
            dynamic_catalog: false,
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }
}
