use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpRequest, build_post_json, get_with_headers, send_cancellable,
};
use crate::provider::{
    LLMProvider, StreamCall, decode_json, ensure_success, require_credential, versioned_url,
};
use crate::stream::ChatStream;
use crate::types::{CapabilityDescriptor, ChatRequest, ChatResponse, Model, ProviderKind};

use super::error::parse_openai_error;
use super::models::openai_models;
use super::request::build_openai_chat_body;
use super::response::map_response;
use super::stream::decode_frame;
use super::types::OpenAiChatResponse;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI Chat Completions Provider
pub struct OpenAiChatProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) organization: Option<String>,
    pub(crate) project: Option<String>,
}

impl OpenAiChatProvider {
    /// 创建 OpenAiChatProvider，空凭据直接报错
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Result<Self, LLMError> {
        Ok(Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: require_credential(ProviderKind::OpenAi, api_key)?,
            organization: None,
            project: None,
        })
    }

    /// 自定义 base_url，便于接入代理或兼容层
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 设置 OpenAI-Organization 头
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// 设置 OpenAI-Project 头
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        versioned_url(&self.base_url, "v1", "/chat/completions")
    }

    fn models_endpoint(&self) -> String {
        versioned_url(&self.base_url, "v1", "/models")
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        if let Some(organization) = &self.organization {
            headers.insert("OpenAI-Organization".to_string(), organization.clone());
        }
        if let Some(project) = &self.project {
            headers.insert("OpenAI-Project".to_string(), project.clone());
        }
        headers
    }

    /// Translates a chat request into a Chat Completions call.
    pub(crate) fn build_request(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<HttpRequest, LLMError> {
        let body = build_openai_chat_body(request, stream)?;
        build_post_json(self.endpoint(), self.build_headers(), &body)
    }
}

#[async_trait]
impl LLMProvider for OpenAiChatProvider {
    async fn chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, LLMError> {
        let http_request = self.build_request(&request, false)?;
        let response = send_cancellable(self.transport.as_ref(), http_request, cancel).await?;
        let response = ensure_success(response, parse_openai_error)?;
        let parsed: OpenAiChatResponse = decode_json(self.kind(), &response.body)?;
        Ok(map_response(parsed))
    }

    fn chat_stream(&self, request: ChatRequest, cancel: CancellationToken) -> ChatStream {
        StreamCall {
            transport: self.transport.clone(),
            provider: self.kind(),
            decode: decode_frame,
            parse_error: parse_openai_error,
        }
        .spawn(self.build_request(&request, true), cancel)
    }

    async fn get_models(&self, _cancel: &CancellationToken) -> Vec<Model> {
        openai_models()
    }

    /// `GET /v1/models` is free and authenticated.
    async fn validate_credentials(&self, cancel: &CancellationToken) -> Result<(), LLMError> {
        let response = get_with_headers(
            self.transport.as_ref(),
            self.models_endpoint(),
            self.build_headers(),
            cancel,
        )
        .await?;
        ensure_success(response, parse_openai_error)
            .map(|_| ())
            .map_err(LLMError::into_credential_error)
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_temperature: false,
            supports_web_search: false,
            dynamic_catalog: false,
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }
}
