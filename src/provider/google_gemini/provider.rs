use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpRequest, build_post_json, get_with_headers, send_cancellable,
};
use crate::provider::model_cache::ModelCache;
use crate::provider::{
    LLMProvider, StreamCall, decode_json, ensure_success, require_credential, versioned_url,
};
use crate::stream::ChatStream;
use crate::types::{CapabilityDescriptor, ChatRequest, ChatResponse, Model, ProviderKind};

use super::error::{is_invalid_api_key, parse_gemini_error};
use super::models::{gemini_fallback_models, normalize_model};
use super::request::build_gemini_body;
use super::response::map_response;
use super::stream::decode_frame;
use super::types::{GeminiModelList, GeminiResponse};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";
const MODELS_PAGE_SIZE: u32 = 1000;
const MAX_MODEL_PAGES: usize = 10;

/// Google Gemini Provider，模型目录在线获取并缓存
pub struct GoogleGeminiProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    cache: ModelCache,
}

impl GoogleGeminiProvider {
    /// 创建 GoogleGeminiProvider，空凭据直接报错
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Result<Self, LLMError> {
        Ok(Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: require_credential(ProviderKind::Gemini, api_key)?,
            cache: ModelCache::default(),
        })
    }

    /// 自定义 base_url，便于接入代理或兼容层
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replaces the model cache, e.g. to change its TTL.
    pub fn with_model_cache(mut self, cache: ModelCache) -> Self {
        self.cache = cache;
        self
    }

    pub(crate) fn endpoint(&self, model: &str) -> String {
        versioned_url(
            &self.base_url,
            API_VERSION,
            &format!("/models/{}:generateContent", normalize_model_id(model)),
        )
    }

    pub(crate) fn stream_endpoint(&self, model: &str) -> String {
        versioned_url(
            &self.base_url,
            API_VERSION,
            &format!(
                "/models/{}:streamGenerateContent?alt=sse",
                normalize_model_id(model)
            ),
        )
    }

    /// Catalog URL; the page token is opaque and gets percent-encoded.
    fn models_endpoint(
        &self,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<String, LLMError> {
        let base = versioned_url(&self.base_url, API_VERSION, "/models");
        let mut url = Url::parse(&base).map_err(|err| LLMError::Validation {
            message: format!("invalid gemini base_url {base}: {err}"),
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &page_size.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        Ok(url.into())
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([("x-goog-api-key".to_string(), self.api_key.clone())])
    }

    /// Translates a chat request into a generateContent call.
    pub(crate) fn build_request(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<HttpRequest, LLMError> {
        let body = build_gemini_body(request)?;
        let url = if stream {
            self.stream_endpoint(&request.model.id)
        } else {
            self.endpoint(&request.model.id)
        };
        build_post_json(url, self.build_headers(), &body)
    }

    /// Fetches every page of the live catalog.
    async fn fetch_models(&self, cancel: &CancellationToken) -> Result<Vec<Model>, LLMError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let response = get_with_headers(
                self.transport.as_ref(),
                self.models_endpoint(MODELS_PAGE_SIZE, page_token.as_deref())?,
                self.build_headers(),
                cancel,
            )
            .await?;
            let response = ensure_success(response, parse_gemini_error)?;
            let page: GeminiModelList = decode_json(self.kind(), &response.body)?;

            models.extend(page.models.into_iter().filter_map(normalize_model));
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

fn normalize_model_id(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

#[async_trait]
impl LLMProvider for GoogleGeminiProvider {
    async fn chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, LLMError> {
        let http_request = self.build_request(&request, false)?;
        let response = send_cancellable(self.transport.as_ref(), http_request, cancel).await?;
        let response = ensure_success(response, parse_gemini_error)?;
        let parsed: GeminiResponse = decode_json(self.kind(), &response.body)?;
        Ok(map_response(parsed))
    }

    fn chat_stream(&self, request: ChatRequest, cancel: CancellationToken) -> ChatStream {
        StreamCall {
            transport: self.transport.clone(),
            provider: self.kind(),
            decode: decode_frame,
            parse_error: parse_gemini_error,
        }
        .spawn(self.build_request(&request, true), cancel)
    }

    /// Serves the cached catalog while fresh, otherwise refetches it.
    ///
    /// Fetch failures are not reported; the built-in catalog is returned instead
    /// and the cache is left untouched.
    async fn get_models(&self, cancel: &CancellationToken) -> Vec<Model> {
        if let Some(models) = self.cache.get().await {
            return models;
        }

        match self.fetch_models(cancel).await {
            Ok(models) if !models.is_empty() => {
                tracing::info!(provider = %self.kind(), count = models.len(), "model catalog refreshed");
                self.cache.store(models.clone()).await;
                models
            }
            Ok(_) => {
                tracing::warn!(provider = %self.kind(), "model catalog is empty, using fallback");
                gemini_fallback_models()
            }
            Err(err) => {
                tracing::warn!(provider = %self.kind(), error = %err, "model catalog fetch failed, using fallback");
                gemini_fallback_models()
            }
        }
    }

    async fn validate_credentials(&self, cancel: &CancellationToken) -> Result<(), LLMError> {
        let response = get_with_headers(
            self.transport.as_ref(),
            self.models_endpoint(1, None)?,
            self.build_headers(),
            cancel,
        )
        .await?;
        ensure_success(response, parse_gemini_error)
            .map(|_| ())
            .map_err(|err| match err {
                LLMError::Provider(err) if is_invalid_api_key(&err) => {
                    LLMError::InvalidCredential {
                        provider: err.provider,
                        message: err.message,
                    }
                }
                other => other,
            })
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_temperature: true,
            supports_web_search: false,
            dynamic_catalog: true,
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }
}
