use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;

use crate::error::LLMError;
use crate::provider::DynProvider;
use crate::stream::ChatStream;
use crate::types::{CapabilityDescriptor, ChatRequest, ChatResponse, Model, ProviderKind};

/// LLM 调用入口，按 `request.model.provider` 路由到已注册的 Provider
pub struct LLMClient {
    providers: BTreeMap<ProviderKind, DynProvider>,
}

impl LLMClient {
    /// 创建 Builder 便于后续注册 Provider
    pub fn builder() -> LLMClientBuilder {
        LLMClientBuilder {
            providers: BTreeMap::new(),
        }
    }

    /// 发送非流式聊天请求
    pub async fn chat(
        &self,
        mut request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, LLMError> {
        let provider = self.get_provider(request.model.provider)?;
        if request.stream {
            tracing::debug!(provider = %request.model.provider, "stream flag set on a buffered chat call, clearing");
            request.stream = false;
        }
        provider.chat(request, cancel).await
    }

    /// 发起流式聊天请求；未注册的供应商直接报错，不会创建通道
    pub fn chat_stream(
        &self,
        mut request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<ChatStream, LLMError> {
        let provider = self.get_provider(request.model.provider)?;
        request.stream = true;
        Ok(provider.chat_stream(request, cancel))
    }

    /// 查询指定供应商的模型列表
    pub async fn get_models(
        &self,
        kind: ProviderKind,
        cancel: &CancellationToken,
    ) -> Result<Vec<Model>, LLMError> {
        let provider = self.get_provider(kind)?;
        Ok(provider.get_models(cancel).await)
    }

    /// 校验指定供应商的凭据
    pub async fn validate_credentials(
        &self,
        kind: ProviderKind,
        cancel: &CancellationToken,
    ) -> Result<(), LLMError> {
        let provider = self.get_provider(kind)?;
        provider.validate_credentials(cancel).await
    }

    /// 返回当前已注册的供应商
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }

    /// 查询指定供应商的能力描述
    pub fn capabilities(&self, kind: ProviderKind) -> Result<CapabilityDescriptor, LLMError> {
        let provider = self.get_provider(kind)?;
        Ok(provider.capabilities())
    }

    /// 返回所有支持内置 web search 的供应商
    pub fn providers_supporting_web_search(&self) -> Vec<ProviderKind> {
        self.providers
            .iter()
            .filter(|(_, provider)| provider.capabilities().supports_web_search)
            .map(|(kind, _)| *kind)
            .collect()
    }

    fn get_provider(&self, kind: ProviderKind) -> Result<&DynProvider, LLMError> {
        self.providers
            .get(&kind)
            .ok_or_else(|| LLMError::UnknownProvider {
                provider: kind.to_string(),
            })
    }
}

/// 负责注册 Provider 的 Builder
pub struct LLMClientBuilder {
    providers: BTreeMap<ProviderKind, DynProvider>,
}

impl LLMClientBuilder {
    /// 以 `provider.kind()` 为键注册，重复注册时替换旧实例
    pub fn register(mut self, provider: DynProvider) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// 构建最终的 LLMClient
    pub fn build(self) -> LLMClient {
        LLMClient {
            providers: self.providers,
        }
    }
}
