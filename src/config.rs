use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::LLMClient;
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::DynProvider;
use crate::registry::ProviderRegistry;
use crate::types::ProviderKind;

/// 供应商配置，描述一个可调用后端
///
/// # Examples
///
/// ```
/// use kotoba_gateway::config::ProviderConfig;
/// use kotoba_gateway::ProviderKind;
///
/// let config: ProviderConfig = serde_json::from_str(
///     r#"{"provider": "anthropic", "api_key": "sk-ant", "extra": {"beta": "web-search-2025-03-05"}}"#,
/// )
/// .unwrap();
/// assert_eq!(config.provider, ProviderKind::Anthropic);
/// assert!(config.base_url.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    /// 已解析的凭据，由调用方从密钥存储中取出
    pub api_key: String,
    /// 覆盖默认 base_url，例如代理或本地 mock 服务
    #[serde(default)]
    pub base_url: Option<String>,
    /// 附加设置：Anthropic 的 `version` / `beta`，OpenAI 的 `organization` / `project`
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// 根据单个配置构建 Provider
pub fn build_provider_from_config(
    config: &ProviderConfig,
    transport: DynHttpTransport,
) -> Result<DynProvider, LLMError> {
    ProviderRegistry::new(transport).create_from_config(config)
}

/// 根据一组配置构建 LLMClient；同一供应商出现多次时后者覆盖前者
pub fn build_client_from_configs(
    configs: &[ProviderConfig],
    transport: DynHttpTransport,
) -> Result<LLMClient, LLMError> {
    let registry = ProviderRegistry::new(transport);
    let mut builder = LLMClient::builder();

    for config in configs {
        builder = builder.register(registry.create_from_config(config)?);
    }

    Ok(builder.build())
}
