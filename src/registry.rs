//! Maps provider tags to adapter constructors and display metadata.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::ProviderConfig;
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::DynProvider;
use crate::provider::anthropic_messages::{self, AnthropicMessagesProvider};
use crate::provider::google_gemini::{self, GoogleGeminiProvider};
use crate::provider::openai_chat::{self, OpenAiChatProvider};
use crate::types::{Model, ProviderKind};

/// Builds an adapter from a configuration entry.
pub type ProviderConstructor =
    fn(&ProviderConfig, DynHttpTransport) -> Result<DynProvider, LLMError>;

/// 描述一个可注册的供应商
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub kind: ProviderKind,
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub requires_auth: bool,
    /// Representative models, shown before a credential is available.
    pub models: fn() -> Vec<Model>,
    pub constructor: ProviderConstructor,
}

/// Registry of every adapter the gateway knows how to build.
pub struct ProviderRegistry {
    transport: DynHttpTransport,
    descriptors: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Registry preloaded with the three built-in adapters.
    pub fn new(transport: DynHttpTransport) -> Self {
        Self {
            transport,
            descriptors: builtin_descriptors(),
        }
    }

    /// Adds or replaces the descriptor for `descriptor.kind`.
    pub fn register(mut self, descriptor: ProviderDescriptor) -> Self {
        self.descriptors.retain(|existing| existing.kind != descriptor.kind);
        self.descriptors.push(descriptor);
        self
    }

    pub fn descriptors(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, kind: ProviderKind) -> Result<&ProviderDescriptor, LLMError> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.kind == kind)
            .ok_or_else(|| LLMError::UnknownProvider {
                provider: kind.to_string(),
            })
    }

    /// 根据配置创建 Provider
    pub fn create_from_config(&self, config: &ProviderConfig) -> Result<DynProvider, LLMError> {
        let descriptor = self.descriptor(config.provider)?;
        (descriptor.constructor)(config, self.transport.clone())
    }

    /// Creates an adapter for `kind` with default endpoint settings.
    pub fn create(&self, kind: ProviderKind, api_key: &str) -> Result<DynProvider, LLMError> {
        self.create_from_config(&ProviderConfig::new(kind, api_key))
    }

    /// Builds a throwaway adapter and runs its credential probe.
    pub async fn validate(
        &self,
        kind: ProviderKind,
        api_key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), LLMError> {
        let provider = self.create(kind, api_key)?;
        provider.validate_credentials(cancel).await
    }
}

fn builtin_descriptors() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor {
            kind: ProviderKind::Anthropic,
            display_name: "Anthropic",
            base_url: anthropic_messages::DEFAULT_BASE_URL,
            requires_auth: true,
            models: anthropic_messages::anthropic_models,
            constructor: create_anthropic,
        },
        ProviderDescriptor {
            kind: ProviderKind::OpenAi,
            display_name: "OpenAI",
            base_url: openai_chat::DEFAULT_BASE_URL,
            requires_auth: true,
            models: openai_chat::openai_models,
            constructor: create_openai,
        },
        ProviderDescriptor {
            kind: ProviderKind::Gemini,
            display_name: "Google Gemini",
            base_url: google_gemini::DEFAULT_BASE_URL,
            requires_auth: true,
            models: google_gemini::gemini_fallback_models,
            constructor: create_gemini,
        },
    ]
}

fn extra_str<'a>(config: &'a ProviderConfig, key: &str) -> Option<&'a str> {
    match config.extra.get(key) {
        Some(Value::String(value)) => Some(value.as_str()),
        _ => None,
    }
}

fn create_anthropic(
    config: &ProviderConfig,
    transport: DynHttpTransport,
) -> Result<DynProvider, LLMError> {
    let mut provider = AnthropicMessagesProvider::new(transport, config.api_key.clone())?;
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    if let Some(version) = extra_str(config, "version") {
        provider = provider.with_version(version);
    }
    if let Some(beta) = extra_str(config, "beta") {
        provider = provider.with_beta(beta);
    }
    Ok(Arc::new(provider))
}

fn create_openai(
    config: &ProviderConfig,
    transport: DynHttpTransport,
) -> Result<DynProvider, LLMError> {
    let mut provider = OpenAiChatProvider::new(transport, config.api_key.clone())?;
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    if let Some(organization) = extra_str(config, "organization") {
        provider = provider.with_organization(organization);
    }
    if let Some(project) = extra_str(config, "project") {
        provider = provider.with_project(project);
    }
    Ok(Arc::new(provider))
}

fn create_gemini(
    config: &ProviderConfig,
    transport: DynHttpTransport,
) -> Result<DynProvider, LLMError> {
    let mut provider = GoogleGeminiProvider::new(transport, config.api_key.clone())?;
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    Ok(Arc::new(provider))
}
