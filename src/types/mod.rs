//! Shared data structures modeling chat requests, responses and model catalogs.
//!
//! These types normalize vendor-specific payloads so the rest of the crate can stay
//! agnostic of individual API differences.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LLMError;

/// Identifies one of the supported backend vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI Chat Completions API.
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini GenerateContent API.
    Gemini,
}

impl ProviderKind {
    /// Every provider known to the gateway, in registration order.
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
    ];

    /// Stable tag used in configuration files and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            _ => Err(LLMError::UnknownProvider {
                provider: value.to_string(),
            }),
        }
    }
}

/// Chat role understood by every vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation turn.
///
/// # Examples
///
/// ```
/// # use kotoba_gateway::types::{Message, Role};
/// let msg = Message::user("Describe the borrow checker");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(msg.content, "Describe the borrow checker");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// When the turn was authored; vendors never see it.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Model descriptor reported by a provider catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Identifier sent on the wire, e.g. `claude-sonnet-4-5`.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    pub provider: ProviderKind,
    /// Largest completion the model accepts; `0` means unknown.
    pub max_tokens: u32,
    /// Total context window; `0` means unknown.
    pub context_window: u32,
}

impl Model {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        provider: ProviderKind,
        max_tokens: u32,
        context_window: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider,
            max_tokens,
            context_window,
        }
    }
}

/// Optional vendor features toggled per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFeatures {
    /// Lets the model call the vendor's built-in web search tool.
    #[serde(default)]
    pub web_search: bool,
}

/// Chat request shared across all providers.
///
/// Message order is significant and preserved. Role `system` messages are lifted
/// out of the sequence by each adapter and placed in the vendor's system slot.
///
/// # Examples
///
/// ```
/// # use kotoba_gateway::types::{ChatRequest, Message, Model, ProviderKind};
/// let model = Model::new("gpt-5-mini", "GPT-5 mini", ProviderKind::OpenAi, 128_000, 400_000);
/// let request = ChatRequest::new(
///     model,
///     vec![Message::system("You are concise."), Message::user("Summarize Rust traits.")],
/// )
/// .with_temperature(0.3);
/// assert_eq!(request.messages.len(), 2);
/// assert_eq!(request.temperature, Some(0.3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: Model,
    pub messages: Vec<Message>,
    /// Sampling temperature; adapters that support it default to `0.7`.
    pub temperature: Option<f64>,
    /// Overrides the model's declared output limit when non-zero.
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub features: ChatFeatures,
    /// Mirrors the call that carries the request: [`LLMClient::chat_stream`]
    /// sets it and [`LLMClient::chat`] clears it. Adapters pick the wire mode
    /// from the method invoked, never from this flag.
    ///
    /// [`LLMClient::chat`]: crate::client::LLMClient::chat
    /// [`LLMClient::chat_stream`]: crate::client::LLMClient::chat_stream
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: Model, messages: Vec<Message>) -> Self {
        Self {
            model,
            messages,
            temperature: None,
            max_tokens: None,
            features: ChatFeatures::default(),
            stream: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.features.web_search = enabled;
        self
    }
}

/// Token accounting. Zero when the vendor does not report usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Normalized non-streaming reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Usage,
}

/// Incremental text fragment belonging to one in-flight stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
}

impl StreamChunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Capability descriptor used to filter providers at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Whether `temperature` is forwarded to the vendor.
    pub supports_temperature: bool,
    /// Whether [`ChatFeatures::web_search`] has any effect.
    pub supports_web_search: bool,
    /// Whether the catalog is fetched from the vendor instead of compiled in.
    pub dynamic_catalog: bool,
}
