//! LLM 多后端统一调用库
//!
//! One [`LLMProvider`] per vendor (Anthropic Messages, OpenAI Chat Completions,
//! Google Gemini) behind a normalized request/response model, with streaming
//! delivered over a pair of bounded channels and cancellation through
//! [`tokio_util::sync::CancellationToken`].

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod registry;
pub mod stream;
pub mod types;

pub use client::LLMClient;
pub use config::{ProviderConfig, build_client_from_configs, build_provider_from_config};
pub use error::{LLMError, ProviderError};
pub use provider::retry::retry_with_backoff;
pub use provider::{DynProvider, LLMProvider};
pub use registry::{ProviderDescriptor, ProviderRegistry};
pub use stream::ChatStream;
pub use types::*;
