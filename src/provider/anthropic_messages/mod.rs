//! Anthropic Messages API adapter.

mod error;
mod models;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use models::anthropic_models;
pub use provider::{DEFAULT_BASE_URL, AnthropicMessagesProvider};
