//! Google Gemini GenerateContent adapter.

mod error;
mod models;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use models::gemini_fallback_models;
pub use provider::{DEFAULT_BASE_URL, GoogleGeminiProvider};
