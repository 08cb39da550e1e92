use std::time::Duration;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::types::ProviderKind;

use super::types::AnthropicErrorDetail;

/// Parses error responses returned by the Anthropic Messages API.
///
/// The envelope is `{"type": "error", "error": {"type": ..., "message": ...}}`.
pub(crate) fn parse_anthropic_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> ProviderError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<AnthropicErrorDetail>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|error| error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            tracing::debug!(status, body, "anthropic error body has no message");
            ProviderError::unknown_message(ProviderKind::Anthropic)
        });

    ProviderError::new(status, ProviderKind::Anthropic, message).with_retry_after(retry_after)
}
