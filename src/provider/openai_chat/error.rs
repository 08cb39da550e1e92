use std::time::Duration;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::types::ProviderKind;

use super::types::OpenAiErrorDetail;

/// Parses error responses returned by the OpenAI API.
///
/// The `code` (or `type` when there is no code) is appended to the message so
/// callers can tell `insufficient_quota` apart from plain rate limiting.
pub(crate) fn parse_openai_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> ProviderError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAiErrorDetail>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(describe)
        .unwrap_or_else(|| {
            tracing::debug!(status, body, "openai error body has no message");
            ProviderError::unknown_message(ProviderKind::OpenAi)
        });

    ProviderError::new(status, ProviderKind::OpenAi, message).with_retry_after(retry_after)
}

/// Renders an error object as `message (code)`.
pub(crate) fn describe(detail: OpenAiErrorDetail) -> Option<String> {
    let message = detail.message.filter(|message| !message.is_empty())?;
    let code = detail
        .code
        .as_ref()
        .and_then(|code| code.as_str().map(str::to_string))
        .or(detail.kind);
    Some(match code {
        Some(code) => format!("{message} ({code})"),
        None => message,
    })
}
