use crate::error::{LLMError, ProviderError};
use crate::stream::Decoded;
use crate::types::ProviderKind;

use super::error::describe;
use super::types::OpenAiChatChunk;

/// Decodes one `chat.completion.chunk`.
///
/// Completion is signalled by the literal `[DONE]` payload, which the SSE layer
/// handles; a `finish_reason` is not terminal because the usage chunk follows it.
pub(crate) fn decode_frame(frame: &str) -> Result<Decoded, LLMError> {
    let chunk: OpenAiChatChunk = match serde_json::from_str(frame) {
        Ok(chunk) => chunk,
        Err(err) => {
            tracing::debug!(provider = %ProviderKind::OpenAi, error = %err, "skipping malformed frame");
            return Ok(Decoded::skip());
        }
    };

    if let Some(error) = chunk.error {
        return Err(LLMError::Stream {
            provider: ProviderKind::OpenAi,
            message: describe(error)
                .unwrap_or_else(|| ProviderError::unknown_message(ProviderKind::OpenAi)),
        });
    }

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .unwrap_or_default();
    Ok(Decoded::text(text))
}
