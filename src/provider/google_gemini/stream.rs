use crate::error::{LLMError, ProviderError};
use crate::stream::Decoded;
use crate::types::ProviderKind;

use super::error::describe;
use super::types::GeminiResponse;

/// Decodes one `streamGenerateContent?alt=sse` frame.
///
/// Gemini sends no `[DONE]`; the frame carrying `finishReason` ends the stream,
/// after forwarding any text it still carries.
pub(crate) fn decode_frame(frame: &str) -> Result<Decoded, LLMError> {
    let resp: GeminiResponse = match serde_json::from_str(frame) {
        Ok(resp) => resp,
        Err(err) => {
            tracing::debug!(provider = %ProviderKind::Gemini, error = %err, "skipping malformed frame");
            return Ok(Decoded::skip());
        }
    };

    if let Some(error) = resp.error {
        return Err(LLMError::Stream {
            provider: ProviderKind::Gemini,
            message: describe(error)
                .unwrap_or_else(|| ProviderError::unknown_message(ProviderKind::Gemini)),
        });
    }

    let Some(candidate) = resp.candidates.first() else {
        return Ok(Decoded::skip());
    };

    Ok(Decoded {
        text: candidate.text(),
        terminal: candidate.finish_reason.is_some(),
    })
}
