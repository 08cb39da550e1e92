use crate::error::{LLMError, ProviderError};
use crate::stream::Decoded;
use crate::types::ProviderKind;

use super::types::AnthropicStreamEvent;

/// Decodes one Messages SSE payload.
///
/// Only `content_block_delta` text deltas produce output; `message_stop` ends
/// the stream and an `error` event fails it.
pub(crate) fn decode_frame(frame: &str) -> Result<Decoded, LLMError> {
    let event: AnthropicStreamEvent = match serde_json::from_str(frame) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(provider = %ProviderKind::Anthropic, error = %err, "skipping malformed frame");
            return Ok(Decoded::skip());
        }
    };

    match event.kind.as_str() {
        "content_block_delta" => {
            let text = event
                .delta
                .filter(|delta| delta.kind.as_deref().is_none_or(|kind| kind == "text_delta"))
                .and_then(|delta| delta.text)
                .unwrap_or_default();
            Ok(Decoded::text(text))
        }
        "message_stop" => Ok(Decoded::terminal()),
        "error" => {
            let detail = event.error;
            let message = detail
                .as_ref()
                .and_then(|error| error.message.clone())
                .unwrap_or_else(|| ProviderError::unknown_message(ProviderKind::Anthropic));
            let message = match detail.and_then(|error| error.kind) {
                Some(kind) => format!("{message} ({kind})"),
                None => message,
            };
            Err(LLMError::Stream {
                provider: ProviderKind::Anthropic,
                message,
            })
        }
        _ => Ok(Decoded::skip()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_yields_fragment() {
        let frame = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#;
        assert_eq!(decode_frame(frame).expect("decoded"), Decoded::text("Hel"));
    }

    #[test]
    fn tool_input_deltas_are_ignored() {
        let frame = r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"q"}}"#;
        assert_eq!(decode_frame(frame).expect("decoded"), Decoded::skip());
    }

    #[test]
    fn bookkeeping_events_produce_nothing() {
        for frame in [
            r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":3}}}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"ping"}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":5}}"#,
        ] {
            assert_eq!(decode_frame(frame).expect("decoded"), Decoded::skip());
        }
    }

    #[test]
    fn message_stop_is_terminal() {
        assert!(decode_frame(r#"{"type":"message_stop"}"#).expect("decoded").terminal);
    }

    #[test]
    fn malformed_json_is_skipped() {
        assert_eq!(decode_frame("{\"type\":").expect("lenient"), Decoded::skip());
    }

    #[test]
    fn error_event_fails_the_stream() {
        let frame = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        match decode_frame(frame) {
            Err(LLMError::Stream { provider, message }) => {
                assert_eq!(provider, ProviderKind::Anthropic);
                assert_eq!(message, "Overloaded (overloaded_error)");
            }
            other => panic!("expected stream error, got {other:?}"),
        }
    }
}
