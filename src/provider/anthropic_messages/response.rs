use crate::types::{ChatResponse, Usage};

use super::types::{AnthropicMessageResponse, AnthropicUsage};

/// Concatenates every text block; tool and citation blocks carry no output text.
pub(crate) fn map_response(resp: AnthropicMessageResponse) -> ChatResponse {
    tracing::debug!(
        id = resp.id.as_deref().unwrap_or_default(),
        stop_reason = resp.stop_reason.as_deref().unwrap_or_default(),
        "anthropic response received"
    );

    let content = resp
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<String>();

    ChatResponse {
        content,
        usage: resp.usage.as_ref().map(convert_usage).unwrap_or_default(),
    }
}

pub(crate) fn convert_usage(usage: &AnthropicUsage) -> Usage {
    Usage {
        input_tokens: usage.input_tokens.unwrap_or_default(),
        output_tokens: usage.output_tokens.unwrap_or_default(),
    }
}
