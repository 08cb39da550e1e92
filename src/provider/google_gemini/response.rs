use crate::types::{ChatResponse, Usage};

use super::types::{GeminiResponse, GeminiUsageMetadata};

pub(crate) fn map_response(resp: GeminiResponse) -> ChatResponse {
    if let Some(reason) = resp
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        tracing::debug!(block_reason = reason, "gemini blocked the prompt");
    }

    let content = resp
        .candidates
        .first()
        .map(|candidate| candidate.text())
        .unwrap_or_default();

    ChatResponse {
        content,
        usage: resp.usage_metadata.as_ref().map(convert_usage).unwrap_or_default(),
    }
}

pub(crate) fn convert_usage(usage: &GeminiUsageMetadata) -> Usage {
    Usage {
        input_tokens: usage.prompt_token_count.unwrap_or_default(),
        output_tokens: usage.candidates_token_count.unwrap_or_default(),
    }
}
