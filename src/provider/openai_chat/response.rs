use crate::types::{ChatResponse, Usage};

use super::types::OpenAiChatResponse;

/// Maps the first choice to a [`ChatResponse`]; a refusal is returned as the content.
pub(crate) fn map_response(resp: OpenAiChatResponse) -> ChatResponse {
    let usage = resp
        .usage
        .map(|usage| Usage {
            input_tokens: usage.prompt_tokens.unwrap_or_default(),
            output_tokens: usage.completion_tokens.unwrap_or_default(),
        })
        .unwrap_or_default();

    let choice = resp.choices.into_iter().next();
    tracing::debug!(
        id = resp.id.as_deref().unwrap_or_default(),
        finish_reason = choice
            .as_ref()
            .and_then(|choice| choice.finish_reason.as_deref())
            .unwrap_or_default(),
        "openai response received"
    );

    let content = choice
        .and_then(|choice| choice.message)
        .and_then(|message| message.content.or(message.refusal))
        .unwrap_or_default();

    ChatResponse { content, usage }
}
