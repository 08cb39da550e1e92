use serde_json::{Map, Value, json};

use crate::error::LLMError;
use crate::provider::{ensure_conversation, resolve_max_tokens, split_system_message};
use crate::types::{ChatRequest, ProviderKind, Role};

/// 构建 Chat Completions 请求体
///
/// Reasoning models reject `temperature`, so it is never sent.
pub(crate) fn build_openai_chat_body(
    request: &ChatRequest,
    stream: bool,
) -> Result<Value, LLMError> {
    let (system, conversation) = split_system_message(&request.messages, ProviderKind::OpenAi);
    ensure_conversation(&conversation, ProviderKind::OpenAi)?;

    if request.temperature.is_some() {
        tracing::debug!(provider = %ProviderKind::OpenAi, "temperature is not supported, ignoring");
    }
    if request.features.web_search {
        tracing::debug!(provider = %ProviderKind::OpenAi, "web search is not supported, ignoring");
    }

    let mut messages = Vec::with_capacity(conversation.len() + 1);
    if let Some(system) = system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.extend(conversation.iter().map(|message| {
        let role = match message.role {
            Role::Assistant => "assistant",
            _ => "user",
        };
        json!({ "role": role, "content": message.content })
    }));

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.id.clone()));
    body.insert("messages".to_string(), Value::Array(messages));
    body.insert(
        "max_completion_tokens".to_string(),
        Value::from(resolve_max_tokens(request)),
    );

    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
        // 最后一个 chunk 附带 usage
        body.insert("stream_options".to_string(), json!({ "include_usage": true }));
    }

    Ok(Value::Object(body))
}
