use serde_json::{Map, Value, json};

use crate::error::LLMError;
use crate::provider::{
    ensure_conversation, resolve_max_tokens, resolve_temperature, split_system_message,
};
use crate::types::{ChatRequest, ProviderKind, Role};

/// 构建 Gemini generateContent 请求体
///
/// Streaming is selected by the endpoint, so the body is identical for both modes.
pub(crate) fn build_gemini_body(request: &ChatRequest) -> Result<Value, LLMError> {
    let (system, conversation) = split_system_message(&request.messages, ProviderKind::Gemini);
    ensure_conversation(&conversation, ProviderKind::Gemini)?;

    if request.features.web_search {
        tracing::debug!(provider = %ProviderKind::Gemini, "web search is not supported, ignoring");
    }

    // Gemini 使用 user / model 两种角色
    let contents = conversation
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::Assistant => "model",
                _ => "user",
            };
            json!({ "role": role, "parts": [{ "text": message.content }] })
        })
        .collect();

    let mut body = Map::new();
    body.insert("contents".to_string(), Value::Array(contents));

    if let Some(system) = system {
        body.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": system }] }),
        );
    }

    body.insert(
        "generationConfig".to_string(),
        json!({
            "temperature": resolve_temperature(request),
            "maxOutputTokens": resolve_max_tokens(request),
        }),
    );

    Ok(Value::Object(body))
}
