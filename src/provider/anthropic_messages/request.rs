use serde_json::{Map, Value, json};

use crate::error::LLMError;
use crate::provider::{
    ensure_conversation, resolve_max_tokens, resolve_temperature, split_system_message,
};
use crate::types::{ChatRequest, ProviderKind, Role};

/// Upper bound on web searches the model may run for one request.
pub(crate) const WEB_SEARCH_MAX_USES: u32 = 5;

/// 构建 Anthropic Messages 请求体
pub(crate) fn build_anthropic_body(request: &ChatRequest, stream: bool) -> Result<Value, LLMError> {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.id.clone()));

    // 1. 第一条 system 进入顶层 system，其余消息保持原顺序
    let (system, conversation) = split_system_message(&request.messages, ProviderKind::Anthropic);
    ensure_conversation(&conversation, ProviderKind::Anthropic)?;

    let messages = conversation
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::Assistant => "assistant",
                _ => "user",
            };
            json!({ "role": role, "content": message.content })
        })
        .collect();
    body.insert("messages".to_string(), Value::Array(messages));

    if let Some(system) = system {
        body.insert("system".to_string(), Value::String(system.to_string()));
    }

    // 2. 采样与生成控制参数
    body.insert(
        "max_tokens".to_string(),
        Value::from(resolve_max_tokens(request)),
    );
    body.insert(
        "temperature".to_string(),
        Value::from(resolve_temperature(request)),
    );

    // 3. 内置 web search 工具
    if request.features.web_search {
        body.insert(
            "tools".to_string(),
            json!([{
                "type": "web_search_20250305",
                "name": "web_search",
                "max_uses": WEB_SEARCH_MAX_USES,
            }]),
        );
    }

    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
    }

    Ok(Value::Object(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, Model};

    fn model() -> Model {
        Model::new(
            "claude-sonnet-4-5",
            "Claude Sonnet 4.5",
            ProviderKind::Anthropic,
            64_000,
            200_000,
        )
    }

    #[test]
    fn system_message_moves_to_top_level_field() {
        let request = ChatRequest::new(
            model(),
            vec![
                Message::system("You are terse."),
                Message::user("Hi"),
                Message::assistant("Hello"),
                Message::user("Explain lifetimes"),
            ],
        );
        let body = build_anthropic_body(&request, false).expect("body");

        assert_eq!(body["system"], json!("You are terse."));
        assert_eq!(
            body["messages"],
            json!([
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello"},
                {"role": "user", "content": "Explain lifetimes"},
            ])
        );
        assert_eq!(body["max_tokens"], json!(64_000));
        assert_eq!(body["temperature"], json!(0.7));
        assert!(body.get("stream").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn explicit_sampling_parameters_win() {
        let request = ChatRequest::new(model(), vec![Message::user("Hi")])
            .with_temperature(0.2)
            .with_max_tokens(128);
        let body = build_anthropic_body(&request, true).expect("body");

        assert_eq!(body["temperature"], json!(0.2));
        assert_eq!(body["max_tokens"], json!(128));
        assert_eq!(body["stream"], json!(true));
        assert!(body.get("system").is_none());
    }

    #[test]
    fn web_search_appends_bounded_tool() {
        let request = ChatRequest::new(model(), vec![Message::user("News?")]).with_web_search(true);
        let body = build_anthropic_body(&request, false).expect("body");
        assert_eq!(
            body["tools"],
            json!([{"type": "web_search_20250305", "name": "web_search", "max_uses": 5}])
        );
    }

    #[test]
    fn only_system_messages_is_rejected() {
        let request = ChatRequest::new(model(), vec![Message::system("rules")]);
        let err = build_anthropic_body(&request, false).expect_err("no conversation");
        assert!(matches!(err, LLMError::Validation { .. }));
    }
}
