mod common;

use std::time::Duration;

use kotoba_gateway::provider::google_gemini::{GoogleGeminiProvider, gemini_fallback_models};
use kotoba_gateway::provider::model_cache::ModelCache;
use kotoba_gateway::{ChatRequest, LLMError, LLMProvider, Message, Model, ProviderKind};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> GoogleGeminiProvider {
    GoogleGeminiProvider::new(common::transport(), "AIza-test")
        .expect("provider")
        .with_base_url(server.uri())
}

fn request() -> ChatRequest {
    ChatRequest::new(
        Model::new(
            "gemini-2.5-flash",
            "Gemini 2.5 Flash",
            ProviderKind::Gemini,
            65_536,
            1_048_576,
        ),
        vec![
            Message::system("Answer in one word."),
            Message::user("Capital of France?"),
            Message::assistant("Paris"),
            Message::user("And Italy?"),
        ],
    )
}

#[tokio::test]
async fn chat_round_trip_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "AIza-test"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "Answer in one word."}]},
            "contents": [
                {"role": "user", "parts": [{"text": "Capital of France?"}]},
                {"role": "model", "parts": [{"text": "Paris"}]},
                {"role": "user", "parts": [{"text": "And Italy?"}]}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Rome"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 21, "candidatesTokenCount": 1, "totalTokenCount": 22}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server)
        .chat(request(), &CancellationToken::new())
        .await
        .expect("chat");
    assert_eq!(response.content, "Rome");
    assert_eq!(response.usage.input_tokens, 21);
    assert_eq!(response.usage.output_tokens, 1);
}

#[tokio::test]
async fn stream_uses_sse_endpoint_and_stops_at_finish_reason() {
    let server = MockServer::start().await;
    let body = common::sse_body(&[
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Ro"}]}}]}"#,
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"me"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":21,"candidatesTokenCount":1}}"#,
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"ignored"}]}}]}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let text = provider(&server)
        .chat_stream(request(), CancellationToken::new())
        .collect_text()
        .await
        .expect("stream");
    assert_eq!(text, "Rome");
}

#[tokio::test]
async fn model_catalog_is_cached_between_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("pageSize", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {
                    "name": "models/gemini-2.5-pro",
                    "displayName": "Gemini 2.5 Pro",
                    "inputTokenLimit": 1048576,
                    "outputTokenLimit": 65536,
                    "supportedGenerationMethods": ["generateContent", "countTokens"]
                },
                {
                    "name": "models/text-embedding-004",
                    "displayName": "Text Embedding 004",
                    "inputTokenLimit": 2048,
                    "outputTokenLimit": 1,
                    "supportedGenerationMethods": ["embedContent"]
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let cancel = CancellationToken::new();
    let first = provider.get_models(&cancel).await;
    let second = provider.get_models(&cancel).await;

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "gemini-2.5-pro");
    assert_eq!(first[0].max_tokens, 65_536);
    assert_eq!(first[0].context_window, 1_048_576);
}

#[tokio::test]
async fn zero_ttl_cache_refetches_every_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{
                "name": "models/gemini-2.0-flash",
                "supportedGenerationMethods": ["generateContent"]
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider(&server).with_model_cache(ModelCache::new(Duration::ZERO));
    let cancel = CancellationToken::new();
    let models = provider.get_models(&cancel).await;
    assert_eq!(models[0].id, "gemini-2.0-flash");
    assert_eq!(models[0].name, "gemini-2.0-flash");
    provider.get_models(&cancel).await;
}

#[tokio::test]
async fn model_catalog_falls_back_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "The service is currently unavailable.", "status": "UNAVAILABLE"}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let cancel = CancellationToken::new();
    assert_eq!(provider.get_models(&cancel).await, gemini_fallback_models());
    // failures are not cached, so the second call goes back to the network
    assert_eq!(provider.get_models(&cancel).await, gemini_fallback_models());
}

#[tokio::test]
async fn validate_credentials_classifies_api_key_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                    "reason": "API_KEY_INVALID",
                    "domain": "googleapis.com"
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .validate_credentials(&CancellationToken::new())
        .await
        .expect_err("invalid key");
    match err {
        LLMError::InvalidCredential { provider, message } => {
            assert_eq!(provider, ProviderKind::Gemini);
            assert!(message.contains("API key not valid"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
