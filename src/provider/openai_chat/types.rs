use serde::Deserialize;

/// Non-streaming Chat Completions response payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiChatResponse {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub(crate) usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiChoice {
    #[serde(default)]
    pub(crate) message: Option<OpenAiMessage>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

/// Assistant message; `content` is null for refusals and tool calls.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiMessage {
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) refusal: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct OpenAiUsage {
    #[serde(default)]
    pub(crate) prompt_tokens: Option<u64>,
    #[serde(default)]
    pub(crate) completion_tokens: Option<u64>,
}

/// One `chat.completion.chunk` payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiChatChunk {
    #[serde(default)]
    pub(crate) choices: Vec<OpenAiChunkChoice>,
    #[serde(default)]
    pub(crate) error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiChunkChoice {
    #[serde(default)]
    pub(crate) delta: Option<OpenAiDelta>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiDelta {
    #[serde(default)]
    pub(crate) content: Option<String>,
}

/// Error object used by the HTTP envelope and by in-stream failures.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiErrorDetail {
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) code: Option<serde_json::Value>,
}
