use serde::Deserialize;

/// GenerateContent response; streaming frames share the same shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub(crate) usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    pub(crate) prompt_feedback: Option<GeminiPromptFeedback>,
    /// Present only on in-stream failures.
    #[serde(default)]
    pub(crate) error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContent>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default)]
    pub(crate) parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiPart {
    #[serde(default)]
    pub(crate) text: Option<String>,
    /// Thought summaries of 2.5 models are not part of the answer.
    #[serde(default)]
    pub(crate) thought: Option<bool>,
}

impl GeminiCandidate {
    /// Concatenated answer text, skipping thought parts.
    pub(crate) fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter(|part| part.thought != Some(true))
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiUsageMetadata {
    #[serde(default)]
    pub(crate) prompt_token_count: Option<u64>,
    #[serde(default)]
    pub(crate) candidates_token_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiPromptFeedback {
    #[serde(default)]
    pub(crate) block_reason: Option<String>,
}

/// `google.rpc.Status` error object.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiErrorDetail {
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) details: Vec<GeminiErrorInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiErrorInfo {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

/// Page of `GET /v1beta/models`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiModelList {
    #[serde(default)]
    pub(crate) models: Vec<GeminiModelInfo>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiModelInfo {
    /// Resource name, e.g. `models/gemini-2.5-flash`.
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) display_name: Option<String>,
    #[serde(default)]
    pub(crate) input_token_limit: Option<u32>,
    #[serde(default)]
    pub(crate) output_token_limit: Option<u32>,
    #[serde(default)]
    pub(crate) supported_generation_methods: Vec<String>,
}
