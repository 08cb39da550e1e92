use crate::types::{Model, ProviderKind};

use super::types::GeminiModelInfo;

/// Output limit assumed when the catalog omits `outputTokenLimit`.
pub(crate) const FALLBACK_OUTPUT_TOKENS: u32 = 4096;
/// Context window assumed when the catalog omits `inputTokenLimit`.
pub(crate) const FALLBACK_CONTEXT_WINDOW: u32 = 32_768;

const GENERATE_CONTENT: &str = "generateContent";

/// Catalog served when the live model list cannot be fetched.
pub fn gemini_fallback_models() -> Vec<Model> {
    [
        ("gemini-2.5-pro", "Gemini 2.5 Pro", 65_536),
        ("gemini-2.5-flash", "Gemini 2.5 Flash", 65_536),
        ("gemini-2.0-flash", "Gemini 2.0 Flash", 8_192),
    ]
    .into_iter()
    .map(|(id, name, max_tokens)| {
        Model::new(id, name, ProviderKind::Gemini, max_tokens, 1_048_576)
    })
    .collect()
}

/// Converts one catalog entry, dropping models that cannot chat.
pub(crate) fn normalize_model(info: GeminiModelInfo) -> Option<Model> {
    if !info
        .supported_generation_methods
        .iter()
        .any(|method| method == GENERATE_CONTENT)
    {
        return None;
    }

    let id = info
        .name
        .strip_prefix("models/")
        .unwrap_or(&info.name)
        .to_string();
    let name = info
        .display_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.clone());

    Some(Model::new(
        id,
        name,
        ProviderKind::Gemini,
        info.output_token_limit
            .filter(|limit| *limit > 0)
            .unwrap_or(FALLBACK_OUTPUT_TOKENS),
        info.input_token_limit
            .filter(|limit| *limit > 0)
            .unwrap_or(FALLBACK_CONTEXT_WINDOW),
    ))
}
