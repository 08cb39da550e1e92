use crate::types::{Model, ProviderKind};

/// Reasoning models served by Chat Completions.
pub fn openai_models() -> Vec<Model> {
    [
        ("gpt-5", "GPT-5", 128_000, 400_000),
        ("gpt-5-mini", "GPT-5 mini", 128_000, 400_000),
        ("gpt-5-nano", "GPT-5 nano", 128_000, 400_000),
        ("o3", "o3", 100_000, 200_000),
        ("o4-mini", "o4-mini", 100_000, 200_000),
    ]
    .into_iter()
    .map(|(id, name, max_tokens, context_window)| {
        Model::new(id, name, ProviderKind::OpenAi, max_tokens, context_window)
    })
    .collect()
}
