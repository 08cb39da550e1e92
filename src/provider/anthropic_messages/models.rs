use crate::types::{Model, ProviderKind};

const CONTEXT_WINDOW: u32 = 200_000;

/// Models offered through the Anthropic Messages API.
pub fn anthropic_models() -> Vec<Model> {
    [
        ("claude-opus-4-1", "Claude Opus 4.1", 32_000),
        ("claude-sonnet-4-5", "Claude Sonnet 4.5", 64_000),
        ("claude-haiku-4-5", "Claude Haiku 4.5", 64_000),
    ]
    .into_iter()
    .map(|(id, name, max_tokens)| {
        Model::new(id, name, ProviderKind::Anthropic, max_tokens, CONTEXT_WINDOW)
    })
    .collect()
}
