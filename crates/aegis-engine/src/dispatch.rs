//! Provider dispatcher — resolves a model reference to the provider that
//! should serve it.
//!
//! Given a string like `"anthropic:claude-opus-4-6"`, `"ollama/qwen2.5"`, or
//! a bare `"sonnet"`, [`resolve`] splits an optional provider prefix, then
//! resolves an alias within that provider's (or, with no prefix, every
//! configured provider's) alias map. The bare model id that comes out the
//! other end is what actually gets sent on the wire; which adapter
//! (`Box<dyn LlmProvider>`) answers for a given provider id is a concern of
//! the caller that owns the provider instances (main.rs wiring), not this
//! module — `resolve` only makes the routing *decision*.

use std::collections::HashMap;

use aegis_core::config::{ModelOverlay, ProviderModels, ProvidersConfig};

/// A resolved routing decision for one model reference.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Provider id the model resolved to (e.g. `"anthropic"`, `"ollama"`,
    /// `"groq"` for an `openai_compat` entry).
    pub provider_id: String,
    /// The bare model id to send on the wire, alias already resolved.
    pub model_id: String,
    pub num_ctx: u32,
    pub thinking: bool,
    pub options: Option<serde_json::Value>,
}

/// Recognized provider prefixes, matched case-insensitively against the
/// text before the first `/` or `:` in a model reference.
const KNOWN_PREFIXES: &[&str] = &[
    "anthropic",
    "openai",
    "ollama",
    "deepseek",
    "google",
    "claude-cli",
    "claude_cli",
];

/// Resolve a model reference against the configured providers.
///
/// `default_provider` is used to break ties when no prefix was given and
/// more than one provider's alias map matches the bare reference.
pub fn resolve(
    model_ref: &str,
    providers: &ProvidersConfig,
    default_provider: &str,
) -> Option<Resolved> {
    let (prefix, rest) = split_prefix(model_ref);

    if let Some(provider_id) = prefix {
        let models = provider_models(providers, &provider_id)?;
        return Some(resolve_in_provider(&provider_id, models, rest));
    }

    // No prefix: scan every configured provider's alias/list for a match,
    // with the default provider winning ties.
    let mut candidates: Vec<(String, &ProviderModels)> = Vec::new();
    for id in known_provider_ids(providers) {
        if let Some(models) = provider_models(providers, &id) {
            if models.aliases.contains_key(rest) || models.list.iter().any(|m| m == rest) {
                candidates.push((id, models));
            }
        }
    }

    if candidates.is_empty() {
        // Nothing declared an alias or list entry for this bare id — fall
        // back to the default provider and pass the reference through
        // unresolved (the adapter itself may still recognize it).
        let models = provider_models(providers, default_provider)?;
        return Some(resolve_in_provider(default_provider, models, rest));
    }

    if candidates.len() > 1 {
        if let Some(pos) = candidates.iter().position(|(id, _)| id == default_provider) {
            let (id, models) = candidates.remove(pos);
            return Some(resolve_in_provider(&id, models, rest));
        }
    }

    let (id, models) = candidates.remove(0);
    Some(resolve_in_provider(&id, models, rest))
}

/// Split a case-insensitive provider prefix off the front of a model
/// reference, guarding against false positives: a `.` or `:` that appears
/// after the split point but isn't a recognized provider name (e.g. a
/// registry path like `meta-llama/Llama-3.1-70b` or an OpenRouter-style
/// `org/model:tag`) is left as part of the bare reference instead.
fn split_prefix(model_ref: &str) -> (Option<String>, &str) {
    for sep in [':', '/'] {
        if let Some(idx) = model_ref.find(sep) {
            let candidate = &model_ref[..idx];
            if KNOWN_PREFIXES.iter().any(|p| p.eq_ignore_ascii_case(candidate)) {
                return (Some(candidate.to_lowercase().replace('_', "-")), &model_ref[idx + 1..]);
            }
        }
    }
    (None, model_ref)
}

fn resolve_in_provider(provider_id: &str, models: &ProviderModels, rest: &str) -> Resolved {
    let model_id = models
        .aliases
        .get(rest)
        .cloned()
        .unwrap_or_else(|| rest.to_string());

    let overlay = models.overlays.get(&model_id).cloned().unwrap_or_default();
    let ModelOverlay { num_ctx, thinking, options } = overlay;

    Resolved {
        provider_id: provider_id.to_string(),
        model_id,
        num_ctx: num_ctx.unwrap_or(128_000),
        thinking: thinking.unwrap_or(false),
        options,
    }
}

fn known_provider_ids(providers: &ProvidersConfig) -> Vec<String> {
    let mut ids = Vec::new();
    if providers.anthropic.is_some() {
        ids.push("anthropic".to_string());
    }
    if providers.openai.is_some() {
        ids.push("openai".to_string());
    }
    if providers.ollama.is_some() {
        ids.push("ollama".to_string());
    }
    if providers.deepseek.is_some() {
        ids.push("deepseek".to_string());
    }
    if providers.google.is_some() {
        ids.push("google".to_string());
    }
    for entry in &providers.openai_compat {
        ids.push(entry.id.clone());
    }
    ids
}

fn provider_models<'a>(providers: &'a ProvidersConfig, id: &str) -> Option<&'a ProviderModels> {
    match id {
        "anthropic" => providers.anthropic.as_ref().map(|c| &c.models),
        "openai" => providers.openai.as_ref().map(|c| &c.models),
        "ollama" => providers.ollama.as_ref().map(|c| &c.models),
        "deepseek" => providers.deepseek.as_ref().map(|c| &c.models),
        "google" => providers.google.as_ref().map(|c| &c.models),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::config::AnthropicConfig;

    fn providers_with_anthropic(aliases: HashMap<String, String>) -> ProvidersConfig {
        ProvidersConfig {
            anthropic: Some(AnthropicConfig {
                api_key: "key".to_string(),
                base_url: "https://api.anthropic.com".to_string(),
                num_ctx: 200_000,
                models: ProviderModels {
                    list: vec!["claude-opus-4-6".to_string()],
                    default: Some("claude-opus-4-6".to_string()),
                    aliases,
                    fallbacks: vec![],
                    subagents: vec![],
                    overlays: HashMap::new(),
                },
            }),
            ..Default::default()
        }
    }

    #[test]
    fn explicit_prefix_resolves_alias() {
        let mut aliases = HashMap::new();
        aliases.insert("opus".to_string(), "claude-opus-4-6".to_string());
        let providers = providers_with_anthropic(aliases);
        let resolved = resolve("anthropic:opus", &providers, "anthropic").unwrap();
        assert_eq!(resolved.provider_id, "anthropic");
        assert_eq!(resolved.model_id, "claude-opus-4-6");
    }

    #[test]
    fn dotted_model_id_is_not_mistaken_for_a_prefix() {
        let providers = providers_with_anthropic(HashMap::new());
        let resolved = resolve("meta-llama/Llama-3.1-70b", &providers, "anthropic").unwrap();
        assert_eq!(resolved.model_id, "meta-llama/Llama-3.1-70b");
    }

    #[test]
    fn no_prefix_scans_aliases_across_providers() {
        let mut aliases = HashMap::new();
        aliases.insert("opus".to_string(), "claude-opus-4-6".to_string());
        let providers = providers_with_anthropic(aliases);
        let resolved = resolve("opus", &providers, "anthropic").unwrap();
        assert_eq!(resolved.provider_id, "anthropic");
        assert_eq!(resolved.model_id, "claude-opus-4-6");
    }
}
