//! Backend registry
//!
//! Maps model identifiers to everything needed to call them: provider,
//! resolved credentials, endpoint, token limits and rough cost figures. The
//! registry is built once at startup from [`RouterConfig`] and is read-only
//! afterwards; share it behind an `Arc`.
//!
//! Models whose credentials cannot be resolved are logged and left out, so
//! a lookup for them returns `None` exactly like an unknown id would.

use crate::config::{ModelConfig, ModelInfo, RouterConfig};
use crate::error::{RouterError, RouterResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Wire protocol family spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// `POST {base}/chat/completions` with bearer auth
    OpenAiCompatible,
    /// Azure deployments with `api-key` header and `api-version` query
    Azure,
    /// Anthropic messages API
    Anthropic,
}

impl ProviderKind {
    pub fn from_provider(provider: &str) -> Self {
        match provider {
            "azure" => ProviderKind::Azure,
            "anthropic" => ProviderKind::Anthropic,
            _ => ProviderKind::OpenAiCompatible,
        }
    }
}

/// Well-known API base for providers that do not need one configured
pub fn default_api_base(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("https://api.openai.com/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "mistral" => Some("https://api.mistral.ai/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "gemini" => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        "together_ai" => Some("https://api.together.xyz/v1"),
        "anthropic" => Some("https://api.anthropic.com/v1"),
        _ => None,
    }
}

/// Connection parameters handed to the completion transport
#[derive(Clone, PartialEq)]
pub struct ConnectionParams {
    pub kind: ProviderKind,
    pub api_key: String,
    pub api_base: String,
    pub api_version: Option<String>,
    pub deployment_id: Option<String>,
    /// Model name sent in the request body
    pub upstream_model: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("kind", &self.kind)
            .field("api_key", &"***")
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("deployment_id", &self.deployment_id)
            .field("upstream_model", &self.upstream_model)
            .finish()
    }
}

/// One callable backend
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub model_id: String,
    pub provider: String,
    pub connection: ConnectionParams,
    pub info: ModelInfo,
    pub comment: Option<String>,
}

/// Strip the provider prefix litellm-style ids carry (`groq/llama3` -> `llama3`)
fn upstream_model_name(provider: &str, model_id: &str) -> String {
    model_id
        .strip_prefix(provider)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(model_id)
        .to_string()
}

fn last_path_segment(model_id: &str) -> String {
    model_id.rsplit('/').next().unwrap_or(model_id).to_string()
}

/// Read-only table of callable models
#[derive(Debug, Default, Clone)]
pub struct BackendRegistry {
    entries: BTreeMap<String, ModelEntry>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration, reading credentials from the process environment
    pub fn from_config(config: &RouterConfig) -> Self {
        Self::from_config_with_env(config, |name| std::env::var(name).ok())
    }

    /// Build the registry with an explicit environment lookup
    pub fn from_config_with_env<F>(config: &RouterConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registry = Self::new();
        for (provider, models) in &config.providers {
            registry.register(provider, models, &config.model_defaults, &env);
        }
        info!(
            registered = registry.len(),
            configured = config.model_ids().len(),
            "Backend registry built"
        );
        registry
    }

    /// Register every model of one provider whose credentials resolve.
    ///
    /// Returns how many models were registered. Missing credentials are
    /// logged and skipped; a repeated model id replaces the earlier entry.
    pub fn register<F>(
        &mut self,
        provider: &str,
        models: &[ModelConfig],
        defaults: &ModelInfo,
        env: &F,
    ) -> usize
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registered = 0;

        for model in models {
            let Some(entry) = Self::resolve_entry(provider, model, defaults, env) else {
                continue;
            };

            if self.entries.contains_key(&entry.model_id) {
                warn!(model = %entry.model_id, "Model registered twice, keeping the last entry");
            }

            match &entry.comment {
                Some(comment) => info!(model = %entry.model_id, provider, "Registered model ({comment})"),
                None => info!(model = %entry.model_id, provider, "Registered model"),
            }

            self.entries.insert(entry.model_id.clone(), entry);
            registered += 1;
        }

        registered
    }

    /// Resolve credentials and endpoint for one model (None when unresolvable)
    fn resolve_entry<F>(
        provider: &str,
        model: &ModelConfig,
        defaults: &ModelInfo,
        env: &F,
    ) -> Option<ModelEntry>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = env(&model.api_key_env).filter(|key| !key.trim().is_empty());
        let Some(api_key) = api_key else {
            warn!(
                model = %model.model_id,
                env = %model.api_key_env,
                "API key not found, skipping registration"
            );
            return None;
        };

        let kind = ProviderKind::from_provider(provider);

        let endpoint = model
            .endpoint_env
            .as_deref()
            .and_then(|name| env(name))
            .filter(|value| !value.trim().is_empty());

        let api_base = match (kind, endpoint, &model.api_base) {
            (_, Some(endpoint), _) => endpoint,
            (_, None, Some(api_base)) => api_base.clone(),
            (ProviderKind::Azure, None, None) => {
                warn!(model = %model.model_id, "Azure endpoint not found, skipping registration");
                return None;
            }
            (_, None, None) => match default_api_base(provider) {
                Some(base) => base.to_string(),
                None => {
                    warn!(
                        model = %model.model_id,
                        provider,
                        "No API base known for provider, skipping registration"
                    );
                    return None;
                }
            },
        };

        if let Err(e) = url::Url::parse(&api_base) {
            warn!(model = %model.model_id, "Invalid endpoint '{}': {}, skipping registration", api_base, e);
            return None;
        }

        let deployment_id = match kind {
            ProviderKind::Azure => Some(
                model
                    .deployment_id
                    .clone()
                    .unwrap_or_else(|| last_path_segment(&model.model_id)),
            ),
            _ => model.deployment_id.clone(),
        };

        let upstream_model = model
            .upstream_model
            .clone()
            .unwrap_or_else(|| upstream_model_name(provider, &model.model_id));

        Some(ModelEntry {
            model_id: model.model_id.clone(),
            provider: provider.to_string(),
            connection: ConnectionParams {
                kind,
                api_key,
                api_base: api_base.trim_end_matches('/').to_string(),
                api_version: model.api_version.clone(),
                deployment_id,
                upstream_model,
            },
            info: defaults.merged(&model.model_info),
            comment: model.comment.clone(),
        })
    }

    /// Insert a prebuilt entry, returning the one it replaced
    pub fn insert(&mut self, entry: ModelEntry) -> RouterResult<Option<ModelEntry>> {
        if entry.model_id.trim().is_empty() {
            return Err(RouterError::invalid_registry("model entry with empty model_id"));
        }
        if let Err(e) = url::Url::parse(&entry.connection.api_base) {
            return Err(RouterError::invalid_registry(format!(
                "model '{}' has invalid api_base: {e}",
                entry.model_id
            )));
        }
        Ok(self.entries.insert(entry.model_id.clone(), entry))
    }

    pub fn lookup(&self, model_id: &str) -> Option<&ModelEntry> {
        self.entries.get(model_id)
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.entries.contains_key(model_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered entries ordered by model id
    pub fn entries(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelInfoOverride;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn model(model_id: &str, api_key_env: &str) -> ModelConfig {
        ModelConfig {
            model_id: model_id.to_string(),
            api_key_env: api_key_env.to_string(),
            endpoint_env: None,
            api_base: None,
            api_version: None,
            deployment_id: None,
            upstream_model: None,
            comment: None,
            model_info: ModelInfoOverride::default(),
        }
    }

    #[test]
    fn test_models_without_credentials_are_skipped() {
        let mut registry = BackendRegistry::new();
        let env = env_from(&[("GROQ_API_KEY", "gsk-test")]);
        let models = vec![
            model("groq/llama3-70b-8192", "GROQ_API_KEY"),
            model("mistral/mistral-large-latest", "MISTRAL_API_KEY"),
        ];

        let count = registry.register("groq", &models[..1], &ModelInfo::default(), &env);
        let skipped = registry.register("mistral", &models[1..], &ModelInfo::default(), &env);

        assert_eq!(count, 1);
        assert_eq!(skipped, 0);
        assert!(registry.lookup("groq/llama3-70b-8192").is_some());
        assert!(registry.lookup("mistral/mistral-large-latest").is_none());
    }

    #[test]
    fn test_blank_credentials_count_as_missing() {
        let mut registry = BackendRegistry::new();
        let env = env_from(&[("GROQ_API_KEY", "   ")]);
        let count = registry.register(
            "groq",
            &[model("groq/gemma2-9b-it", "GROQ_API_KEY")],
            &ModelInfo::default(),
            &env,
        );
        assert_eq!(count, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_upstream_model_strips_provider_prefix() {
        let mut registry = BackendRegistry::new();
        let env = env_from(&[("OPEN_ROUTER_API_KEY", "or-key")]);
        registry.register(
            "openrouter",
            &[model("openrouter/anthropic/claude-3-5-sonnet", "OPEN_ROUTER_API_KEY")],
            &ModelInfo::default(),
            &env,
        );

        let entry = registry.lookup("openrouter/anthropic/claude-3-5-sonnet").unwrap();
        assert_eq!(entry.connection.upstream_model, "anthropic/claude-3-5-sonnet");
        assert_eq!(entry.connection.api_base, "https://openrouter.ai/api/v1");
        assert_eq!(entry.connection.kind, ProviderKind::OpenAiCompatible);
    }

    #[test]
    fn test_azure_requires_endpoint_and_defaults_deployment() {
        let mut azure = model("azure/gpt-4.1", "AZURE_OPENAI_API_KEY");
        azure.endpoint_env = Some("AZURE_OPENAI_ENDPOINT".to_string());
        azure.api_version = Some("2024-05-01-preview".to_string());

        let mut registry = BackendRegistry::new();
        let no_endpoint = env_from(&[("AZURE_OPENAI_API_KEY", "az-key")]);
        assert_eq!(
            registry.register("azure", &[azure.clone()], &ModelInfo::default(), &no_endpoint),
            0
        );

        let env = env_from(&[
            ("AZURE_OPENAI_API_KEY", "az-key"),
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com/"),
        ]);
        assert_eq!(registry.register("azure", &[azure], &ModelInfo::default(), &env), 1);

        let entry = registry.lookup("azure/gpt-4.1").unwrap();
        assert_eq!(entry.connection.kind, ProviderKind::Azure);
        assert_eq!(entry.connection.deployment_id.as_deref(), Some("gpt-4.1"));
        assert_eq!(entry.connection.api_base, "https://example.openai.azure.com");
    }

    #[test]
    fn test_unknown_provider_without_api_base_is_skipped() {
        let mut registry = BackendRegistry::new();
        let env = env_from(&[("KEY", "value")]);
        let count = registry.register(
            "someprovider",
            &[model("someprovider/model", "KEY")],
            &ModelInfo::default(),
            &env,
        );
        assert_eq!(count, 0);
    }

    #[test]
    fn test_model_info_overrides_are_merged() {
        let mut groq = model("groq/llama3-70b-8192", "GROQ_API_KEY");
        groq.model_info.context_window = Some(8192);

        let mut registry = BackendRegistry::new();
        let env = env_from(&[("GROQ_API_KEY", "gsk")]);
        registry.register("groq", &[groq], &ModelInfo::default(), &env);

        let entry = registry.lookup("groq/llama3-70b-8192").unwrap();
        assert_eq!(entry.info.context_window, 8192);
        assert_eq!(entry.info.max_output_tokens, 4096);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut first = model("shared", "KEY_A");
        first.api_base = Some("https://a.example.com/v1".to_string());
        let mut second = model("shared", "KEY_B");
        second.api_base = Some("https://b.example.com/v1".to_string());

        let mut registry = BackendRegistry::new();
        let env = env_from(&[("KEY_A", "a"), ("KEY_B", "b")]);
        registry.register("openai", &[first], &ModelInfo::default(), &env);
        registry.register("mistral", &[second], &ModelInfo::default(), &env);

        assert_eq!(registry.len(), 1);
        let entry = registry.lookup("shared").unwrap();
        assert_eq!(entry.provider, "mistral");
        assert_eq!(entry.connection.api_key, "b");
    }

    #[test]
    fn test_debug_output_hides_api_key() {
        let mut registry = BackendRegistry::new();
        let env = env_from(&[("GROQ_API_KEY", "gsk-very-secret")]);
        registry.register(
            "groq",
            &[model("groq/gemma2-9b-it", "GROQ_API_KEY")],
            &ModelInfo::default(),
            &env,
        );

        let debug = format!("{:?}", registry.lookup("groq/gemma2-9b-it").unwrap());
        assert!(!debug.contains("gsk-very-secret"));
    }

    #[test]
    fn test_insert_rejects_malformed_entries() {
        let mut registry = BackendRegistry::new();
        let entry = ModelEntry {
            model_id: String::new(),
            provider: "openai".to_string(),
            connection: ConnectionParams {
                kind: ProviderKind::OpenAiCompatible,
                api_key: "k".to_string(),
                api_base: "https://api.openai.com/v1".to_string(),
                api_version: None,
                deployment_id: None,
                upstream_model: "gpt".to_string(),
            },
            info: ModelInfo::default(),
            comment: None,
        };
        assert!(matches!(
            registry.insert(entry),
            Err(RouterError::InvalidRegistry { .. })
        ));
    }

    #[test]
    fn test_builtin_config_without_env_registers_nothing() {
        let config = RouterConfig::builtin().unwrap();
        let registry = BackendRegistry::from_config_with_env(&config, |_| None);
        assert!(registry.is_empty());
    }
}
