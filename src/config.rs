//! Router configuration loading and validation
//!
//! The router is configured from a TOML document with five sections:
//! `[engine]`, `[model_defaults]`, `[[providers.<name>]]`, `[fallback_chains]`
//! and `[request_types.<tag>]`. A built-in document ships with the crate and
//! is used when no file is supplied.
//!
//! Credentials are never part of the configuration. Models only name the
//! environment variables their API key and endpoint are read from, and those
//! are resolved when the backend registry is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Built-in configuration document
const BUILTIN_CONFIG: &str = include_str!("../config/router.toml");

/// Name of the fallback chain used for models without a specific entry
pub const DEFAULT_CHAIN_KEY: &str = "default";

/// Top-level router configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterConfig {
    #[serde(default)]
    pub engine: EngineSection,
    /// Cost and token limits merged under every model's own `model_info`
    #[serde(default)]
    pub model_defaults: ModelInfo,
    /// Provider name to the models offered through it
    #[serde(default)]
    pub providers: BTreeMap<String, Vec<ModelConfig>>,
    /// Model id to ordered fallback models, plus a required `default` entry
    pub fallback_chains: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub request_types: BTreeMap<String, RequestTypeConfig>,
}

/// Engine defaults applied when a request does not override them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Attempts per model before moving down the chain
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-attempt transport timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Responses shorter than this (after trimming) are rejected
    #[serde(default = "default_min_response_length")]
    pub min_response_length: usize,
    /// Optional bound on a whole multi-model run; unbounded when absent
    #[serde(default)]
    pub overall_deadline_secs: Option<u64>,
    /// Model used for unmapped request types or unavailable preferred models
    #[serde(default = "default_universal_model")]
    pub universal_default_model: String,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_min_response_length() -> usize {
    20
}

fn default_universal_model() -> String {
    "gpt-4.1-mini".to_string()
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            min_response_length: default_min_response_length(),
            overall_deadline_secs: None,
            universal_default_model: default_universal_model(),
        }
    }
}

impl EngineSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn overall_deadline(&self) -> Option<Duration> {
        self.overall_deadline_secs.map(Duration::from_secs)
    }
}

/// Cost and token limits of one model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub input_cost_per_token: f64,
    pub output_cost_per_token: f64,
    pub context_window: u32,
    pub max_output_tokens: u32,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            input_cost_per_token: 0.000002,
            output_cost_per_token: 0.000002,
            context_window: 32768,
            max_output_tokens: 4096,
        }
    }
}

impl ModelInfo {
    /// Overlay per-model overrides on top of these defaults
    pub fn merged(&self, overrides: &ModelInfoOverride) -> ModelInfo {
        ModelInfo {
            input_cost_per_token: overrides
                .input_cost_per_token
                .unwrap_or(self.input_cost_per_token),
            output_cost_per_token: overrides
                .output_cost_per_token
                .unwrap_or(self.output_cost_per_token),
            context_window: overrides.context_window.unwrap_or(self.context_window),
            max_output_tokens: overrides.max_output_tokens.unwrap_or(self.max_output_tokens),
        }
    }
}

/// Partial `model_info` block attached to a single model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelInfoOverride {
    pub input_cost_per_token: Option<f64>,
    pub output_cost_per_token: Option<f64>,
    pub context_window: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

/// One model offered by a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Unique identifier used by request types and fallback chains
    pub model_id: String,
    /// Environment variable containing the API key
    pub api_key_env: String,
    /// Environment variable containing the endpoint (required for Azure)
    pub endpoint_env: Option<String>,
    /// Fixed API base URL, overriding the provider default
    pub api_base: Option<String>,
    pub api_version: Option<String>,
    /// Azure deployment name; defaults to the last path segment of `model_id`
    pub deployment_id: Option<String>,
    /// Model name sent upstream; defaults to `model_id` without its provider prefix
    pub upstream_model: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub model_info: ModelInfoOverride,
}

/// Default model and system instruction for one request type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestTypeConfig {
    pub model: String,
    pub system_instruction: String,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RouterConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration shipped with the crate
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_CONFIG)
    }

    /// Check structural consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.engine.temperature) {
            return Err(ConfigError::InvalidConfig(format!(
                "engine.temperature {} must be between 0.0 and 2.0",
                self.engine.temperature
            )));
        }

        if self.engine.universal_default_model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "engine.universal_default_model must not be empty".to_string(),
            ));
        }

        if !self.fallback_chains.contains_key(DEFAULT_CHAIN_KEY) {
            return Err(ConfigError::InvalidConfig(format!(
                "[fallback_chains] requires a \"{DEFAULT_CHAIN_KEY}\" entry"
            )));
        }

        for (provider, models) in &self.providers {
            if provider.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "provider names must not be empty".to_string(),
                ));
            }
            for model in models {
                validate_model_config(provider, model)?;
            }
        }

        for (tag, request_type) in &self.request_types {
            if request_type.model.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "request type '{tag}' has an empty model"
                )));
            }
        }

        Ok(())
    }

    /// Every model id named by the provider table, in declaration order
    pub fn model_ids(&self) -> Vec<&str> {
        self.providers
            .values()
            .flat_map(|models| models.iter().map(|m| m.model_id.as_str()))
            .collect()
    }

    /// Create a small configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[engine]
max_retries = 2
timeout_secs = 5

[[providers.openai]]
model_id = "primary"
api_key_env = "TEST_OPENAI_KEY"

[[providers.groq]]
model_id = "groq/secondary"
api_key_env = "TEST_GROQ_KEY"

[fallback_chains]
primary = ["groq/secondary"]
default = ["primary"]

[request_types.ask_question]
model = "primary"
system_instruction = "Answer the question."
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

fn validate_model_config(provider: &str, model: &ModelConfig) -> Result<(), ConfigError> {
    if model.model_id.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(format!(
            "provider '{provider}' has a model with an empty model_id"
        )));
    }

    if model.api_key_env.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(format!(
            "model '{}' has an empty api_key_env",
            model.model_id
        )));
    }

    if let Some(api_base) = &model.api_base {
        url::Url::parse(api_base).map_err(|e| {
            ConfigError::InvalidConfig(format!(
                "model '{}' has an invalid api_base '{api_base}': {e}",
                model.model_id
            ))
        })?;
    }

    if provider == "azure" && model.endpoint_env.is_none() && model.api_base.is_none() {
        return Err(ConfigError::InvalidConfig(format!(
            "azure model '{}' needs endpoint_env or api_base",
            model.model_id
        )));
    }

    Ok(())
}
