//! Configuration loading and validation tests
//!
//! Tests focus on observable outcomes of loading, validation and registry
//! construction, not on TOML parsing details.

use llm_router::config::{ConfigError, RouterConfig};
use llm_router::router::{BackendRegistry, FallbackChains, ProviderKind, Router};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
[engine]
temperature = 0.3
max_retries = 2
timeout_secs = 30
overall_deadline_secs = 120
universal_default_model = "groq/llama3-70b-8192"

[[providers.groq]]
model_id = "groq/llama3-70b-8192"
api_key_env = "GROQ_API_KEY"
model_info = { context_window = 8192 }

[fallback_chains]
default = ["groq/llama3-70b-8192"]

[request_types.ask_question]
model = "groq/llama3-70b-8192"
system_instruction = "Answer briefly."
"#,
    );

    let config = RouterConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.engine.temperature, 0.3);
    assert_eq!(config.engine.max_retries, 2);
    assert_eq!(config.engine.timeout(), Duration::from_secs(30));
    assert_eq!(config.engine.overall_deadline(), Some(Duration::from_secs(120)));
    assert_eq!(config.providers["groq"].len(), 1);
    assert_eq!(config.request_types["ask_question"].system_instruction, "Answer briefly.");
}

#[test]
fn test_engine_section_defaults() {
    let temp_file = write_config(
        r#"
[fallback_chains]
default = []
"#,
    );

    let config = RouterConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.engine.temperature, 0.7);
    assert_eq!(config.engine.max_retries, 3);
    assert_eq!(config.engine.timeout(), Duration::from_secs(60));
    assert_eq!(config.engine.min_response_length, 20);
    assert_eq!(config.engine.overall_deadline(), None);
    assert_eq!(config.engine.universal_default_model, "gpt-4.1-mini");
}

#[test]
fn test_missing_file_is_a_read_error() {
    let result = RouterConfig::load_from_file(std::path::Path::new("/nonexistent/router.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let temp_file = write_config("[engine\nmax_retries = ");
    let result = RouterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_missing_default_chain_is_rejected() {
    let temp_file = write_config(
        r#"
[fallback_chains]
gpt-4 = ["groq/llama3-70b-8192"]
"#,
    );
    let result = RouterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_invalid_api_base_is_rejected() {
    let temp_file = write_config(
        r#"
[[providers.openai]]
model_id = "gpt-4o"
api_key_env = "OPENAI_API_KEY"
api_base = "not a url"

[fallback_chains]
default = []
"#,
    );
    let result = RouterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_azure_without_endpoint_is_rejected() {
    let temp_file = write_config(
        r#"
[[providers.azure]]
model_id = "gpt-4.1-mini"
api_key_env = "AZURE_OPENAI_API_KEY"

[fallback_chains]
default = []
"#,
    );
    let result = RouterConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_builtin_config_registers_models_with_credentials() {
    let config = RouterConfig::builtin().unwrap();
    let registry = BackendRegistry::from_config_with_env(&config, |name| match name {
        "GROQ_API_KEY" => Some("gsk-test".to_string()),
        "AZURE_OPENAI_API_KEY" => Some("az-key".to_string()),
        "AZURE_OPENAI_ENDPOINT" => Some("https://example.openai.azure.com".to_string()),
        _ => None,
    });

    assert!(registry.contains("gpt-4.1-mini"));
    assert!(registry.contains("groq/llama3-70b-8192"));
    assert!(!registry.contains("deepseek-r1"));
    assert!(!registry.contains("mistral/mistral-large-latest"));

    let azure = registry.lookup("gpt-4.1-mini").unwrap();
    assert_eq!(azure.connection.kind, ProviderKind::Azure);
    assert_eq!(azure.connection.deployment_id.as_deref(), Some("gpt-4.1-mini"));

    let groq = registry.lookup("groq/llama3-70b-8192").unwrap();
    assert_eq!(groq.connection.api_base, "https://api.groq.com/openai/v1");
    assert_eq!(groq.info.context_window, 8192);
}

#[test]
fn test_chains_are_cleaned_at_load() {
    let config = RouterConfig::from_toml_str(
        r#"
[fallback_chains]
a = ["a", "b", "c", "b"]
default = ["x", "x", "y"]
"#,
    )
    .unwrap();

    let chains = FallbackChains::from_config(&config);
    assert_eq!(chains.chain_for("a"), vec!["b", "c"]);
    assert_eq!(chains.default_chain(), ["x".to_string(), "y".to_string()].as_slice());
}

#[test]
fn test_router_resolution_without_calls() {
    let config = RouterConfig::builtin().unwrap();
    let router = Router::from_config_with_env(&config, |name| match name {
        "AZURE_AI_API_KEY" => Some("k".to_string()),
        "AZURE_AI_ENDPOINT" => Some("https://deepseek.example.com".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(router.default_model_for("journal_entry"), "deepseek-r1");
    assert_eq!(router.default_model_for("no_such_request_type"), "gpt-4.1-mini");
    assert_eq!(
        router.fallback_models("deepseek-r1").first().map(String::as_str),
        Some("gpt-4.1-mini")
    );
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = RouterConfig::builtin().unwrap();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let reparsed = RouterConfig::from_toml_str(&rendered).unwrap();
    assert_eq!(config, reparsed);
}
