//! Test helpers and utilities for integration tests

use llm_router::config::RouterConfig;
use llm_router::router::Router;

/// Three registered models, `primary` chaining to the other two
#[allow(dead_code)]
pub const THREE_MODEL_CONFIG: &str = r#"
[engine]
max_retries = 3
timeout_secs = 5
universal_default_model = "primary"

[[providers.openai]]
model_id = "primary"
api_key_env = "OPENAI_API_KEY"

[[providers.groq]]
model_id = "groq/secondary"
api_key_env = "GROQ_API_KEY"

[[providers.mistral]]
model_id = "mistral/tertiary"
api_key_env = "MISTRAL_API_KEY"

[fallback_chains]
primary = ["groq/secondary", "mistral/tertiary"]
default = ["primary", "groq/secondary"]

[request_types.ask_question]
model = "primary"
system_instruction = "Answer the question accurately."

[request_types.journal_entry]
model = "groq/secondary"
system_instruction = "You are a thoughtful writing assistant."
"#;

/// A response long enough and clean enough to pass validation
#[allow(dead_code)]
pub const VALID_ANSWER: &str = "Paris is the capital of France.";

/// Build a router where every credential resolves
#[allow(dead_code)]
pub fn router_from_toml(toml: &str) -> Router {
    let config = RouterConfig::from_toml_str(toml).expect("test config should parse");
    Router::from_config_with_env(&config, |_| Some("test-key".to_string()))
        .expect("test router should build")
}

#[allow(dead_code)]
pub fn three_model_router() -> Router {
    router_from_toml(THREE_MODEL_CONFIG)
}
