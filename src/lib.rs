//! LLM Router
//!
//! Routes a prompt to one of many LLM backends, retrying and falling back
//! through a configured chain until a response passes validation.
//!
//! # Overview
//!
//! - Backend registry built once from configuration and the environment
//! - Request-type policy choosing a default model and system instruction
//! - Static fallback chains, validated at load time
//! - Heuristic response validation separating quota exhaustion from other failures
//! - One retry/fallback policy driven by an async and a blocking driver
//!
//! # Quick Start
//!
//! ```rust
//! use llm_router::config::RouterConfig;
//! use llm_router::router::{LlmRequest, Router};
//! use llm_router::testing::{ScriptedReply, ScriptedTransport};
//!
//! let config = RouterConfig::from_toml_str(r#"
//! [[providers.groq]]
//! model_id = "groq/llama3-70b-8192"
//! api_key_env = "GROQ_API_KEY"
//!
//! [fallback_chains]
//! default = []
//! "#)?;
//!
//! let router = Router::from_config_with_env(&config, |_| Some("gsk-test".to_string()))?;
//! let transport = ScriptedTransport::new().always(
//!     "groq/llama3-70b-8192",
//!     ScriptedReply::text("Paris is the capital of France."),
//! );
//!
//! let request = LlmRequest::new("ask_question", "What is the capital of France?")
//!     .with_model("groq/llama3-70b-8192");
//! let result = router.answer_with_fallback_blocking(&transport, &request);
//!
//! assert_eq!(result.content.as_deref(), Some("Paris is the capital of France."));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod router;
pub mod testing;

pub use config::{ConfigError, RouterConfig};
pub use error::{RouterError, RouterResult};
pub use llm::{
    BlockingBridge, BlockingCompletionTransport, CompletionOptions, CompletionTransport,
    HttpTransport, LlmError, Message, MessageRole, RawResponse,
};
pub use router::{CallResult, LlmRequest, Router, Verdict};
