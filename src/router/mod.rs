//! Quota-aware routing across LLM providers
//!
//! The pieces, bottom-up: the backend registry, the request-type policy,
//! the fallback chain table, the message composer, the response validator,
//! and the fallback state machine driven by [`Router`].

pub mod composer;
pub mod engine;
pub mod fallback;
pub mod health;
pub mod llm_router;
pub mod policy;
pub mod registry;
pub mod request;
pub mod validator;

pub use engine::{FallbackRun, Observation, Step, Transition};
pub use fallback::FallbackChains;
pub use health::{ProbeResult, ProbeStatus};
pub use llm_router::Router;
pub use policy::RequestTypePolicy;
pub use registry::{BackendRegistry, ConnectionParams, ModelEntry, ProviderKind};
pub use request::{AttemptOutcome, AttemptResult, CallResult, LlmRequest};
pub use validator::{validate, Verdict};
