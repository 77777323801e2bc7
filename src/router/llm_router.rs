//! Multi-provider router
//!
//! [`Router`] ties the registry, request-type policy and fallback chains
//! together and drives a [`FallbackRun`] against a completion transport.
//! Two drivers exist, one awaiting an async transport and one blocking on a
//! synchronous transport; they differ only in how the transport is invoked.

use crate::config::{EngineSection, RouterConfig};
use crate::error::RouterResult;
use crate::llm::provider::{
    BlockingCompletionTransport, CompletionOptions, CompletionTransport, Message, RawResponse,
};
use crate::observability::metrics::metrics;
use crate::router::composer;
use crate::router::engine::{FallbackRun, Observation, Step};
use crate::router::fallback::FallbackChains;
use crate::router::policy::{RequestTypePolicy, ASK_QUESTION_REQUEST_TYPE};
use crate::router::registry::BackendRegistry;
use crate::router::request::{CallResult, LlmRequest};
use crate::router_span;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, Instrument};
use uuid::Uuid;

/// Router over a fixed set of backends
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<BackendRegistry>,
    policy: RequestTypePolicy,
    chains: FallbackChains,
    settings: EngineSection,
}

/// Everything a driver needs besides the run state
struct RunPlan {
    primary: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    min_response_length: usize,
    log_tag: Option<String>,
    started: Instant,
}

impl RunPlan {
    fn options(&self, run: &FallbackRun) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: run.attempt_timeout(self.timeout, Instant::now()),
        }
    }

    /// Caller tag for one model's log lines
    fn tag_for(&self, model: &str) -> Option<String> {
        self.log_tag.as_ref().map(|tag| {
            if model == self.primary {
                tag.clone()
            } else {
                format!("{tag}_fallback_{model}")
            }
        })
    }

    fn log_attempt(&self, model: &str, attempt: u32, max_retries: u32, transport: &str) {
        let log_tag = self.tag_for(model).unwrap_or_default();
        info!(
            model = %model,
            attempt,
            max_retries,
            transport,
            log_tag = %log_tag,
            "Attempting model"
        );
    }

    fn finish(
        &self,
        run: FallbackRun,
        accepted: Option<(String, RawResponse, String)>,
    ) -> CallResult {
        let skipped = run.skipped();
        let result = run.finish(accepted);
        let elapsed = self.started.elapsed();
        metrics().call_finished(result.is_success(), skipped, elapsed);

        if let Some(model) = &result.model_used {
            info!(
                model = %model,
                attempts = result.attempts.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Successfully got response from model"
            );
        }
        result
    }
}

impl Router {
    pub fn new(
        registry: Arc<BackendRegistry>,
        policy: RequestTypePolicy,
        chains: FallbackChains,
        settings: EngineSection,
    ) -> Self {
        Self {
            registry,
            policy,
            chains,
            settings,
        }
    }

    /// Build a router from configuration, resolving credentials from the process environment
    pub fn from_config(config: &RouterConfig) -> RouterResult<Self> {
        Self::from_config_with_env(config, |name| std::env::var(name).ok())
    }

    /// Build a router with an explicit environment lookup
    pub fn from_config_with_env<F>(config: &RouterConfig, env: F) -> RouterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        config.validate()?;
        Ok(Self::new(
            Arc::new(BackendRegistry::from_config_with_env(config, env)),
            RequestTypePolicy::from_config(config),
            FallbackChains::from_config(config),
            config.engine.clone(),
        ))
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Shared handle to the registry, for callers building several routers
    pub fn registry_handle(&self) -> Arc<BackendRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn policy(&self) -> &RequestTypePolicy {
        &self.policy
    }

    pub fn engine_settings(&self) -> &EngineSection {
        &self.settings
    }

    pub fn default_model_for(&self, request_type: &str) -> String {
        self.policy.default_model_for(request_type, &self.registry)
    }

    pub fn fallback_models(&self, model_id: &str) -> Vec<String> {
        self.chains.chain_for(model_id)
    }

    /// Primary model followed by its chain, in the order they will be tried
    pub fn models_to_try(&self, request: &LlmRequest) -> Vec<String> {
        let initial = match request.model_override.as_deref() {
            Some(model) if !model.trim().is_empty() => model.to_string(),
            _ => self.default_model_for(&request.request_type),
        };
        let mut models = vec![initial.clone()];
        models.extend(self.fallback_models(&initial));
        models
    }

    pub fn compose_messages(&self, request: &LlmRequest) -> Vec<Message> {
        composer::compose(
            &self.policy,
            &request.request_type,
            &request.primary_context,
            request.profile_context.as_deref(),
            request.question.as_deref(),
            request.messages_override.as_deref(),
        )
    }

    fn prepare(&self, request: &LlmRequest) -> (FallbackRun, RunPlan) {
        let started = Instant::now();
        let models = self.models_to_try(request);
        let deadline = request
            .overall_deadline
            .or_else(|| self.settings.overall_deadline())
            .map(|budget| started + budget);

        let plan = RunPlan {
            primary: models[0].clone(),
            messages: self.compose_messages(request),
            temperature: request.temperature.unwrap_or(self.settings.temperature),
            max_tokens: request.max_tokens,
            timeout: request.timeout.unwrap_or_else(|| self.settings.timeout()),
            min_response_length: self.settings.min_response_length,
            log_tag: request.log_tag.clone(),
            started,
        };

        let run = FallbackRun::new(
            models,
            request.max_retries.unwrap_or(self.settings.max_retries),
            deadline,
        );

        info!(
            primary = %plan.primary,
            chain_len = run.models().len() - 1,
            max_retries = run.max_retries(),
            "Starting router call"
        );
        metrics().call_started();

        (run, plan)
    }

    /// Generate a response, falling back through the chain until one validates.
    ///
    /// Never fails: a fully exhausted chain yields a [`CallResult`] without content.
    pub async fn answer_with_fallback(
        &self,
        transport: &dyn CompletionTransport,
        request: &LlmRequest,
    ) -> CallResult {
        let span = router_span!(
            run_id = %Uuid::new_v4(),
            request_type = %request.request_type
        );
        self.drive_async(transport, request).instrument(span).await
    }

    async fn drive_async(
        &self,
        transport: &dyn CompletionTransport,
        request: &LlmRequest,
    ) -> CallResult {
        let (mut run, plan) = self.prepare(request);
        let mut accepted = None;

        while let Step::Call { model, attempt } = run.next_step(Instant::now()) {
            let Some(entry) = self.registry.lookup(&model) else {
                run.observe(Observation::Unresolvable);
                continue;
            };

            plan.log_attempt(&model, attempt, run.max_retries(), transport.name());
            let options = plan.options(&run);
            let result = transport.complete(entry, &plan.messages, &options).await;

            if let Some((raw, content)) = run.settle(result, plan.min_response_length) {
                accepted = Some((model, raw, content));
                break;
            }
        }

        plan.finish(run, accepted)
    }

    /// Blocking twin of [`Router::answer_with_fallback`]
    pub fn answer_with_fallback_blocking(
        &self,
        transport: &dyn BlockingCompletionTransport,
        request: &LlmRequest,
    ) -> CallResult {
        let span = router_span!(
            run_id = %Uuid::new_v4(),
            request_type = %request.request_type
        );
        let _entered = span.enter();

        let (mut run, plan) = self.prepare(request);
        let mut accepted = None;

        while let Step::Call { model, attempt } = run.next_step(Instant::now()) {
            let Some(entry) = self.registry.lookup(&model) else {
                run.observe(Observation::Unresolvable);
                continue;
            };

            plan.log_attempt(&model, attempt, run.max_retries(), transport.name());
            let options = plan.options(&run);
            let result = transport.complete_blocking(entry, &plan.messages, &options);

            if let Some((raw, content)) = run.settle(result, plan.min_response_length) {
                accepted = Some((model, raw, content));
                break;
            }
        }

        plan.finish(run, accepted)
    }

    /// Single prompt against `model_id` and its chain.
    ///
    /// Returns `(content, model_used)`, both `None` when every model failed.
    pub async fn ask_simple(
        &self,
        transport: &dyn CompletionTransport,
        prompt: &str,
        model_id: &str,
        max_retries: u32,
        timeout: Duration,
    ) -> (Option<String>, Option<String>) {
        let request = LlmRequest::new(ASK_QUESTION_REQUEST_TYPE, prompt)
            .with_model(model_id)
            .with_max_retries(max_retries)
            .with_timeout(timeout);
        let result = self.answer_with_fallback(transport, &request).await;
        (result.content, result.model_used)
    }
}
