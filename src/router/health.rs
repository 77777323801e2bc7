//! Chain health probe
//!
//! Sends a tiny prompt to a model and to every model of its fallback chain,
//! once each, so operators can see which backends currently answer. The
//! probe bypasses retry, fallback and response validation.

use crate::error::sanitize_error_message;
use crate::llm::provider::{CompletionOptions, CompletionTransport, Message};
use crate::router::llm_router::Router;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

const PROBE_PROMPT: &str = "Say hello.";
const PROBE_TEMPERATURE: f32 = 0.2;
const PROBE_MAX_TOKENS: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ProbeStatus {
    Healthy,
    Failed(String),
}

/// Outcome of probing one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub model_id: String,
    pub provider: Option<String>,
    pub status: ProbeStatus,
    pub content: Option<String>,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn is_healthy(&self) -> bool {
        self.status == ProbeStatus::Healthy
    }
}

impl Router {
    /// Probe `model_id` followed by each model of its chain, sequentially
    pub async fn probe_chain(
        &self,
        transport: &dyn CompletionTransport,
        model_id: &str,
    ) -> Vec<ProbeResult> {
        let mut models = vec![model_id.to_string()];
        models.extend(self.fallback_models(model_id));

        let messages = [Message::user(PROBE_PROMPT)];
        let options = CompletionOptions {
            temperature: PROBE_TEMPERATURE,
            max_tokens: Some(PROBE_MAX_TOKENS),
            timeout: self
                .engine_settings()
                .timeout()
                .min(Duration::from_secs(30)),
        };

        let mut results = Vec::with_capacity(models.len());
        for model in models {
            let Some(entry) = self.registry().lookup(&model) else {
                warn!(model = %model, "Probe skipped, model not registered");
                results.push(ProbeResult {
                    model_id: model,
                    provider: None,
                    status: ProbeStatus::Failed("not registered".to_string()),
                    content: None,
                    error: None,
                });
                continue;
            };

            let result = match transport.complete(entry, &messages, &options).await {
                Ok(raw) => {
                    info!(model = %model, "Probe succeeded");
                    ProbeResult {
                        model_id: model,
                        provider: Some(entry.provider.clone()),
                        status: ProbeStatus::Healthy,
                        content: raw.content(),
                        error: None,
                    }
                }
                Err(e) => {
                    let reason = sanitize_error_message(&e.to_string());
                    warn!(model = %model, "Probe failed: {}", reason);
                    ProbeResult {
                        model_id: model,
                        provider: Some(entry.provider.clone()),
                        status: ProbeStatus::Failed(reason.clone()),
                        content: None,
                        error: Some(reason),
                    }
                }
            };
            results.push(result);
        }

        results
    }
}
