//! Retry and fallback policy
//!
//! [`FallbackRun`] is the whole decision procedure of a router invocation as
//! an explicit state machine. It never performs I/O: a driver asks it for the
//! next step, performs the call, and reports what happened. The blocking and
//! async drivers in `llm_router` are thin loops around it, so both call
//! styles follow exactly the same policy.
//!
//! Policy summary:
//! - the primary model is tried first, then the chain in configured order
//! - up to `max_retries` attempts per model
//! - a transport error or an invalid response retries the same model
//! - a quota verdict abandons the model immediately
//! - a model that already failed or hit its quota is never called again
//! - the run ends at the first valid response, or when the chain (or the
//!   optional overall deadline) is exhausted

use crate::error::sanitize_error_message;
use crate::llm::provider::{LlmError, RawResponse};
use crate::observability::metrics::{metrics, AttemptKind};
use crate::router::request::{AttemptOutcome, AttemptResult, CallResult};
use crate::router::validator::{self, Verdict};
use chrono::Utc;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// What the driver should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Issue attempt `attempt` (1-based) against `model`
    Call { model: String, attempt: u32 },
    /// Nothing left to try
    Exhausted,
}

/// What the driver observed for the step it just executed
#[derive(Debug)]
pub enum Observation<'a> {
    /// The model has no registry entry
    Unresolvable,
    /// The transport raised an error
    TransportFailed(&'a LlmError),
    /// The transport returned a response which the validator classified
    Classified(Verdict),
}

/// How the run continues after an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Accept,
    RetrySameModel,
    NextModel,
}

/// State of one router invocation
#[derive(Debug)]
pub struct FallbackRun {
    models: Vec<String>,
    index: usize,
    attempt: u32,
    max_retries: u32,
    deadline: Option<Instant>,
    deadline_hit: bool,
    skipped: usize,
    quota_limited: BTreeSet<String>,
    failed: BTreeSet<String>,
    attempts: Vec<AttemptOutcome>,
}

impl FallbackRun {
    /// Start a run over `models` (primary first). `max_retries` below 1 is treated as 1.
    pub fn new(models: Vec<String>, max_retries: u32, deadline: Option<Instant>) -> Self {
        Self {
            models,
            index: 0,
            attempt: 0,
            max_retries: max_retries.max(1),
            deadline,
            deadline_hit: false,
            skipped: 0,
            quota_limited: BTreeSet::new(),
            failed: BTreeSet::new(),
            attempts: Vec::new(),
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Models skipped because an earlier occurrence already failed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn deadline_hit(&self) -> bool {
        self.deadline_hit
    }

    pub fn attempts(&self) -> &[AttemptOutcome] {
        &self.attempts
    }

    /// Whether `model` has been given up on in this run
    pub fn is_spent(&self, model: &str) -> bool {
        self.quota_limited.contains(model) || self.failed.contains(model)
    }

    /// Decide the next step
    pub fn next_step(&mut self, now: Instant) -> Step {
        if let Some(deadline) = self.deadline {
            if now >= deadline {
                if !self.deadline_hit {
                    warn!("Overall deadline reached, abandoning remaining models");
                }
                self.deadline_hit = true;
                return Step::Exhausted;
            }
        }

        loop {
            let Some(model) = self.models.get(self.index) else {
                return Step::Exhausted;
            };

            if self.attempt == 0 && self.is_spent(model) {
                debug!(model = %model, "Skipping model that already failed in this run");
                self.skipped += 1;
                self.index += 1;
                continue;
            }

            if self.attempt >= self.max_retries {
                self.advance();
                continue;
            }

            self.attempt += 1;
            return Step::Call {
                model: model.clone(),
                attempt: self.attempt,
            };
        }
    }

    /// Per-attempt timeout, clamped to what is left of the overall deadline
    pub fn attempt_timeout(&self, requested: Duration, now: Instant) -> Duration {
        match self.deadline {
            Some(deadline) => requested.min(deadline.saturating_duration_since(now)),
            None => requested,
        }
    }

    /// Record the outcome of the current step
    pub fn observe(&mut self, observation: Observation<'_>) -> Transition {
        let Some(model) = self.models.get(self.index).cloned() else {
            return Transition::NextModel;
        };
        let attempt = self.attempt;
        let last_attempt = attempt >= self.max_retries;

        match observation {
            Observation::Unresolvable => {
                error!(model = %model, "Model not found in registry");
                metrics().attempt_finished(&model, AttemptKind::Unresolvable);
                self.record(&model, AttemptResult::OtherFailure("model not registered".to_string()));
                self.advance();
                Transition::NextModel
            }
            Observation::TransportFailed(err) => {
                let reason = sanitize_error_message(&err.to_string());
                warn!(model = %model, attempt, "Error with model: {}", reason);
                metrics().attempt_finished(&model, AttemptKind::TransportError);
                self.record(&model, AttemptResult::OtherFailure(reason));
                if last_attempt {
                    error!(model = %model, "All attempts failed for model");
                    self.failed.insert(model);
                    self.advance();
                    Transition::NextModel
                } else {
                    Transition::RetrySameModel
                }
            }
            Observation::Classified(Verdict::Valid) => {
                metrics().attempt_finished(&model, AttemptKind::Success);
                self.record(&model, AttemptResult::Success);
                Transition::Accept
            }
            Observation::Classified(Verdict::InvalidQuota) => {
                warn!(model = %model, "Model hit quota limit");
                metrics().attempt_finished(&model, AttemptKind::QuotaExhausted);
                self.record(&model, AttemptResult::QuotaExhausted);
                self.quota_limited.insert(model);
                self.advance();
                Transition::NextModel
            }
            Observation::Classified(Verdict::InvalidOther) => {
                warn!(model = %model, attempt, "Invalid response from model");
                metrics().attempt_finished(&model, AttemptKind::InvalidResponse);
                self.record(&model, AttemptResult::OtherFailure("invalid response".to_string()));
                if last_attempt {
                    error!(model = %model, "All attempts failed for model");
                    self.failed.insert(model);
                    self.advance();
                    Transition::NextModel
                } else {
                    Transition::RetrySameModel
                }
            }
        }
    }

    /// Classify a transport result and feed it to the run.
    ///
    /// Returns the accepted response and its content when the run is over.
    pub fn settle(
        &mut self,
        result: Result<RawResponse, LlmError>,
        min_response_length: usize,
    ) -> Option<(RawResponse, String)> {
        match result {
            Err(err) => {
                self.observe(Observation::TransportFailed(&err));
                None
            }
            Ok(raw) => {
                let content = raw.content();
                let verdict = validator::validate(content.as_deref(), min_response_length);
                match (self.observe(Observation::Classified(verdict)), content) {
                    (Transition::Accept, Some(content)) => Some((raw, content)),
                    _ => None,
                }
            }
        }
    }

    /// Close the run, logging the failure sets when nothing was accepted
    pub fn finish(self, accepted: Option<(String, RawResponse, String)>) -> CallResult {
        let (model_used, raw, content) = match accepted {
            Some((model, raw, content)) => (Some(model), Some(raw), Some(content)),
            None => {
                if !self.quota_limited.is_empty() {
                    warn!(
                        "Models with quota exceeded: {}",
                        self.quota_limited.iter().cloned().collect::<Vec<_>>().join(", ")
                    );
                }
                if !self.failed.is_empty() {
                    error!(
                        "Models that failed for other reasons: {}",
                        self.failed.iter().cloned().collect::<Vec<_>>().join(", ")
                    );
                }
                error!("All models and retries exhausted");
                (None, None, None)
            }
        };

        CallResult {
            raw,
            content,
            model_used,
            attempts: self.attempts,
            quota_limited: self.quota_limited,
            failed: self.failed,
        }
    }

    fn record(&mut self, model: &str, result: AttemptResult) {
        self.attempts.push(AttemptOutcome {
            model_id: model.to_string(),
            attempt_number: self.attempt,
            result,
            started_at: Utc::now(),
        });
    }

    fn advance(&mut self) {
        self.index += 1;
        self.attempt = 0;
    }
}
