//! Request parameters and call results

use crate::llm::provider::{Message, RawResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Parameters of one router invocation.
///
/// Unset tuning knobs (`temperature`, `max_retries`, `timeout`,
/// `overall_deadline`) take the router's engine defaults.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub request_type: String,
    pub primary_context: String,
    pub profile_context: Option<String>,
    pub question: Option<String>,
    pub messages_override: Option<Vec<Message>>,
    pub model_override: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_retries: Option<u32>,
    pub timeout: Option<Duration>,
    pub overall_deadline: Option<Duration>,
    /// Caller tag attached to every attempt's log line
    pub log_tag: Option<String>,
}

impl LlmRequest {
    pub fn new(request_type: impl Into<String>, primary_context: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            primary_context: primary_context.into(),
            ..Default::default()
        }
    }

    pub fn with_profile(mut self, profile_context: impl Into<String>) -> Self {
        self.profile_context = Some(profile_context.into());
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages_override = Some(messages);
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_override = Some(model_id.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = Some(deadline);
        self
    }

    pub fn with_log_tag(mut self, tag: impl Into<String>) -> Self {
        self.log_tag = Some(tag.into());
        self
    }
}

/// Result of a single attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum AttemptResult {
    Success,
    QuotaExhausted,
    OtherFailure(String),
}

/// One (model, attempt) pair the engine went through
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptOutcome {
    pub model_id: String,
    pub attempt_number: u32,
    pub result: AttemptResult,
    pub started_at: DateTime<Utc>,
}

/// Public return value of a router invocation.
///
/// `content` is `None` whenever no model produced a response that passed
/// validation; callers must check it rather than expect an error.
#[derive(Debug, Clone, Default)]
pub struct CallResult {
    pub raw: Option<RawResponse>,
    pub content: Option<String>,
    pub model_used: Option<String>,
    pub attempts: Vec<AttemptOutcome>,
    pub quota_limited: BTreeSet<String>,
    pub failed: BTreeSet<String>,
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        self.content.is_some()
    }

    /// The `(raw_response, content)` pair
    pub fn into_parts(self) -> (Option<RawResponse>, Option<String>) {
        (self.raw, self.content)
    }

    /// Attempts made against one model
    pub fn attempts_for(&self, model_id: &str) -> usize {
        self.attempts
            .iter()
            .filter(|outcome| outcome.model_id == model_id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("ask_question", "What is Rust?")
            .with_profile("Backend engineer")
            .with_question("Answer briefly")
            .with_model("groq/llama3-70b-8192")
            .with_temperature(0.2)
            .with_max_tokens(256)
            .with_max_retries(2)
            .with_timeout(Duration::from_secs(10))
            .with_log_tag("faq");

        assert_eq!(request.request_type, "ask_question");
        assert_eq!(request.primary_context, "What is Rust?");
        assert_eq!(request.profile_context.as_deref(), Some("Backend engineer"));
        assert_eq!(request.question.as_deref(), Some("Answer briefly"));
        assert_eq!(request.model_override.as_deref(), Some("groq/llama3-70b-8192"));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.max_retries, Some(2));
        assert_eq!(request.timeout, Some(Duration::from_secs(10)));
        assert_eq!(request.log_tag.as_deref(), Some("faq"));
        assert!(request.overall_deadline.is_none());
    }

    #[test]
    fn test_empty_call_result() {
        let result = CallResult::default();
        assert!(!result.is_success());
        assert_eq!(result.attempts_for("any"), 0);
        assert_eq!(result.into_parts(), (None, None));
    }

    #[test]
    fn test_attempt_result_serialization() {
        let json = serde_json::to_value(AttemptResult::OtherFailure("timeout".to_string())).unwrap();
        assert_eq!(json["kind"], "other_failure");
        assert_eq!(json["reason"], "timeout");

        let json = serde_json::to_value(AttemptResult::QuotaExhausted).unwrap();
        assert_eq!(json["kind"], "quota_exhausted");
    }
}
