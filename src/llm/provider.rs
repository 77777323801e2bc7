//! Completion transport abstraction and shared message types
//!
//! The router never talks to a provider directly. Every attempt goes through
//! a [`CompletionTransport`] (or its blocking twin), which receives the
//! registry entry of the model being tried, the composed messages and the
//! per-attempt options, and hands back the provider's raw response.

use crate::router::registry::ModelEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Message roles in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Caller-controlled parameters of a single attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

/// Parsed completion returned by the HTTP transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
    pub metadata: HashMap<String, String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason why completion finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// Provider response as handed back by a transport
///
/// Transports may return the provider's JSON envelope untouched, a parsed
/// [`CompletionResponse`], or bare text. The router passes whichever it got
/// back to the caller unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Chat-completions shaped JSON (`choices[0].message.content` or `choices[0].text`)
    Json(Value),
    /// Already-parsed completion
    Completion(CompletionResponse),
    /// Plain text
    Text(String),
}

impl RawResponse {
    /// Extract the plain text content, if the envelope carries any
    pub fn content(&self) -> Option<String> {
        match self {
            RawResponse::Json(value) => {
                let choice = value.get("choices")?.as_array()?.first()?;
                if let Some(message) = choice.get("message").filter(|m| m.is_object()) {
                    return message
                        .get("content")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
                choice.get("text").and_then(Value::as_str).map(str::to_string)
            }
            RawResponse::Completion(response) => response.content.clone(),
            RawResponse::Text(text) => Some(text.clone()),
        }
    }
}

/// Async completion transport
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Transport name for logs (e.g., "http", "scripted")
    fn name(&self) -> &str;

    /// Send one prompt to the model described by `entry`
    async fn complete(
        &self,
        entry: &ModelEntry,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<RawResponse, LlmError>;
}

/// Blocking completion transport; occupies the calling thread for the whole attempt
pub trait BlockingCompletionTransport: Send + Sync {
    fn name(&self) -> &str;

    fn complete_blocking(
        &self,
        entry: &ModelEntry,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<RawResponse, LlmError>;
}

/// Transport-level errors; the engine treats every one as retryable
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        assert_eq!(Message::assistant("a").role, MessageRole::Assistant);
        assert_eq!(Message::user("hello").content, "hello");
    }

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(serde_json::to_string(&MessageRole::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_content_from_chat_message_envelope() {
        let raw = RawResponse::Json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello there"}}]
        }));
        assert_eq!(raw.content(), Some("Hello there".to_string()));
    }

    #[test]
    fn test_content_from_text_choice_envelope() {
        let raw = RawResponse::Json(json!({"choices": [{"text": "legacy completion"}]}));
        assert_eq!(raw.content(), Some("legacy completion".to_string()));
    }

    #[test]
    fn test_content_missing_from_envelope() {
        assert_eq!(RawResponse::Json(json!({})).content(), None);
        assert_eq!(RawResponse::Json(json!({"choices": []})).content(), None);
        assert_eq!(
            RawResponse::Json(json!({"choices": [{"message": {"content": null}}]})).content(),
            None
        );
    }

    #[test]
    fn test_content_from_parsed_completion_and_text() {
        let completion = CompletionResponse {
            content: Some("parsed".to_string()),
            model: "m".to_string(),
            usage: TokenUsage::default(),
            finish_reason: FinishReason::Stop,
            metadata: HashMap::new(),
        };
        assert_eq!(
            RawResponse::Completion(completion).content(),
            Some("parsed".to_string())
        );
        assert_eq!(
            RawResponse::Text("plain".to_string()).content(),
            Some("plain".to_string())
        );
    }

    #[test]
    fn test_llm_error_display() {
        let errors = vec![
            LlmError::NotConfigured("test".to_string()),
            LlmError::AuthenticationFailed("test".to_string()),
            LlmError::ModelNotFound("test".to_string()),
            LlmError::RateLimitExceeded("test".to_string()),
            LlmError::RequestFailed("test".to_string()),
            LlmError::InvalidRequest("test".to_string()),
            LlmError::InvalidResponse("test".to_string()),
            LlmError::NetworkError("test".to_string()),
            LlmError::ApiError("test".to_string()),
            LlmError::Timeout(Duration::from_secs(1)),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
