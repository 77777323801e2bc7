//! OpenAI-compatible chat completions
//!
//! Covers OpenAI itself and every provider exposing the same
//! `/chat/completions` contract (Groq, Mistral, OpenRouter, Gemini's
//! compatibility endpoint, DeepSeek), plus Azure deployments which differ
//! only in URL shape and auth header. The response envelope is returned as
//! untouched JSON.

use crate::llm::provider::{CompletionOptions, LlmError, Message, RawResponse};
use crate::llm::providers::{check_status, send_error};
use crate::router::registry::{ConnectionParams, ProviderKind};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Used when an Azure model does not pin its own API version
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-05-01-preview";

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

/// Endpoint for one chat completion
pub fn chat_completions_url(connection: &ConnectionParams) -> String {
    match connection.kind {
        ProviderKind::Azure => format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            connection.api_base,
            connection
                .deployment_id
                .as_deref()
                .unwrap_or(&connection.upstream_model),
            connection
                .api_version
                .as_deref()
                .unwrap_or(DEFAULT_AZURE_API_VERSION)
        ),
        _ => format!("{}/chat/completions", connection.api_base),
    }
}

/// Request body; Azure selects the model through the deployment path instead
pub(crate) fn build_request(
    connection: &ConnectionParams,
    messages: &[Message],
    options: &CompletionOptions,
) -> OpenAiCompletionRequest {
    OpenAiCompletionRequest {
        model: match connection.kind {
            ProviderKind::Azure => None,
            _ => Some(connection.upstream_model.clone()),
        },
        messages: messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role.as_str(),
                content: m.content.clone(),
            })
            .collect(),
        temperature: options.temperature,
        max_tokens: options.max_tokens,
    }
}

/// Estimate token count for messages
fn estimate_token_count(messages: &[Message]) -> usize {
    messages.iter().map(|m| m.content.len() / 4).sum()
}

/// Issue one chat completion and return the raw JSON envelope
pub async fn complete(
    client: &Client,
    connection: &ConnectionParams,
    messages: &[Message],
    options: &CompletionOptions,
) -> Result<RawResponse, LlmError> {
    let provider = match connection.kind {
        ProviderKind::Azure => "Azure",
        _ => "OpenAI-compatible",
    };

    let estimated_tokens = estimate_token_count(messages);
    debug!(
        "{} request: {} messages, estimated ~{} tokens",
        provider,
        messages.len(),
        estimated_tokens
    );
    if estimated_tokens > 120_000 {
        warn!(
            "Large request detected: estimated {} tokens, may exceed model limits",
            estimated_tokens
        );
    }

    let request = client
        .post(chat_completions_url(connection))
        .timeout(options.timeout)
        .json(&build_request(connection, messages, options));

    let request = match connection.kind {
        ProviderKind::Azure => request.header("api-key", &connection.api_key),
        _ => request.bearer_auth(&connection.api_key),
    };

    let response = request
        .send()
        .await
        .map_err(|e| send_error(provider, e, options.timeout))?;

    let body: Value = check_status(provider, response)
        .await?
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    if let Some(usage) = body.get("usage") {
        debug!("{} response usage: {}", provider, usage);
    }

    Ok(RawResponse::Json(body))
}
