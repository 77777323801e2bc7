//! Anthropic messages API
//!
//! The system message is hoisted into the request's `system` field and the
//! response is parsed into a [`CompletionResponse`].

use crate::llm::provider::{
    CompletionOptions, CompletionResponse, FinishReason, LlmError, Message, MessageRole,
    RawResponse, TokenUsage,
};
use crate::llm::providers::{check_status, send_error};
use crate::router::registry::ConnectionParams;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The messages API requires `max_tokens`
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicCompletionRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicCompletionResponse {
    content: Vec<AnthropicContent>,
    model: String,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Split out the system message; later system messages replace earlier ones
fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system_message = None;
    let mut anthropic_messages = Vec::new();

    for message in messages {
        match message.role {
            MessageRole::System => {
                system_message = Some(message.content.clone());
            }
            MessageRole::User | MessageRole::Assistant => {
                anthropic_messages.push(AnthropicMessage {
                    role: message.role.as_str().to_string(),
                    content: message.content.clone(),
                });
            }
        }
    }

    (system_message, anthropic_messages)
}

fn convert_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Error,
    }
}

pub(crate) fn build_request(
    connection: &ConnectionParams,
    messages: &[Message],
    options: &CompletionOptions,
) -> AnthropicCompletionRequest {
    let (system, messages) = convert_messages(messages);
    AnthropicCompletionRequest {
        model: connection.upstream_model.clone(),
        max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        messages,
        system,
        temperature: options.temperature,
    }
}

fn parse_response(response: AnthropicCompletionResponse) -> CompletionResponse {
    let text: String = response
        .content
        .iter()
        .filter(|block| block.content_type == "text")
        .map(|block| block.text.as_str())
        .collect();

    CompletionResponse {
        content: (!text.is_empty()).then_some(text),
        model: response.model,
        usage: TokenUsage {
            prompt_tokens: response.usage.input_tokens,
            completion_tokens: response.usage.output_tokens,
            total_tokens: response.usage.input_tokens + response.usage.output_tokens,
        },
        finish_reason: convert_finish_reason(response.stop_reason.as_deref()),
        metadata: HashMap::new(),
    }
}

/// Issue one messages call and return the parsed completion
pub async fn complete(
    client: &Client,
    connection: &ConnectionParams,
    messages: &[Message],
    options: &CompletionOptions,
) -> Result<RawResponse, LlmError> {
    let response = client
        .post(format!("{}/messages", connection.api_base))
        .timeout(options.timeout)
        .header("x-api-key", &connection.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&build_request(connection, messages, options))
        .send()
        .await
        .map_err(|e| send_error("Anthropic", e, options.timeout))?;

    let parsed: AnthropicCompletionResponse = check_status("Anthropic", response)
        .await?
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let completion = parse_response(parsed);
    debug!(
        "Anthropic response: {} tokens used, finish_reason: {:?}",
        completion.usage.total_tokens, completion.finish_reason
    );
    Ok(RawResponse::Completion(completion))
}
