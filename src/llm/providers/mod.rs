//! Provider wire formats
//!
//! Each submodule knows how to build one provider family's request and read
//! its response. Status handling is shared.

pub mod anthropic;
pub mod openai;

use crate::llm::provider::LlmError;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::warn;

/// Map a non-success HTTP status to the transport error it stands for
pub fn error_for_status(provider: &str, status: StatusCode, body: &str) -> LlmError {
    let detail = format!("{provider} API error: {status} - {body}");
    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthenticationFailed(detail),
        _ => LlmError::ApiError(detail),
    }
}

/// Map a reqwest send failure, distinguishing timeouts
pub(crate) fn send_error(provider: &str, error: reqwest::Error, timeout: Duration) -> LlmError {
    if error.is_timeout() {
        return LlmError::Timeout(timeout);
    }
    let message = format!(
        "HTTP request failed: {} (is_connect: {}, is_request: {})",
        error,
        error.is_connect(),
        error.is_request()
    );
    warn!("{} network error details: {}", provider, message);
    LlmError::NetworkError(message)
}

/// Pass a successful response through, or turn it into an error
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_for_status(provider, status, &body))
}
