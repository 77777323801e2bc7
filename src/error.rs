//! Router error types
//!
//! Generation failures never surface as errors: the engine absorbs them and
//! reports total exhaustion through an empty `CallResult`. The types here
//! cover construction-time problems only (bad configuration, a malformed
//! registry, a blocking bridge without a runtime).

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for router construction
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Invalid registry: {message}")]
    InvalidRegistry { message: String },

    #[error("Runtime error: {message}")]
    Runtime { message: String },

    #[error("Transport error: {0}")]
    TransportError(#[from] crate::llm::LlmError),
}

impl RouterError {
    /// Create invalid registry error
    pub fn invalid_registry<S: Into<String>>(message: S) -> Self {
        Self::InvalidRegistry {
            message: message.into(),
        }
    }

    /// Create runtime error
    pub fn runtime<S: Into<String>>(message: S) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

/// Result type for router construction
pub type RouterResult<T> = Result<T, RouterError>;

static SECRET_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("valid secret pattern")
});

static BEARER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bearer\s+\S+").expect("valid bearer pattern"));

const MAX_LOGGED_ERROR_LEN: usize = 500;

/// Redact credentials from provider error text before it reaches the logs
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_ASSIGNMENT
        .replace_all(message, "${1}=***")
        .to_string();
    sanitized = BEARER_TOKEN
        .replace_all(&sanitized, "Bearer ***")
        .to_string();

    if sanitized.len() > MAX_LOGGED_ERROR_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_LOGGED_ERROR_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}
