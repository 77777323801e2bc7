//! Completion transports
//!
//! [`HttpTransport`] talks to real providers over reqwest, picking the wire
//! format from the registry entry. [`BlockingBridge`] turns any async
//! transport into a blocking one for synchronous callers.

use crate::error::{RouterError, RouterResult};
use crate::llm::provider::{
    BlockingCompletionTransport, CompletionOptions, CompletionTransport, LlmError, Message,
    RawResponse,
};
use crate::llm::providers::{anthropic, openai};
use crate::router::registry::{ModelEntry, ProviderKind};
use async_trait::async_trait;
use reqwest::Client;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// HTTP transport shared by every provider family
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, LlmError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Reuse an existing client (connection pool, proxies, TLS settings)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(
        &self,
        entry: &ModelEntry,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<RawResponse, LlmError> {
        debug!(
            model = %entry.model_id,
            provider = %entry.provider,
            timeout_ms = options.timeout.as_millis() as u64,
            "Sending completion request"
        );

        match entry.connection.kind {
            ProviderKind::OpenAiCompatible | ProviderKind::Azure => {
                openai::complete(&self.client, &entry.connection, messages, options).await
            }
            ProviderKind::Anthropic => {
                anthropic::complete(&self.client, &entry.connection, messages, options).await
            }
        }
    }
}

/// Blocking adapter over an async transport.
///
/// Owns a current-thread runtime and blocks the calling thread on each
/// attempt. Must not be used from inside another tokio runtime.
pub struct BlockingBridge<T> {
    inner: T,
    runtime: Runtime,
}

impl<T: CompletionTransport> BlockingBridge<T> {
    pub fn new(inner: T) -> RouterResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RouterError::runtime(format!("failed to start blocking runtime: {e}")))?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: CompletionTransport> BlockingCompletionTransport for BlockingBridge<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn complete_blocking(
        &self,
        entry: &ModelEntry,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<RawResponse, LlmError> {
        self.runtime
            .block_on(self.inner.complete(entry, messages, options))
    }
}
