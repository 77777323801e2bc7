//! Mock implementations for testing
//!
//! [`ScriptedTransport`] plays back per-model replies and records every call
//! it receives. It implements both transport traits over the same script and
//! call log, so one fixture exercises the async and blocking drivers alike.

use crate::llm::provider::{
    BlockingCompletionTransport, CompletionOptions, CompletionTransport, LlmError, Message,
    RawResponse,
};
use crate::router::registry::ModelEntry;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One scripted transport reply
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Text(String),
    Json(Value),
    Error(LlmError),
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Chat-completions envelope carrying `content`, tagged with `id`
    pub fn chat(id: &str, content: &str) -> Self {
        Self::Json(json!({
            "id": id,
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        }))
    }

    pub fn error(error: LlmError) -> Self {
        Self::Error(error)
    }

    fn into_result(self) -> Result<RawResponse, LlmError> {
        match self {
            ScriptedReply::Text(text) => Ok(RawResponse::Text(text)),
            ScriptedReply::Json(value) => Ok(RawResponse::Json(value)),
            ScriptedReply::Error(error) => Err(error),
        }
    }
}

/// A call received by the scripted transport
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model_id: String,
    pub messages: Vec<Message>,
    pub options: CompletionOptions,
}

/// Transport that replays scripted replies per model.
///
/// Each model's replies are consumed in order and the last one repeats.
/// Models without a script get the default reply, an error unless changed.
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    default_reply: ScriptedReply,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_reply: ScriptedReply::Error(LlmError::NotConfigured(
                "no script for model".to_string(),
            )),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies for `model_id`, played in order; the last one repeats
    pub fn with_replies(self, model_id: &str, replies: Vec<ScriptedReply>) -> Self {
        lock(&self.scripts).insert(model_id.to_string(), replies.into());
        self
    }

    /// The same reply for every call to `model_id`
    pub fn always(self, model_id: &str, reply: ScriptedReply) -> Self {
        self.with_replies(model_id, vec![reply])
    }

    /// Reply for models without a script
    pub fn with_default(mut self, reply: ScriptedReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Simulated latency for `model_id`; calls longer than their timeout fail with `Timeout`
    pub fn with_delay(mut self, model_id: &str, delay: Duration) -> Self {
        self.delays.insert(model_id.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn calls_for(&self, model_id: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.model_id == model_id)
            .count()
    }

    /// Distinct models in the order they were first called
    pub fn models_called(&self) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        for call in lock(&self.calls).iter() {
            if !models.contains(&call.model_id) {
                models.push(call.model_id.clone());
            }
        }
        models
    }

    /// Record the call and decide its reply; the delay is applied by the caller
    fn begin(
        &self,
        entry: &ModelEntry,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> (ScriptedReply, Option<Duration>) {
        lock(&self.calls).push(RecordedCall {
            model_id: entry.model_id.clone(),
            messages: messages.to_vec(),
            options: options.clone(),
        });

        let reply = {
            let mut scripts = lock(&self.scripts);
            match scripts.get_mut(&entry.model_id) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        }
        .unwrap_or_else(|| self.default_reply.clone());

        (reply, self.delays.get(&entry.model_id).copied())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        entry: &ModelEntry,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<RawResponse, LlmError> {
        let (reply, delay) = self.begin(entry, messages, options);
        if let Some(delay) = delay {
            if delay > options.timeout {
                tokio::time::sleep(options.timeout).await;
                return Err(LlmError::Timeout(options.timeout));
            }
            tokio::time::sleep(delay).await;
        }
        reply.into_result()
    }
}

impl BlockingCompletionTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete_blocking(
        &self,
        entry: &ModelEntry,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<RawResponse, LlmError> {
        let (reply, delay) = self.begin(entry, messages, options);
        if let Some(delay) = delay {
            if delay > options.timeout {
                std::thread::sleep(options.timeout);
                return Err(LlmError::Timeout(options.timeout));
            }
            std::thread::sleep(delay);
        }
        reply.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelInfo;
    use crate::router::registry::{ConnectionParams, ProviderKind};

    fn entry(model_id: &str) -> ModelEntry {
        ModelEntry {
            model_id: model_id.to_string(),
            provider: "openai".to_string(),
            connection: ConnectionParams {
                kind: ProviderKind::OpenAiCompatible,
                api_key: "k".to_string(),
                api_base: "https://api.openai.com/v1".to_string(),
                api_version: None,
                deployment_id: None,
                upstream_model: model_id.to_string(),
            },
            info: ModelInfo::default(),
            comment: None,
        }
    }

    fn options() -> CompletionOptions {
        CompletionOptions {
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_replies_play_in_order_and_last_repeats() {
        let transport = ScriptedTransport::new().with_replies(
            "a",
            vec![ScriptedReply::text("first"), ScriptedReply::text("second")],
        );
        let a = entry("a");

        let mut seen = Vec::new();
        for _ in 0..3 {
            let raw = transport.complete(&a, &[], &options()).await.unwrap();
            seen.push(raw.content().unwrap());
        }
        assert_eq!(seen, vec!["first", "second", "second"]);
        assert_eq!(transport.calls_for("a"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_model_gets_default() {
        let transport = ScriptedTransport::new();
        let result = transport.complete(&entry("x"), &[], &options()).await;
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }

    #[test]
    fn test_blocking_shares_call_log() {
        let transport = ScriptedTransport::new()
            .always("a", ScriptedReply::chat("resp-1", "hello there from a"));

        let raw = transport
            .complete_blocking(&entry("a"), &[Message::user("hi")], &options())
            .unwrap();
        assert_eq!(raw.content().as_deref(), Some("hello there from a"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages, vec![Message::user("hi")]);
        assert_eq!(transport.models_called(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_delay_longer_than_timeout_times_out() {
        let transport = ScriptedTransport::new()
            .always("slow", ScriptedReply::text("eventually"))
            .with_delay("slow", Duration::from_secs(5));

        let opts = CompletionOptions {
            timeout: Duration::from_millis(10),
            ..options()
        };
        let result = transport.complete(&entry("slow"), &[], &opts).await;
        assert_eq!(result, Err(LlmError::Timeout(Duration::from_millis(10))));
    }
}
