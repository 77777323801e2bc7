//! Request-type policy
//!
//! A request type is an open string tag describing why a call is made. The
//! policy maps known tags to a preferred model and a system instruction;
//! unknown tags, and tags whose preferred model is not registered, degrade to
//! the universal default model and a generic instruction.

use crate::config::RouterConfig;
use crate::router::registry::BackendRegistry;
use std::collections::BTreeMap;
use tracing::warn;

pub const OPPORTUNITY_EVAL_REQUEST_TYPE: &str = "opportunity_eval";
pub const ASK_QUESTION_REQUEST_TYPE: &str = "ask_question";
pub const DRAFT_COMMUNICATION_REQUEST_TYPE: &str = "draft_communication";
pub const JOURNAL_ENTRY_REQUEST_TYPE: &str = "journal_entry";
pub const AGENTIC_WORKFLOW_REQUEST_TYPE: &str = "agentic_workflow";
pub const WHATSAPP_REPLY_HELPER_REQUEST_TYPE: &str = "whatsapp_reply_helper";
pub const WHATSAPP_HISTORY_SUMMARY_REQUEST_TYPE: &str = "whatsapp_history_summary";
pub const ORION_IMPROVEMENT_REQUEST_TYPE: &str = "orion_improvement";

/// Instruction used for request types without their own
pub const GENERIC_SYSTEM_INSTRUCTION: &str =
    "You are a helpful AI assistant. Provide clear and accurate responses while maintaining context.";

#[derive(Debug, Clone, PartialEq)]
struct RequestTypeRule {
    model: String,
    system_instruction: String,
}

/// Static request type to model/instruction mapping
#[derive(Debug, Clone)]
pub struct RequestTypePolicy {
    rules: BTreeMap<String, RequestTypeRule>,
    universal_default_model: String,
}

impl RequestTypePolicy {
    pub fn new(universal_default_model: impl Into<String>) -> Self {
        Self {
            rules: BTreeMap::new(),
            universal_default_model: universal_default_model.into(),
        }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        let mut policy = Self::new(config.engine.universal_default_model.clone());
        for (tag, rule) in &config.request_types {
            policy = policy.with_rule(tag, &rule.model, &rule.system_instruction);
        }
        policy
    }

    /// Add or replace the rule for one request type
    pub fn with_rule(
        mut self,
        request_type: &str,
        model: &str,
        system_instruction: &str,
    ) -> Self {
        self.rules.insert(
            request_type.to_string(),
            RequestTypeRule {
                model: model.to_string(),
                system_instruction: system_instruction.to_string(),
            },
        );
        self
    }

    pub fn universal_default_model(&self) -> &str {
        &self.universal_default_model
    }

    /// Preferred model for a request type, if it is registered
    pub fn default_model_for(&self, request_type: &str, registry: &BackendRegistry) -> String {
        let preferred = self
            .rules
            .get(request_type)
            .map(|rule| rule.model.as_str())
            .unwrap_or(self.universal_default_model.as_str());

        if registry.contains(preferred) {
            return preferred.to_string();
        }

        if preferred != self.universal_default_model {
            warn!(
                request_type,
                preferred,
                fallback = %self.universal_default_model,
                "Preferred model not registered, using universal default"
            );
        }
        self.universal_default_model.clone()
    }

    pub fn system_instruction_for(&self, request_type: &str) -> &str {
        self.rules
            .get(request_type)
            .map(|rule| rule.system_instruction.as_str())
            .unwrap_or(GENERIC_SYSTEM_INSTRUCTION)
    }

    /// Known request type tags
    pub fn request_types(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}
