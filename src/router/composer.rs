//! Prompt composition
//!
//! Message order is fixed: system instruction, profile context, primary
//! context, then the explicit question last so it reads as the final
//! instruction.

use crate::llm::provider::Message;
use crate::router::policy::RequestTypePolicy;

const PROFILE_PREAMBLE: &str = "Here is relevant profile information:\n";

/// Build the ordered prompt for one request.
///
/// A non-empty `messages_override` is returned verbatim; the caller owns its structure.
pub fn compose(
    policy: &RequestTypePolicy,
    request_type: &str,
    primary_context: &str,
    profile_context: Option<&str>,
    question: Option<&str>,
    messages_override: Option<&[Message]>,
) -> Vec<Message> {
    if let Some(messages) = messages_override.filter(|m| !m.is_empty()) {
        return messages.to_vec();
    }

    let mut messages = Vec::with_capacity(4);
    messages.push(Message::system(policy.system_instruction_for(request_type)));

    if let Some(profile) = profile_context.filter(|p| !p.is_empty()) {
        messages.push(Message::user(format!("{PROFILE_PREAMBLE}{profile}")));
    }

    messages.push(Message::user(primary_context));

    if let Some(question) = question.filter(|q| !q.is_empty()) {
        messages.push(Message::user(question));
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::MessageRole;
    use crate::router::policy::GENERIC_SYSTEM_INSTRUCTION;

    fn policy() -> RequestTypePolicy {
        RequestTypePolicy::new("default-model").with_rule(
            "journal_entry",
            "deepseek-r1",
            "You are a thoughtful writing assistant.",
        )
    }

    #[test]
    fn test_full_prompt_order() {
        let messages = compose(
            &policy(),
            "journal_entry",
            "Today I shipped the release.",
            Some("Senior engineer"),
            Some("What went well?"),
            None,
        );

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, "You are a thoughtful writing assistant.");
        assert_eq!(
            messages[1].content,
            "Here is relevant profile information:\nSenior engineer"
        );
        assert_eq!(messages[2].content, "Today I shipped the release.");
        assert_eq!(messages[3].content, "What went well?");
        assert!(messages[1..].iter().all(|m| m.role == MessageRole::User));
    }

    #[test]
    fn test_minimal_prompt() {
        let messages = compose(&policy(), "unmapped", "Just the context", None, None, None);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, GENERIC_SYSTEM_INSTRUCTION);
        assert_eq!(messages[1].content, "Just the context");
    }

    #[test]
    fn test_question_without_profile_is_last() {
        let messages = compose(
            &policy(),
            "journal_entry",
            "context",
            None,
            Some("question?"),
            None,
        );
        assert_eq!(messages.len(), 3);
        assert_eq!(messages.last().unwrap().content, "question?");
    }

    #[test]
    fn test_override_is_returned_verbatim() {
        let custom = vec![
            Message::assistant("prior turn"),
            Message::user("follow-up"),
        ];
        let messages = compose(
            &policy(),
            "journal_entry",
            "ignored",
            Some("ignored"),
            Some("ignored"),
            Some(custom.as_slice()),
        );
        assert_eq!(messages, custom);
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let messages = compose(&policy(), "journal_entry", "context", None, None, Some(&[][..]));
        assert_eq!(messages.len(), 2);
    }
}
