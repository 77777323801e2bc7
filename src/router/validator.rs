//! Response validation
//!
//! Providers do not report quota exhaustion or refusals as typed fields, so
//! candidate text is classified with length and keyword heuristics. The
//! engine branches on the returned [`Verdict`] only and never inspects the
//! text itself. False positives and negatives are a known limitation.

/// Phrases that signal an exhausted quota or rate limit; checked first
pub const QUOTA_INDICATORS: &[&str] = &[
    "quota exceeded",
    "rate limit",
    "too many requests",
    "api quota",
    "usage limit",
    "insufficient quota",
    "billing limit",
];

/// Phrases that signal a generic failure or refusal
pub const ERROR_INDICATORS: &[&str] = &[
    "error:",
    "fail",
    "timeout",
    "cannot process",
    "unable to handle",
    "instance creation failed",
    "returned none",
    "empty response",
    "i cannot",
    "i am unable",
    "llm provider not provided",
];

/// Classification of one candidate response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    InvalidOther,
    InvalidQuota,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    /// `None`, `"quota"` or `"other"`
    pub fn error_kind(&self) -> Option<&'static str> {
        match self {
            Verdict::Valid => None,
            Verdict::InvalidQuota => Some("quota"),
            Verdict::InvalidOther => Some("other"),
        }
    }
}

/// Classify candidate text.
///
/// Missing text or text shorter than `min_length` characters after trimming
/// is `InvalidOther`; quota phrases win over generic error phrases.
pub fn validate(text: Option<&str>, min_length: usize) -> Verdict {
    let Some(text) = text else {
        return Verdict::InvalidOther;
    };

    if text.trim().chars().count() < min_length {
        return Verdict::InvalidOther;
    }

    let lowered = text.to_lowercase();

    if QUOTA_INDICATORS.iter().any(|phrase| lowered.contains(phrase)) {
        return Verdict::InvalidQuota;
    }

    if ERROR_INDICATORS.iter().any(|phrase| lowered.contains(phrase)) {
        return Verdict::InvalidOther;
    }

    Verdict::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: usize = 20;

    #[test]
    fn test_quota_phrase() {
        let verdict = validate(Some("quota exceeded, please retry later"), MIN);
        assert_eq!(verdict, Verdict::InvalidQuota);
        assert_eq!((verdict.is_valid(), verdict.error_kind()), (false, Some("quota")));
    }

    #[test]
    fn test_refusal_phrase() {
        let verdict = validate(Some("I cannot help with that request"), MIN);
        assert_eq!(verdict, Verdict::InvalidOther);
        assert_eq!(verdict.error_kind(), Some("other"));
    }

    #[test]
    fn test_plain_text_above_threshold_is_valid() {
        let text = "A".repeat(25);
        let verdict = validate(Some(&text), MIN);
        assert!(verdict.is_valid());
        assert_eq!(verdict.error_kind(), None);
    }

    #[test]
    fn test_missing_and_short_text() {
        assert_eq!(validate(None, MIN), Verdict::InvalidOther);
        assert_eq!(validate(Some(""), MIN), Verdict::InvalidOther);
        assert_eq!(validate(Some("too short"), MIN), Verdict::InvalidOther);
        assert_eq!(
            validate(Some("      padded     short      "), MIN),
            Verdict::InvalidOther
        );
    }

    #[test]
    fn test_quota_takes_precedence_over_error() {
        let verdict = validate(Some("Error: rate limit reached for this key"), MIN);
        assert_eq!(verdict, Verdict::InvalidQuota);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(
            validate(Some("TOO MANY REQUESTS from this client"), MIN),
            Verdict::InvalidQuota
        );
        assert_eq!(
            validate(Some("The Request Hit A TIMEOUT upstream"), MIN),
            Verdict::InvalidOther
        );
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        let text = "é".repeat(20);
        assert!(validate(Some(&text), MIN).is_valid());
        assert_eq!(validate(Some(&"é".repeat(19)), MIN), Verdict::InvalidOther);
    }

    #[test]
    fn test_zero_threshold_accepts_any_clean_text() {
        assert!(validate(Some(""), 0).is_valid());
        assert!(validate(Some("ok"), 0).is_valid());
    }
}
