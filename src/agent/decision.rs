//! Decision envelope parsing.
//!
//! Each step the model must answer with a JSON object of the form
//! `{"thought": ..., "action": "search" | "finish", "query": ..., "answer": ...}`.
//! [`parse_decision`] is the validating boundary between raw model text and
//! the loop: it returns either a [`Decision`] or a [`DecisionParseError`].

use serde::{Deserialize, Serialize};

use crate::error::DecisionParseError;

/// Substituted when the model omits its `thought`.
pub const MISSING_THOUGHT: &str = "(no thought provided)";

/// What the model wants to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Issue a web search.
    Search,
    /// Produce the final answer.
    Finish,
    /// Anything else the model emitted.
    #[serde(untagged)]
    Other(String),
}

impl Action {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "search" => Self::Search,
            "finish" => Self::Finish,
            _ => Self::Other(raw.to_string()),
        }
    }
}

/// A validated decision envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// The model's reasoning for this step.
    pub thought: String,
    /// Requested action.
    pub action: Action,
    /// Search query, trimmed. May be empty for a `search` action; the loop
    /// treats that as a no-op turn.
    pub query: Option<String>,
    /// Final answer; always present for [`Action::Finish`].
    pub answer: Option<String>,
}

#[derive(Deserialize)]
struct RawDecision {
    thought: Option<serde_json::Value>,
    action: Option<serde_json::Value>,
    query: Option<serde_json::Value>,
    answer: Option<serde_json::Value>,
}

/// Removes markdown code-fence decoration around a JSON payload.
///
/// Handles a leading ```` ```json ```` / ```` ``` ```` marker and a trailing
/// ```` ``` ````, including text the model wraps around the fenced block.
#[must_use]
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    let after = after
        .strip_prefix("json")
        .or_else(|| after.strip_prefix("JSON"))
        .unwrap_or(after);
    let body = after.rfind("```").map_or(after, |end| &after[..end]);
    body.trim()
}

/// Renders a JSON value as text: strings verbatim, `null` as absent, anything
/// else as compact JSON.
fn value_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn parse_fenced(content: &str) -> Result<RawDecision, DecisionParseError> {
    let json = strip_code_fences(content);
    if json.is_empty() {
        return Err(DecisionParseError::Empty);
    }
    serde_json::from_str(json).map_err(|e| DecisionParseError::InvalidJson {
        message: e.to_string(),
    })
}

/// Parses a raw completion into a [`Decision`].
///
/// # Errors
///
/// - [`DecisionParseError::Empty`] for blank output.
/// - [`DecisionParseError::InvalidJson`] if the text is not a JSON object.
/// - [`DecisionParseError::MissingAction`] if `action` is absent or empty.
/// - [`DecisionParseError::MissingAnswer`] for `finish` without an answer.
pub fn parse_decision(content: &str) -> Result<Decision, DecisionParseError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(DecisionParseError::Empty);
    }

    // A bare object may quote fences inside its strings; only strip on failure.
    let raw = match trimmed
        .starts_with('{')
        .then(|| serde_json::from_str::<RawDecision>(trimmed).ok())
        .flatten()
    {
        Some(raw) => raw,
        None => parse_fenced(trimmed)?,
    };

    let action = value_text(raw.action)
        .filter(|a| !a.trim().is_empty())
        .map(|a| Action::parse(&a))
        .ok_or(DecisionParseError::MissingAction)?;

    let thought = value_text(raw.thought)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| MISSING_THOUGHT.to_string());

    let query = value_text(raw.query).map(|q| q.trim().to_string());
    let answer = value_text(raw.answer).filter(|a| !a.trim().is_empty());

    if action == Action::Finish && answer.is_none() {
        return Err(DecisionParseError::MissingAnswer);
    }

    Ok(Decision {
        thought,
        action,
        query,
        answer,
    })
}

/// Bounded retry policy for decision parse failures.
///
/// A step may call the completion capability up to `1 + max_retries` times;
/// after the last failed attempt the run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRetryPolicy {
    /// Extra attempts allowed after the first failure.
    pub max_retries: u32,
}

impl ParseRetryPolicy {
    /// Creates a policy allowing `max_retries` extra attempts.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Total completion attempts allowed per step.
    #[must_use]
    pub const fn max_attempts(self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt is allowed after `failed_attempts` failures.
    #[must_use]
    pub const fn should_retry(self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_search_envelope() {
        let d = parse_decision(r#"{"thought":"t","action":"search","query":"q"}"#)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.action, Action::Search);
        assert_eq!(d.query.as_deref(), Some("q"));
        assert_eq!(d.thought, "t");
        assert!(d.answer.is_none());
    }

    #[test]
    fn test_parse_finish_envelope() {
        let d = parse_decision(r#"{"thought":"done","action":"finish","answer":"Paris"}"#)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.action, Action::Finish);
        assert_eq!(d.answer.as_deref(), Some("Paris"));
    }

    #[test_case("```json\n{\"action\":\"search\",\"query\":\"x\"}\n```" ; "json fence")]
    #[test_case("```\n{\"action\":\"search\",\"query\":\"x\"}\n```" ; "bare fence")]
    #[test_case("Here you go:\n```json\n{\"action\":\"search\",\"query\":\"x\"}\n```\n" ; "prose around fence")]
    #[test_case("  {\"action\":\"search\",\"query\":\"x\"}  " ; "no fence")]
    fn test_parse_strips_fences(input: &str) {
        let d = parse_decision(input).unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.query.as_deref(), Some("x"));
    }

    #[test]
    fn test_answer_quoting_backticks_survives() {
        let d = parse_decision(
            r#"{"thought":"t","action":"finish","answer":"Run ```cargo build``` first"}"#,
        )
        .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.answer.as_deref(), Some("Run ```cargo build``` first"));
    }

    #[test]
    fn test_fenced_object_quoting_backticks() {
        let input = "```json\n{\"action\":\"finish\",\"answer\":\"use `ls`\"}\n```";
        let d = parse_decision(input).unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.answer.as_deref(), Some("use `ls`"));
    }

    #[test]
    fn test_missing_thought_gets_placeholder() {
        let d = parse_decision(r#"{"action":"search","query":"q"}"#)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.thought, MISSING_THOUGHT);
    }

    #[test]
    fn test_unknown_action_is_not_a_parse_error() {
        let d = parse_decision(r#"{"thought":"t","action":"browse"}"#)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.action, Action::Other("browse".to_string()));
    }

    #[test]
    fn test_action_case_insensitive() {
        let d = parse_decision(r#"{"action":" Search ","query":"q"}"#)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.action, Action::Search);
    }

    #[test]
    fn test_empty_query_is_kept_empty() {
        let d = parse_decision(r#"{"action":"search","query":"   "}"#)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.query.as_deref(), Some(""));
    }

    #[test_case("", &DecisionParseError::Empty ; "empty")]
    #[test_case("```json\n```", &DecisionParseError::Empty ; "empty fence")]
    #[test_case(r#"{"thought":"t"}"#, &DecisionParseError::MissingAction ; "missing action")]
    #[test_case(r#"{"action":"finish"}"#, &DecisionParseError::MissingAnswer ; "finish without answer")]
    #[test_case(r#"{"action":"finish","answer":"  "}"#, &DecisionParseError::MissingAnswer ; "finish blank answer")]
    fn test_parse_errors(input: &str, expected: &DecisionParseError) {
        assert_eq!(parse_decision(input).as_ref().err(), Some(expected));
    }

    #[test]
    fn test_invalid_json() {
        let result = parse_decision("I think I should search for Paris");
        assert!(matches!(result, Err(DecisionParseError::InvalidJson { .. })));
    }

    #[test]
    fn test_non_string_answer_is_rendered() {
        let d = parse_decision(r#"{"action":"finish","answer":{"city":"Paris"}}"#)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(d.answer.as_deref(), Some(r#"{"city":"Paris"}"#));
    }

    #[test]
    fn test_retry_policy() {
        let policy = ParseRetryPolicy::new(2);
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));

        let none = ParseRetryPolicy::new(0);
        assert!(!none.should_retry(1));
    }
}
